use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use once_cell::sync::Lazy;

use super::scan::{self, ScanOptions, Stmt};
use crate::{Error, Result};

/// One migration file. Names follow `{version}_{description}.sql`; the
/// directory derives its order from the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    name: String,
    content: Vec<u8>,
}

impl MigrationFile {
    #[must_use]
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The part after the first `_`, with the `.sql` suffix stripped.
    #[must_use]
    pub fn desc(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        match stem.split_once('_') {
            Some((_, desc)) => desc,
            None => "",
        }
    }

    /// The part before the first `_` (the whole stem when there is none).
    #[must_use]
    pub fn version(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        match stem.split_once('_') {
            Some((version, _)) => version,
            None => stem,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn stmts(&self, opts: &ScanOptions) -> Result<Vec<String>> {
        scan::stmts(&String::from_utf8_lossy(&self.content), opts)
    }

    /// Statements paired with their preceding comments and byte position.
    pub fn stmt_decls(&self, opts: &ScanOptions) -> Result<Vec<Stmt>> {
        scan::scan(&String::from_utf8_lossy(&self.content), opts)
    }

    pub fn directives(&self) -> Vec<(String, String)> {
        scan::file_directives(&String::from_utf8_lossy(&self.content))
    }
}

/// A migration directory: uniquely named SQL files plus the integrity file.
pub trait Dir {
    /// All migration files in name order. The sum file is not included.
    fn files(&self) -> Result<Vec<MigrationFile>>;

    fn read_file(&self, name: &str) -> Result<Vec<u8>>;

    fn write_file(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Filesystem location, when the directory has one. Used for the
    /// advisory lock file of dialects without native locks.
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Local filesystem directory; `open_readonly` refuses writes so scripted
/// pipelines cannot mutate a reviewed directory.
#[derive(Debug)]
pub struct LocalDir {
    path: PathBuf,
    readonly: bool,
}

impl LocalDir {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_dir() {
            return Err(Error::NotExist {
                kind: "directory",
                name: path.display().to_string(),
            });
        }
        Ok(Self {
            path,
            readonly: false,
        })
    }

    pub fn open_readonly(path: impl Into<PathBuf>) -> Result<Self> {
        let mut dir = Self::open(path)?;
        dir.readonly = true;
        Ok(dir)
    }

    /// Creates the directory (and parents) when missing.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            readonly: false,
        })
    }
}

impl Dir for LocalDir {
    fn files(&self) -> Result<Vec<MigrationFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".sql") {
                continue;
            }
            files.push(MigrationFile::new(name, fs::read(entry.path())?));
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        fs::read(self.path.join(name)).map_err(Error::from)
    }

    fn write_file(&self, name: &str, content: &[u8]) -> Result<()> {
        if self.readonly {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("directory {} opened read-only", self.path.display()),
            )));
        }
        fs::write(self.path.join(name), content).map_err(Error::from)
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

struct MemDirState {
    files: BTreeMap<String, Vec<u8>>,
    refs: usize,
}

/// Process-wide namespace of in-memory directories. Opening the same name
/// twice yields views over the same file set; the entry is removed when the
/// last handle closes.
static MEM_DIRS: Lazy<Mutex<HashMap<String, MemDirState>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug)]
pub struct MemDir {
    name: String,
}

impl MemDir {
    #[must_use]
    pub fn open(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut dirs = MEM_DIRS.lock().expect("mem dir registry poisoned");
        dirs.entry(name.clone())
            .and_modify(|state| state.refs += 1)
            .or_insert_with(|| MemDirState {
                files: BTreeMap::new(),
                refs: 1,
            });
        Self { name }
    }

    pub fn close(self) {
        // Dropping performs the refcount decrement.
    }
}

impl Drop for MemDir {
    fn drop(&mut self) {
        let mut dirs = MEM_DIRS.lock().expect("mem dir registry poisoned");
        if let Some(state) = dirs.get_mut(&self.name) {
            state.refs -= 1;
            if state.refs == 0 {
                dirs.remove(&self.name);
            }
        }
    }
}

impl Dir for MemDir {
    fn files(&self) -> Result<Vec<MigrationFile>> {
        let dirs = MEM_DIRS.lock().expect("mem dir registry poisoned");
        let state = dirs
            .get(&self.name)
            .ok_or_else(|| Error::NotExist {
                kind: "mem directory",
                name: self.name.clone(),
            })?;
        Ok(state
            .files
            .iter()
            .filter(|(name, _)| name.ends_with(".sql"))
            .map(|(name, content)| MigrationFile::new(name.clone(), content.clone()))
            .collect())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>> {
        let dirs = MEM_DIRS.lock().expect("mem dir registry poisoned");
        dirs.get(&self.name)
            .and_then(|state| state.files.get(name))
            .cloned()
            .ok_or_else(|| Error::NotExist {
                kind: "file",
                name: name.to_string(),
            })
    }

    fn write_file(&self, name: &str, content: &[u8]) -> Result<()> {
        let mut dirs = MEM_DIRS.lock().expect("mem dir registry poisoned");
        let state = dirs
            .get_mut(&self.name)
            .ok_or_else(|| Error::NotExist {
                kind: "mem directory",
                name: self.name.clone(),
            })?;
        state.files.insert(name.to_string(), content.to_vec());
        Ok(())
    }
}

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use super::dir::{Dir, MigrationFile};
use super::scan;
use crate::{Error, Result};

pub const SUM_FILENAME: &str = "atlas.sum";
const HASH_PREFIX: &str = "h1:";

/// The parsed integrity file. Each entry's hash is cumulative: entry *k*
/// hashes the concatenation of `name || bytes` for files 1..k, so editing
/// any file invalidates every later entry as well as the global sum.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashFile {
    pub sum: String,
    pub entries: Vec<HashEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashEntry {
    pub name: String,
    pub hash: String,
}

impl HashFile {
    /// Computes the integrity file for the given files (already in
    /// directory name order). Files carrying an `atlas:sum ignore`
    /// directive are omitted from the accumulator and the listing.
    #[must_use]
    pub fn compute(files: &[MigrationFile]) -> Self {
        let mut accumulator: Vec<u8> = Vec::new();
        let mut entries = Vec::new();

        for file in files {
            if sum_ignored(file) {
                continue;
            }
            accumulator.extend_from_slice(file.name().as_bytes());
            accumulator.extend_from_slice(file.bytes());
            entries.push(HashEntry {
                name: file.name().to_string(),
                hash: BASE64.encode(Sha256::digest(&accumulator)),
            });
        }

        let mut global = Vec::new();
        for entry in &entries {
            global.extend_from_slice(entry.name.as_bytes());
            global.extend_from_slice(entry.hash.as_bytes());
        }

        Self {
            sum: BASE64.encode(Sha256::digest(&global)),
            entries,
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .ok_or_else(|| Error::ChecksumFormat("empty file".to_string()))?;
        let sum = header
            .strip_prefix(HASH_PREFIX)
            .ok_or_else(|| Error::ChecksumFormat(format!("missing {HASH_PREFIX} header")))?
            .to_string();

        let mut entries = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let (name, hash) = line
                .rsplit_once(&format!(" {HASH_PREFIX}"))
                .ok_or_else(|| Error::ChecksumFormat(format!("malformed entry {line:?}")))?;
            entries.push(HashEntry {
                name: name.trim().to_string(),
                hash: hash.to_string(),
            });
        }

        Ok(Self { sum, entries })
    }

    #[must_use]
    pub fn format(&self) -> String {
        let mut out = format!("{HASH_PREFIX}{}\n", self.sum);
        for entry in &self.entries {
            out.push_str(&entry.name);
            out.push(' ');
            out.push_str(HASH_PREFIX);
            out.push_str(&entry.hash);
            out.push('\n');
        }
        out
    }
}

fn sum_ignored(file: &MigrationFile) -> bool {
    scan::file_directives(&String::from_utf8_lossy(file.bytes()))
        .iter()
        .any(|(name, args)| name == "sum" && args == "ignore")
}

/// Validates a directory against its stored sum file.
///
/// An empty directory without a sum file is valid; SQL files without a sum
/// file are [`Error::ChecksumNotFound`]; a stored sum differing from the
/// recomputed one is [`Error::ChecksumMismatch`].
pub fn validate(dir: &dyn Dir) -> Result<()> {
    let files = dir.files()?;
    let stored = match dir.read_file(SUM_FILENAME) {
        Ok(bytes) => bytes,
        Err(_) if files.is_empty() => return Ok(()),
        Err(_) => return Err(Error::ChecksumNotFound),
    };

    let stored = HashFile::parse(&String::from_utf8_lossy(&stored))?;
    let computed = HashFile::compute(&files);
    if stored.sum != computed.sum {
        return Err(Error::ChecksumMismatch);
    }
    Ok(())
}

/// Recomputes and rewrites the directory's sum file.
pub fn write_sum(dir: &dyn Dir) -> Result<HashFile> {
    let computed = HashFile::compute(&dir.files()?);
    dir.write_file(SUM_FILENAME, computed.format().as_bytes())?;
    Ok(computed)
}

/// Content hash recorded on a revision at apply time.
#[must_use]
pub fn file_hash(file: &MigrationFile) -> String {
    BASE64.encode(Sha256::digest(file.bytes()))
}

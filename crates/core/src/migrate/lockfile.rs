use std::{
    fs::{self, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs2::FileExt as _;

use crate::{
    Error, ExecQuerier, Result,
    driver::{Lock, Locker},
};

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// A PID-stamped advisory file lock, for dialects without a native advisory
/// lock (SQLite, in-memory). The OS releases the flock even when the holder
/// is killed; the PID stamp identifies stale holders for operators.
#[derive(Debug)]
pub struct FileLock {
    file: Option<fs::File>,
    path: PathBuf,
}

impl FileLock {
    /// Acquires `<dir>/<name>.lock`, retrying until the timeout elapses.
    pub fn acquire(dir: &Path, name: &str, timeout: Duration) -> Result<Self> {
        let path = dir.join(format!("{name}.lock"));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if Instant::now() < deadline => std::thread::sleep(RETRY_INTERVAL),
                Err(_) => {
                    return Err(Error::Locked {
                        name: name.to_string(),
                        timeout,
                    });
                }
            }
        }

        let mut file = file;
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        Ok(Self {
            file: Some(file),
            path,
        })
    }
}

impl Lock for FileLock {
    fn release(&mut self, _conn: &mut dyn ExecQuerier) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Err(Error::Internal(format!(
                "lock file {} already released",
                self.path.display()
            )));
        };
        fs2::FileExt::unlock(&file)?;
        drop(file);
        let _ = fs::remove_file(&self.path);
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = fs2::FileExt::unlock(&file);
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// [`Locker`] backed by lock files in a fixed directory; the connection is
/// not consulted.
#[derive(Debug)]
pub struct FlockLocker {
    dir: PathBuf,
}

impl FlockLocker {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Locker for FlockLocker {
    fn lock(
        &self,
        _conn: &mut dyn ExecQuerier,
        name: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Lock>> {
        fs::create_dir_all(&self.dir)?;
        Ok(Box::new(FileLock::acquire(&self.dir, name, timeout)?))
    }
}

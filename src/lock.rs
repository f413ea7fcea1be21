use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

/// name of the lock file created in the working directory
pub const LOCK_FILE: &str = ".cowan.lock";

/// DirLock marks a working directory as in use for the lifetime of the value.
/// the fixed `fort.*` names mean two runs in one directory would clobber each
/// other, so a second runner fails instead of waiting
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

/// the reason a lock could not be taken
#[derive(Debug)]
pub enum LockError {
    /// someone else holds the lock. contains the lock file contents, which
    /// describe the holder
    Held(String),
    Io(io::Error),
}

impl DirLock {
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .map(|s| s.trim().to_owned())
                    .unwrap_or_default();
                return Err(LockError::Held(holder));
            }
            Err(e) => return Err(LockError::Io(e)),
        };
        let lock = Self { path };
        writeln!(
            file,
            "pid {} since {}",
            std::process::id(),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )
        .map_err(LockError::Io)?;
        debug!("locked {}", lock.path.display());
        Ok(lock)
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("unlocked {}", self.path.display()),
            Err(e) => warn!("failed to remove {}: {e}", self.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive() {
        let tmp = tempfile::tempdir().unwrap();
        let lock = DirLock::acquire(tmp.path()).unwrap();
        match DirLock::acquire(tmp.path()) {
            Err(LockError::Held(holder)) => {
                let want = format!("pid {}", std::process::id());
                assert!(holder.starts_with(&want), "{holder}");
            }
            other => panic!("expected Held, got {other:?}"),
        }
        drop(lock);
        assert!(!tmp.path().join(LOCK_FILE).exists());
        DirLock::acquire(tmp.path()).unwrap();
    }

    #[test]
    fn missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            DirLock::acquire(&tmp.path().join("nope")),
            Err(LockError::Io(_))
        ));
    }
}

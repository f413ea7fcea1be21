use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};

/// Slot is an owned binding of one of the fixed `fort.*` filenames. The file
/// behind it is removed when the Slot is dropped, unless it was promoted to its
/// final name with [Slot::promote] first, so a run never leaves slots behind
/// regardless of how it exits.
#[derive(Debug)]
pub struct Slot {
    path: PathBuf,
    armed: bool,
}

/// remove `path` if it exists, including dangling symlinks
pub(crate) fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    let base = link.parent().unwrap_or_else(|| Path::new("."));
    fs::copy(base.join(target), link).map(|_| ())
}

impl Slot {
    /// link `path` to `target`. like `ln -sf`, an existing file at `path` is
    /// replaced. `target` is stored verbatim, so a relative target is resolved
    /// against the directory containing `path`
    pub fn link(target: impl AsRef<Path>, path: PathBuf) -> io::Result<Self> {
        remove_stale(&path)?;
        symlink(target.as_ref(), &path)?;
        debug!("linked {} -> {}", path.display(), target.as_ref().display());
        Ok(Self { path, armed: true })
    }

    /// copy `source` to `path`, leaving `source` untouched
    pub fn copy(source: impl AsRef<Path>, path: PathBuf) -> io::Result<Self> {
        remove_stale(&path)?;
        fs::copy(source.as_ref(), &path)?;
        debug!("copied {} to {}", source.as_ref().display(), path.display());
        Ok(Self { path, armed: true })
    }

    /// claim `path` for a file the program will write. any leftover file is
    /// removed so that it can't be mistaken for fresh output
    pub fn output(path: PathBuf) -> io::Result<Self> {
        remove_stale(&path)?;
        Ok(Self { path, armed: true })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.symlink_metadata().is_ok()
    }

    /// rename the slot file to `dest`, replacing anything already there
    pub fn promote(mut self, dest: &Path) -> io::Result<()> {
        fs::rename(&self.path, dest)?;
        debug!("renamed {} to {}", self.path.display(), dest.display());
        self.armed = false;
        Ok(())
    }

    /// remove the slot file now, reporting any error instead of just logging
    /// it like [Drop] does
    pub fn release(mut self) -> io::Result<()> {
        self.armed = false;
        remove_stale(&self.path)
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = remove_stale(&self.path) {
                warn!("failed to remove {}: {e}", self.path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{read_to_string, write};

    use super::*;

    #[test]
    fn link_replaces_and_drops() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(dir.join("input.rcn"), "new").unwrap();
        write(dir.join("fort.10"), "stale").unwrap();
        {
            let slot = Slot::link("input.rcn", dir.join("fort.10")).unwrap();
            assert_eq!(read_to_string(slot.path()).unwrap(), "new");
        }
        assert!(!dir.join("fort.10").exists());
        assert!(dir.join("input.rcn").exists());
    }

    #[test]
    fn copy_keeps_source() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(dir.join("rcg_cfp72"), "cfp").unwrap();
        let slot = Slot::copy(dir.join("rcg_cfp72"), dir.join("fort.72")).unwrap();
        slot.release().unwrap();
        assert!(!dir.join("fort.72").exists());
        assert_eq!(read_to_string(dir.join("rcg_cfp72")).unwrap(), "cfp");
    }

    #[test]
    fn output_promote() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        write(dir.join("fort.9"), "leftover").unwrap();
        let slot = Slot::output(dir.join("fort.9")).unwrap();
        assert!(!slot.exists());
        write(dir.join("fort.9"), "fresh").unwrap();
        assert!(slot.exists());
        slot.promote(&dir.join("input.rcn_out")).unwrap();
        assert!(!dir.join("fort.9").exists());
        assert_eq!(read_to_string(dir.join("input.rcn_out")).unwrap(), "fresh");
    }

    #[test]
    fn unpromoted_output_is_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let slot = Slot::output(dir.join("fort.14")).unwrap();
        write(dir.join("fort.14"), "partial").unwrap();
        drop(slot);
        assert!(!dir.join("fort.14").exists());
    }

    #[test]
    fn release_missing_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        let slot = Slot::output(tmp.path().join("fort.11")).unwrap();
        assert!(slot.release().is_ok());
    }
}

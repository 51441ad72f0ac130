//! Temporary file management module
//!
//! This module provides RAII-based temporary files used for atomic writes:
//! data goes to a sibling temp file first and is then renamed over the target.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};

/// Guard for a temporary file that is deleted on drop unless persisted
#[derive(Debug)]
pub(crate) struct TempGuard {
    path: PathBuf,
    persisted: bool,
}

impl TempGuard {
    /// Get the path to the temporary file
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically moves the temporary file over `target`
    ///
    /// After a successful rename the guard no longer deletes anything.
    pub(crate) fn persist(mut self, target: &Path) -> io::Result<()> {
        fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.persisted {
            // Silently ignore errors during cleanup
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Deref for TempGuard {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Creates a temporary file next to `target` and returns it with its guard
///
/// The file lives in the same directory as `target` so the final rename
/// stays on one filesystem. Its name carries a ULID to keep concurrent
/// writers apart. With `private` set, the file is only accessible by the
/// current user on Unix.
///
/// # Examples
///
/// ```ignore
/// let (mut file, guard) = temp_sibling(Path::new("/data/favorites.json"), false)?;
/// file.write_all(b"[1, 2]")?;
/// guard.persist(Path::new("/data/favorites.json"))?;
/// ```
pub(crate) fn temp_sibling(target: &Path, private: bool) -> io::Result<(File, TempGuard)> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let path = dir.join(format!(".{}.{}.tmp", file_name, ulid::Ulid::new()));

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    if private {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = private;

    let file = options.open(&path)?;

    Ok((
        file,
        TempGuard {
            path,
            persisted: false,
        },
    ))
}

//! Process-wide record of which device paths are held open.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::StepError;

static OPEN_PATHS: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

/// Exclusive claim on a device path; released on drop.
#[derive(Debug)]
pub struct HandleClaim {
    key: PathBuf,
}

impl HandleClaim {
    /// Claim `path`, refusing if a live claim on the same file exists.
    ///
    /// Paths are compared after canonicalization where possible, so a
    /// symlink and its target count as the same device.
    pub fn acquire(path: &Path) -> Result<Self, StepError> {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut open = OPEN_PATHS.lock().unwrap_or_else(PoisonError::into_inner);
        if !open.insert(key.clone()) {
            return Err(StepError::AlreadyOpen {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { key })
    }
}

impl Drop for HandleClaim {
    fn drop(&mut self) {
        OPEN_PATHS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

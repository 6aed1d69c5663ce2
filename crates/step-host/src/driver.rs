//! # Driver Channel
//!
//! The kernel driver answers one request: given a virtual address of the
//! calling process, fill in the raw PGD/PUD/PMD/PTE entries of its walk.
//! The request is `_IOWR('L', 0, RawMapping)` on the driver's character
//! device.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use step_vmem::{PageTableSource, RawMapping, VirtualAddress};

use crate::StepError;
use crate::registry::HandleClaim;

const IOC_READ_WRITE: u64 = 3;

/// Linux `_IOWR(ty, nr, size)`.
const fn iowr(ty: u8, nr: u8, size: usize) -> u64 {
    (IOC_READ_WRITE << 30) | ((size as u64) << 16) | ((ty as u64) << 8) | nr as u64
}

/// Request code for "get page-table mapping".
pub const GET_PT_MAPPING: u64 = iowr(b'L', 0, size_of::<RawMapping>());

/// Open handle to the page-table driver.
#[derive(Debug)]
pub struct DriverChannel {
    file: File,
    path: PathBuf,
    _claim: HandleClaim,
}

impl DriverChannel {
    /// Open the driver device read/write.
    ///
    /// # Errors
    /// [`StepError::AlreadyOpen`] if this process already holds `path`,
    /// [`StepError::ResourceUnavailable`] if it cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StepError> {
        let path = path.as_ref();
        let claim = HandleClaim::acquire(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| StepError::ResourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("{} opened", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            _claim: claim,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageTableSource for DriverChannel {
    type Error = StepError;

    fn query(&self, address: VirtualAddress) -> Result<RawMapping, StepError> {
        let mut raw = RawMapping::request(address);
        log::debug!("querying page tables for {address}");

        // SAFETY: `raw` is a live, correctly sized `RawMapping` the driver
        // fills in place; the fd stays open for the duration of the call.
        #[allow(clippy::cast_possible_truncation)]
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), GET_PT_MAPPING as _, &raw mut raw) };
        if rc < 0 {
            return Err(StepError::DriverRejected {
                address,
                source: io::Error::last_os_error(),
            });
        }
        Ok(raw)
    }
}

impl Drop for DriverChannel {
    fn drop(&mut self) {
        log::info!("{} closed", self.path.display());
    }
}

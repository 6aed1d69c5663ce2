//! # Physical Remapper
//!
//! Maps single physical pages out of the physical-memory device.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use step_vmem::{PhysicalAddress, Size4K};

use crate::StepError;
use crate::registry::HandleClaim;
use crate::window::{PAGE_SIZE, RemapMode, RemappedWindow};

/// Open handle to the physical-memory device.
#[derive(Debug)]
pub struct PhysicalMemory {
    file: File,
    path: PathBuf,
    executable: bool,
    _claim: HandleClaim,
}

impl PhysicalMemory {
    /// Open the device read/write with `O_SYNC`.
    ///
    /// With `executable` set, windows are also mapped `PROT_EXEC`.
    ///
    /// # Errors
    /// [`StepError::AlreadyOpen`] if this process already holds `path`,
    /// [`StepError::ResourceUnavailable`] if it cannot be opened.
    pub fn open(path: impl AsRef<Path>, executable: bool) -> Result<Self, StepError> {
        let path = path.as_ref();
        let claim = HandleClaim::acquire(path)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| StepError::ResourceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("{} opened", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            executable,
            _claim: claim,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map the page containing `address`.
    ///
    /// The window's [`address`](RemappedWindow::address) keeps the low 12
    /// bits of `address`. Nothing is read through the new mapping.
    ///
    /// # Errors
    /// [`StepError::RemapRejected`] with the OS error if `mmap` fails.
    pub fn remap(
        &self,
        address: PhysicalAddress,
        mode: RemapMode,
    ) -> Result<RemappedWindow, StepError> {
        let page = address.page::<Size4K>().base();
        let rejected = |source| StepError::RemapRejected { address, source };

        let offset = libc::off_t::try_from(page.as_u64())
            .map_err(|_| rejected(io::Error::from(io::ErrorKind::InvalidInput)))?;

        let mut prot = libc::PROT_READ | libc::PROT_WRITE;
        if self.executable {
            prot |= libc::PROT_EXEC;
        }

        // SAFETY: a fresh mapping at a kernel-chosen address; nothing else
        // aliases it until the window hands out pointers.
        let map = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                PAGE_SIZE,
                prot,
                mode.mmap_flags(),
                self.file.as_raw_fd(),
                offset,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(rejected(io::Error::last_os_error()));
        }
        let Some(map) = NonNull::new(map.cast::<u8>()) else {
            return Err(rejected(io::Error::from(io::ErrorKind::AddrNotAvailable)));
        };

        log::debug!("remapped {address} ({mode:?}) at {:p}", map.as_ptr());
        // SAFETY: `map` is a live PAGE_SIZE mapping handed over to the window.
        Ok(unsafe { RemappedWindow::from_raw(map, address, mode) })
    }

    /// [`remap`](Self::remap) with [`RemapMode::Shared`].
    ///
    /// # Errors
    /// As for [`remap`](Self::remap).
    pub fn remap_shared(&self, address: PhysicalAddress) -> Result<RemappedWindow, StepError> {
        self.remap(address, RemapMode::Shared)
    }

    /// [`remap`](Self::remap) with [`RemapMode::Private`].
    ///
    /// # Errors
    /// As for [`remap`](Self::remap).
    pub fn remap_private(&self, address: PhysicalAddress) -> Result<RemappedWindow, StepError> {
        self.remap(address, RemapMode::Private)
    }
}

impl Drop for PhysicalMemory {
    fn drop(&mut self) {
        log::info!("{} closed", self.path.display());
    }
}

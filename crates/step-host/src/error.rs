use std::convert::Infallible;
use std::io;
use std::path::PathBuf;

use step_vmem::{LevelError, PhysicalAddress, VirtualAddress};

/// Everything that can go wrong between opening the devices and touching a
/// remapped page.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A privileged device could not be opened.
    #[error("cannot open {}", .path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The device is already held by a live handle in this process.
    #[error("{} is already open in this process", .path.display())]
    AlreadyOpen { path: PathBuf },

    /// The driver refused the page-table query.
    #[error("driver rejected the page-table query for {address}")]
    DriverRejected {
        address: VirtualAddress,
        #[source]
        source: io::Error,
    },

    /// A directory level was requested below a huge page.
    #[error(transparent)]
    InvalidLevel(#[from] LevelError),

    /// The kernel refused to map the physical page.
    #[error("cannot remap physical address {address}")]
    RemapRejected {
        address: PhysicalAddress,
        #[source]
        source: io::Error,
    },

    /// An accessor asked for bytes outside the window, or misaligned.
    #[error("{len} bytes at offset 0x{offset:X} do not fit the remapped page")]
    WindowBounds { offset: usize, len: usize },
}

impl From<Infallible> for StepError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

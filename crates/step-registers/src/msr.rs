//! # Model-Specific Registers (MSR) through `/dev/cpu/<n>/msr`
//!
//! The Linux `msr` driver exposes each core's MSRs as a file in which the
//! MSR index is the byte offset and every register is 8 bytes wide.
//! Reading or writing requires the module to be loaded (`modprobe msr`)
//! and, usually, root.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

/// Identifies a **Model-Specific Register (MSR)** by its architectural index.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Msr(pub u32);

impl Msr {
    pub const IA32_TIME_STAMP_COUNTER: Self = Self(0x10);
    pub const IA32_APIC_BASE: Self = Self(0x1B);
    pub const IA32_MISC_ENABLE: Self = Self(0x1A0);
    pub const IA32_TSC_DEADLINE: Self = Self(0x6E0);

    /// Returns the underlying raw MSR index.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Msr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Failure to reach or access an MSR.
#[derive(Debug, thiserror::Error)]
pub enum MsrError {
    #[error("{} does not exist (is the msr kernel module loaded?)", .path.display())]
    ModuleMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("permission denied opening {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{op} of MSR {msr} on cpu {cpu} failed")]
    Access {
        cpu: u32,
        msr: Msr,
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl MsrError {
    fn open(path: PathBuf, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => Self::ModuleMissing { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Open { path, source },
        }
    }
}

/// Positional access to the per-core MSR files.
///
/// Each call opens the file, performs one 8-byte transfer and closes it
/// again; nothing is held between calls.
#[derive(Debug, Clone)]
pub struct MsrFile {
    root: PathBuf,
}

impl Default for MsrFile {
    fn default() -> Self {
        Self::with_root("/dev/cpu")
    }
}

impl MsrFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `root/<cpu>/msr` instead of `/dev/cpu/<cpu>/msr`.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The device file backing `cpu`.
    #[must_use]
    pub fn path(&self, cpu: u32) -> PathBuf {
        self.root.join(cpu.to_string()).join("msr")
    }

    /// Read MSR `msr` on core `cpu`.
    ///
    /// # Errors
    /// [`MsrError`] if the device cannot be opened or the read is short.
    pub fn read(&self, cpu: u32, msr: Msr) -> Result<u64, MsrError> {
        let path = self.path(cpu);
        let file = File::open(&path).map_err(|e| MsrError::open(path, e))?;

        let mut buf = [0u8; 8];
        file.read_exact_at(&mut buf, u64::from(msr.raw()))
            .map_err(|source| MsrError::Access {
                cpu,
                msr,
                op: "read",
                source,
            })?;

        let value = u64::from_ne_bytes(buf);
        log::trace!("rdmsr cpu {cpu} {msr} -> 0x{value:016X}");
        Ok(value)
    }

    /// Write `value` to MSR `msr` on core `cpu`.
    ///
    /// # Errors
    /// [`MsrError`] if the device cannot be opened or the write is short.
    pub fn write(&self, cpu: u32, msr: Msr, value: u64) -> Result<(), MsrError> {
        let path = self.path(cpu);
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| MsrError::open(path, e))?;

        file.write_all_at(&value.to_ne_bytes(), u64::from(msr.raw()))
            .map_err(|source| MsrError::Access {
                cpu,
                msr,
                op: "write",
                source,
            })?;

        log::trace!("wrmsr cpu {cpu} {msr} <- 0x{value:016X}");
        Ok(())
    }
}

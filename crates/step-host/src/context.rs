//! # Step Context
//!
//! Owns the two privileged handles for the lifetime of a session and ties
//! the resolver, the remapper and the address width together. Dropping the
//! context closes both devices.

use step_vmem::{Mapping, PageTableSource, PagingLevel, PhysicalAddress, VirtualAddress};

use crate::config::StepConfig;
use crate::driver::DriverChannel;
use crate::phys_mem::PhysicalMemory;
use crate::window::{RemapMode, RemappedWindow};
use crate::StepError;

/// A session on one page-table source and one physical-memory device.
#[derive(Debug)]
pub struct StepContext<S = DriverChannel> {
    source: S,
    memory: PhysicalMemory,
    address_width: u8,
}

impl StepContext<DriverChannel> {
    /// Open the driver and the physical-memory device named by `config`.
    ///
    /// # Errors
    /// [`StepError::ResourceUnavailable`] or [`StepError::AlreadyOpen`] for
    /// either device. Nothing stays open on failure.
    pub fn open(config: &StepConfig) -> Result<Self, StepError> {
        let source = DriverChannel::open(&config.driver_path)?;
        let memory = PhysicalMemory::open(&config.memory_path, config.executable_windows)?;
        Ok(Self::with_source(
            source,
            memory,
            config.resolved_address_width(),
        ))
    }
}

impl<S> StepContext<S> {
    /// Assemble a context from an already opened source and device.
    #[must_use]
    pub const fn with_source(source: S, memory: PhysicalMemory, address_width: u8) -> Self {
        Self {
            source,
            memory,
            address_width,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub const fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    /// Physical address bits used to mask entry base fields.
    #[must_use]
    pub const fn address_width(&self) -> u8 {
        self.address_width
    }

    /// Map the physical page containing `address`.
    ///
    /// # Errors
    /// [`StepError::RemapRejected`] if the kernel refuses the mapping.
    pub fn remap(
        &self,
        address: PhysicalAddress,
        mode: RemapMode,
    ) -> Result<RemappedWindow, StepError> {
        self.memory.remap(address, mode)
    }
}

impl<S> StepContext<S>
where
    S: PageTableSource,
    StepError: From<S::Error>,
{
    /// Snapshot the translation of `address` with a single query.
    ///
    /// # Errors
    /// The source's error, e.g. [`StepError::DriverRejected`].
    pub fn resolve(&self, address: VirtualAddress) -> Result<Mapping, StepError> {
        Ok(Mapping::resolve(&self.source, address, self.address_width)?)
    }

    /// Resolve `address` and map the physical page holding its `level`:
    /// the entry itself for a directory level, the data for `Page`.
    ///
    /// One query and one remap per call; nothing is cached.
    ///
    /// # Errors
    /// Query errors, [`StepError::InvalidLevel`] below a huge page, or
    /// [`StepError::RemapRejected`].
    pub fn remap_table_at(
        &self,
        address: VirtualAddress,
        level: PagingLevel,
        mode: RemapMode,
    ) -> Result<RemappedWindow, StepError> {
        let mapping = self.resolve(address)?;
        let target = mapping.physical_address_at(level)?;
        log::debug!("{level} of {address} lives at {target}");
        self.memory.remap(target, mode)
    }
}

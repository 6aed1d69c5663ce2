//! # Host Side
//!
//! Everything that needs the operating system: the page-table driver, the
//! physical-memory device, and the process-level glue around them.
//!
//! ```text
//! StepConfig ──► StepContext::open
//!                  ├─ DriverChannel  (ioctl)  ──► Mapping (step-vmem)
//!                  └─ PhysicalMemory (mmap)   ──► RemappedWindow
//! ```
//!
//! ```rust,no_run
//! use step_host::{RemapMode, StepConfig, StepContext};
//! use step_vmem::{PagingLevel, VirtualAddress};
//!
//! # fn main() -> Result<(), step_host::StepError> {
//! let ctx = StepContext::open(&StepConfig::default())?;
//! let value = Box::new(0u64);
//! let address = VirtualAddress::from_ptr(&raw const *value);
//!
//! let pte = ctx.remap_table_at(address, PagingLevel::Pte, RemapMode::Shared)?;
//! let entry = unsafe { pte.read_entry() }?;
//! println!("PTE of {address}: present={} dirty={}", entry.present(), entry.dirty());
//! # Ok(())
//! # }
//! ```

mod config;
mod context;
mod driver;
mod error;
mod fatal;
mod logger;
mod phys_mem;
mod registry;
mod window;

pub use crate::config::{ConfigError, DEFAULT_DRIVER_PATH, DEFAULT_MEMORY_PATH, StepConfig};
pub use crate::context::StepContext;
pub use crate::driver::{DriverChannel, GET_PT_MAPPING};
pub use crate::error::StepError;
pub use crate::fatal::{OrAbort, error_chain};
pub use crate::logger::StderrLogger;
pub use crate::phys_mem::PhysicalMemory;
pub use crate::window::{PAGE_SIZE, RemapMode, RemappedWindow};

//! # CPU Facilities From User Space
//!
//! - [`cpuid`] and the physical address width it reports, cached once per
//!   process ([`physical_address_width`]).
//! - Serialized time-stamp counter samples ([`rdtsc_begin`], [`rdtsc_end`]).
//! - Per-core model-specific register access through the Linux `msr`
//!   driver ([`MsrFile`]).

#[cfg(target_arch = "x86_64")]
mod cpuid;
mod msr;
#[cfg(target_arch = "x86_64")]
mod tsc;
mod width;

#[cfg(target_arch = "x86_64")]
pub use crate::cpuid::{CpuidResult, cpuid, max_extended_leaf};
pub use crate::msr::{Msr, MsrError, MsrFile};
#[cfg(target_arch = "x86_64")]
pub use crate::tsc::{rdtsc_begin, rdtsc_end};
pub use crate::width::{
    AddressWidthCache, FALLBACK_ADDRESS_WIDTH, physical_address_width,
    query_physical_address_width,
};

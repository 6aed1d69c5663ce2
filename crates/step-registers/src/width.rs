//! # Physical Address Width
//!
//! `MAXPHYADDR` is read from CPUID leaf `0x8000_0008` (`EAX[7:0]`) once per
//! process and then reused for every base-address mask.

use std::sync::OnceLock;

/// Leaf reporting physical and linear address sizes.
#[cfg(target_arch = "x86_64")]
const LEAF_ADDRESS_SIZES: u32 = 0x8000_0008;

/// Width assumed when the CPU does not report one.
///
/// On x86-64 this is the documented default for CPUs lacking leaf
/// `0x8000_0008`; elsewhere the architectural maximum is used.
#[cfg(target_arch = "x86_64")]
pub const FALLBACK_ADDRESS_WIDTH: u8 = 36;

/// Width assumed when the CPU does not report one.
#[cfg(not(target_arch = "x86_64"))]
pub const FALLBACK_ADDRESS_WIDTH: u8 = step_vmem::MAX_PHYSICAL_ADDRESS_WIDTH;

/// A width discovered at most once.
///
/// The process-wide instance backs [`physical_address_width`]; separate
/// instances are useful where the query itself needs observing.
#[derive(Debug, Default)]
pub struct AddressWidthCache {
    width: OnceLock<u8>,
}

impl AddressWidthCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: OnceLock::new(),
        }
    }

    /// The cached width, running `query` only if nothing is cached yet.
    ///
    /// Concurrent first callers block until one query has finished; `query`
    /// runs exactly once.
    pub fn get_or_query(&self, query: impl FnOnce() -> u8) -> u8 {
        *self.width.get_or_init(|| {
            let width = query();
            log::debug!("physical address width: {width} bits");
            width
        })
    }

    /// The cached width, if a query already ran.
    #[must_use]
    pub fn get(&self) -> Option<u8> {
        self.width.get().copied()
    }
}

static PROCESS_WIDTH: AddressWidthCache = AddressWidthCache::new();

/// Number of implemented physical address bits, cached for the process.
#[must_use]
pub fn physical_address_width() -> u8 {
    PROCESS_WIDTH.get_or_query(query_physical_address_width)
}

/// Ask the CPU directly, bypassing the cache.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn query_physical_address_width() -> u8 {
    if crate::cpuid::max_extended_leaf() < LEAF_ADDRESS_SIZES {
        log::warn!("CPUID leaf 0x{LEAF_ADDRESS_SIZES:08X} unsupported, assuming {FALLBACK_ADDRESS_WIDTH} bits");
        return FALLBACK_ADDRESS_WIDTH;
    }
    let eax = crate::cpuid::cpuid(LEAF_ADDRESS_SIZES, 0).eax;
    eax.to_le_bytes()[0]
}

/// Ask the CPU directly, bypassing the cache.
#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub const fn query_physical_address_width() -> u8 {
    FALLBACK_ADDRESS_WIDTH
}

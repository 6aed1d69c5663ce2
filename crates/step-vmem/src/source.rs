use crate::addresses::VirtualAddress;

/// Wire layout of the driver's "get page-table mapping" request.
///
/// The request carries only [`virt`](Self::virt); the response overwrites
/// the whole structure in place. Field order is fixed by the driver ABI.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct RawMapping {
    pub virt: u64,
    pub phys: u64,
    pub pgd_phys_address: u64,
    pub pgd: u64,
    pub pud: u64,
    pub pmd: u64,
    pub pte: u64,
}

const _: () = assert!(size_of::<RawMapping>() == 56, "driver ABI mismatch");

impl RawMapping {
    /// A zeroed request for `address`. Fields a failed or partial response
    /// leaves untouched read as zero.
    #[inline]
    #[must_use]
    pub const fn request(address: VirtualAddress) -> Self {
        Self {
            virt: address.as_u64(),
            phys: 0,
            pgd_phys_address: 0,
            pgd: 0,
            pud: 0,
            pmd: 0,
            pte: 0,
        }
    }
}

/// Anything that can report the raw paging-structure entries leading to a
/// virtual address: the kernel driver, or a fixture in tests.
pub trait PageTableSource {
    type Error;

    /// Query the raw entries for `address`, all at once.
    ///
    /// # Errors
    /// Implementation specific; a failed query must not yield a partially
    /// populated [`RawMapping`].
    fn query(&self, address: VirtualAddress) -> Result<RawMapping, Self::Error>;
}

impl<T: PageTableSource + ?Sized> PageTableSource for &T {
    type Error = T::Error;

    #[inline]
    fn query(&self, address: VirtualAddress) -> Result<RawMapping, Self::Error> {
        (**self).query(address)
    }
}

//! # Virtual and Physical Address Types
//!
//! Thin `u64` wrappers that keep virtual and physical addresses apart at the
//! type level, plus page-size markers used to split an address into a frame
//! base and an in-frame offset.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | Address in *some* process' virtual address space. |
//! | [`PhysicalAddress`] | Host RAM or MMIO address. |
//! | [`PhysicalPage<S>`] | Physical frame base aligned to page size `S`. |
//! | [`PageOffset<S>`] | Offset within a page of size `S`. |
//!
//! ```rust
//! # use step_vmem::{PhysicalAddress, Size2M, Size4K};
//! let pa = PhysicalAddress::new(0x0000_0008_1234_5678);
//! let (frame, off) = pa.split::<Size2M>();
//! assert_eq!(frame.base().as_u64(), 0x0000_0008_1220_0000);
//! assert_eq!(off.as_u64(), 0x14_5678);
//! assert_eq!(pa.page::<Size4K>().join(pa.offset::<Size4K>()), pa);
//! ```

use core::fmt;
use core::hash::Hash;
use core::marker::PhantomData;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the three x86-64 page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;
    /// Short human-readable name.
    const NAME: &'static str;
}

/// 4 KiB page, mapped by a PTE.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;
    const NAME: &'static str = "4KiB";
}

/// 2 MiB huge page, mapped by a PMD with `PS=1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size2M;
impl sealed::Sealed for Size2M {}
impl PageSize for Size2M {
    const SIZE: u64 = 2 * 1024 * 1024;
    const SHIFT: u32 = 21;
    const NAME: &'static str = "2MiB";
}

/// 1 GiB huge page, mapped by a PUD with `PS=1`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size1G;
impl sealed::Sealed for Size1G {}
impl PageSize for Size1G {
    const SIZE: u64 = 1024 * 1024 * 1024;
    const SHIFT: u32 = 30;
    const NAME: &'static str = "1GiB";
}

/// Virtual memory address.
///
/// Carries no canonicality guarantee; the value is whatever the caller asked
/// about, byte granular.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    /// Address of a pointer in the **calling** process.
    #[inline]
    #[must_use]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr.addr() as u64)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Extract the 9-bit table index starting at bit `shift`.
    #[inline]
    #[must_use]
    pub const fn index_bits(self, shift: u32) -> u16 {
        ((self.0 >> shift) & 0x1FF) as u16
    }

    /// The offset within the page of size `S` that contains this address.
    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> PageOffset<S> {
        PageOffset::from_raw(self.0)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

/// Physical memory address (host RAM / MMIO).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Keep only the low `width` bits (the CPU's implemented physical
    /// address bits). Widths above 52 are clamped to the architectural limit.
    #[inline]
    #[must_use]
    pub const fn masked_to_width(self, width: u8) -> Self {
        let width = if width > MAX_PHYSICAL_ADDRESS_WIDTH {
            MAX_PHYSICAL_ADDRESS_WIDTH
        } else {
            width
        };
        Self(self.0 & ((1u64 << width as u32) - 1))
    }

    /// The `S`-aligned frame containing this address.
    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::containing(self)
    }

    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> PageOffset<S> {
        PageOffset::from_raw(self.0)
    }

    #[inline]
    #[must_use]
    pub const fn split<S: PageSize>(self) -> (PhysicalPage<S>, PageOffset<S>) {
        (self.page::<S>(), self.offset::<S>())
    }
}

/// Architectural upper bound of `MAXPHYADDR` on x86-64.
pub const MAX_PHYSICAL_ADDRESS_WIDTH: u8 = 52;

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

/// Physical frame base for size `S` (low `S::SHIFT` bits are zero).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> PhysicalPage<S> {
    /// Frame that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self {
            value: addr.as_u64() & !(S::SIZE - 1),
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.value)
    }

    /// Combine with an offset to form a full address.
    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset<S>) -> PhysicalAddress {
        PhysicalAddress::new(self.value + off.as_u64())
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalPage<{}>(0x{:016X})", S::NAME, self.value)
    }
}

impl<S: PageSize> From<PhysicalPage<S>> for PhysicalAddress {
    #[inline]
    fn from(value: PhysicalPage<S>) -> Self {
        value.base()
    }
}

/// The offset within a page of size `S` (`0..S::SIZE`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S: PageSize> PageOffset<S> {
    /// Take the low `S::SHIFT` bits of `raw`.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            value: raw & (S::SIZE - 1),
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.value
    }
}

impl<S: PageSize> fmt::Debug for PageOffset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset<{}>({:#X})", S::NAME, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_and_join_each_size() {
        let pa = PhysicalAddress::new(0x0000_0004_1234_5678);
        let (p, o) = pa.split::<Size4K>();
        assert_eq!(p.base().as_u64(), 0x0000_0004_1234_5000);
        assert_eq!(o.as_u64(), 0x678);
        assert_eq!(p.join(o), pa);

        let (p, o) = pa.split::<Size2M>();
        assert_eq!(p.base().as_u64() & (Size2M::SIZE - 1), 0);
        assert_eq!(p.join(o), pa);

        let (p, o) = pa.split::<Size1G>();
        assert_eq!(p.base().as_u64(), 0x0000_0004_0000_0000);
        assert_eq!(o.as_u64(), 0x1234_5678);
    }

    #[test]
    fn width_mask_clamps_to_architectural_limit() {
        let pa = PhysicalAddress::new(u64::MAX);
        assert_eq!(pa.masked_to_width(39).as_u64(), (1 << 39) - 1);
        assert_eq!(pa.masked_to_width(64).as_u64(), (1 << 52) - 1);
    }

    #[test]
    fn index_bits_are_nine_wide() {
        let va = VirtualAddress::new(u64::MAX);
        assert_eq!(va.index_bits(39), 0x1FF);
        assert_eq!(va.index_bits(12), 0x1FF);
        assert_eq!(VirtualAddress::new(0).index_bits(30), 0);
    }
}

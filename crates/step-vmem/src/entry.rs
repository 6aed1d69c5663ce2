use crate::addresses::{MAX_PHYSICAL_ADDRESS_WIDTH, PageSize, PhysicalAddress, PhysicalPage, Size4K};
use bitfield_struct::bitfield;

/// A raw 64-bit x86-64 paging-structure entry, as returned by the driver.
///
/// Models the **common superset** of fields found at all four levels
/// (PGD/PUD/PMD/PTE). Which fields are meaningful depends on the level the
/// value was read from:
///
/// | Bits   | Field               | Meaningful at |
/// |--------|---------------------|---------------|
/// | 0      | `present`           | all |
/// | 1      | `writable`          | all |
/// | 2      | `user_access`       | all |
/// | 3      | `write_through`     | all |
/// | 4      | `cache_disabled`    | all |
/// | 5      | `accessed`          | all |
/// | 6      | `dirty`             | leaves (PTE, huge PUD/PMD) |
/// | 7      | `large_page` (PS)   | PUD and PMD only |
/// | 8      | `global_translation`| leaves |
/// | 12..51 | frame / table base  | all (masked to `MAXPHYADDR`) |
/// | 59..62 | `protection_key`    | leaves |
/// | 63     | `no_execute`        | all |
///
/// In a 4 KiB PTE bit 7 is PAT, not PS; the walk never consults
/// [`large_page`](Self::large_page) at PGD or PTE level.
///
/// ```rust
/// # use step_vmem::PageEntryBits;
/// let e = PageEntryBits::from_bits(0x8000_0000_1234_5067);
/// assert!(e.present());
/// assert!(e.writable());
/// assert!(!e.executable());
/// assert_eq!(e.table_base(52).as_u64(), 0x1234_5000);
/// ```
#[bitfield(u64)]
#[derive(PartialEq, Eq, Hash)]
pub struct PageEntryBits {
    /// Present (P, bit 0).
    pub present: bool,
    /// Writable (RW, bit 1).
    pub writable: bool,
    /// User/Supervisor (US, bit 2).
    pub user_access: bool,
    /// Page Write-Through (PWT, bit 3).
    pub write_through: bool,
    /// Page Cache Disable (PCD, bit 4).
    pub cache_disabled: bool,
    /// Accessed (A, bit 5). Set by the CPU on the first access through this entry.
    pub accessed: bool,
    /// Dirty (D, bit 6), **leaf only**.
    pub dirty: bool,
    /// Page Size (PS, bit 7). On a PUD: 1 GiB leaf. On a PMD: 2 MiB leaf.
    pub large_page: bool,
    /// Global (G, bit 8), **leaf only**.
    pub global_translation: bool,
    /// OS-available (bits 9..=11).
    #[bits(3)]
    pub os_available_low: u8,
    /// Physical address bits [51:12].
    #[bits(40)]
    phys_addr_bits_51_12: u64,
    /// OS-available (bits 52..=58).
    #[bits(7)]
    pub os_available_high: u8,
    /// Protection Key (bits 59..=62).
    #[bits(4)]
    pub protection_key: u8,
    /// Execute Disable (XD/NX, bit 63).
    pub no_execute: bool,
}

impl PageEntryBits {
    /// Instruction fetches are allowed through this entry.
    #[inline]
    #[must_use]
    pub const fn executable(&self) -> bool {
        !self.no_execute()
    }

    /// Base of the next-level table this entry points to.
    ///
    /// Masks the raw value to `width` implemented physical bits and clears
    /// the 4 KiB offset bits, which also drops the flag bits.
    #[inline]
    #[must_use]
    pub const fn table_base(&self, width: u8) -> PhysicalAddress {
        self.frame::<Size4K>(width).base()
    }

    /// Base of the `S`-sized frame this entry maps directly.
    ///
    /// For a 2 MiB PMD leaf or 1 GiB PUD leaf the base field is narrower
    /// than for a table pointer; bits below `S::SHIFT` hold PAT and reserved
    /// bits and are cleared here.
    #[inline]
    #[must_use]
    pub const fn frame<S: PageSize>(&self, width: u8) -> PhysicalPage<S> {
        PhysicalAddress::new(self.into_bits())
            .masked_to_width(width)
            .page::<S>()
    }

    /// Replace the table / frame base, keeping all flag bits.
    ///
    /// Bits of `phys` above bit 51 and below bit 12 have no place in the
    /// entry and are dropped.
    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        let phys = phys.masked_to_width(MAX_PHYSICAL_ADDRESS_WIDTH);
        self.set_phys_addr_bits_51_12(phys.as_u64() >> 12);
    }

    /// The raw base field, bits [51:12], unmasked.
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.phys_addr_bits_51_12() << 12)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addresses::{Size1G, Size2M};

    #[test]
    fn flags_decode() {
        let e = PageEntryBits::from_bits(0x0000_0001_2345_60E3);
        assert!(e.present());
        assert!(e.writable());
        assert!(!e.user_access());
        assert!(e.accessed());
        assert!(e.dirty());
        assert!(e.large_page());
        assert!(e.executable());
    }

    #[test]
    fn base_address_depends_on_frame_size() {
        // PS=1, PAT (bit 12) set, base 0x4_4000_0000
        let e = PageEntryBits::from_bits(0x0000_0004_4000_1083);
        assert_eq!(e.table_base(52).as_u64(), 0x0000_0004_4000_1000);
        assert_eq!(e.frame::<Size2M>(52).base().as_u64(), 0x0000_0004_4000_0000);
        assert_eq!(e.frame::<Size1G>(52).base().as_u64(), 0x0000_0004_4000_0000);
    }

    #[test]
    fn width_mask_drops_high_flags() {
        let e = PageEntryBits::from_bits(0xFFF0_0000_0000_0000 | 0x7_1000 | 1);
        assert!(e.no_execute());
        assert_eq!(e.protection_key(), 0xF);
        assert_eq!(e.table_base(46).as_u64(), 0x7_1000);
        assert_eq!(e.table_base(16).as_u64(), 0x1000);
    }

    #[test]
    fn set_physical_address_keeps_flags() {
        let mut e = PageEntryBits::new()
            .with_present(true)
            .with_accessed(true)
            .with_no_execute(true);
        e.set_physical_address(PhysicalAddress::new(0xABCD_E000));
        assert_eq!(e.physical_address().as_u64(), 0xABCD_E000);
        assert!(e.present() && e.accessed() && e.no_execute());
    }

    #[test]
    fn set_physical_address_drops_bits_above_fifty_two() {
        let mut e = PageEntryBits::new().with_present(true).with_no_execute(true);
        e.set_physical_address(PhysicalAddress::new((1 << 60) | 0x000F_FFFF_FFFF_F123));
        assert_eq!(e.physical_address().as_u64(), 0x000F_FFFF_FFFF_F000);
        assert_eq!(e.os_available_high(), 0);
        assert_eq!(e.protection_key(), 0);
        assert!(e.present() && e.no_execute());
    }
}

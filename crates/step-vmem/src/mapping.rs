//! # Mapping Resolver
//!
//! A [`Mapping`] is a snapshot of one virtual address' translation as the
//! driver saw it: the four raw entries of the walk plus the physical base of
//! the top-level directory. Everything else is derived from it:
//!
//! | Level  | Base ([`physical_base_at`](Mapping::physical_base_at)) | Index ([`index_at`](Mapping::index_at)) |
//! |--------|------------------------------|------------------------|
//! | `Pgd`  | `pgd_physical_base`, masked like a table base | VA `[47:39]` |
//! | `Pud`  | table base of the PGD entry  | VA `[38:30]` |
//! | `Pmd`  | table base of the PUD entry  | VA `[29:21]` (not if PUD huge) |
//! | `Pte`  | table base of the PMD entry  | VA `[20:12]` (not if PUD/PMD huge) |
//! | `Page` | frame base of the last entry | VA `[29:0]` / `[20:0]` / `[11:0]` |
//!
//! [`physical_address_at`](Mapping::physical_address_at) scales the index by
//! the 8-byte entry width at directory levels and by one byte at `Page`.

use crate::addresses::{PhysicalAddress, Size1G, Size2M, Size4K, VirtualAddress};
use crate::entry::PageEntryBits;
use crate::error::{HugeLeaf, LevelError};
use crate::level::{PagingLevel, TableIndex};
use crate::source::{PageTableSource, RawMapping};
use crate::translation::{FrameSize, LevelView, TableSlot, Translation};

/// Immutable snapshot of one virtual address' translation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Mapping {
    virtual_address: VirtualAddress,
    physical_address: PhysicalAddress,
    pgd_physical_base: PhysicalAddress,
    pgd: PageEntryBits,
    pud: PageEntryBits,
    pmd: PageEntryBits,
    pte: PageEntryBits,
    address_width: u8,
}

impl Mapping {
    /// Query `source` once for `address` and snapshot the result.
    ///
    /// `address_width` is the number of implemented physical address bits;
    /// base-address fields are masked to it.
    ///
    /// # Errors
    /// Whatever the source reports. No partial mapping is ever produced.
    pub fn resolve<S: PageTableSource>(
        source: &S,
        address: VirtualAddress,
        address_width: u8,
    ) -> Result<Self, S::Error> {
        let raw = source.query(address)?;
        let mapping = Self::from_raw(&raw, address_width);
        log::debug!(
            "resolved {address}: pgd base {}, phys {}",
            mapping.pgd_physical_base,
            mapping.physical_address
        );
        Ok(mapping)
    }

    /// Build a mapping from a driver response.
    #[must_use]
    pub const fn from_raw(raw: &RawMapping, address_width: u8) -> Self {
        Self {
            virtual_address: VirtualAddress::new(raw.virt),
            physical_address: PhysicalAddress::new(raw.phys),
            pgd_physical_base: PhysicalAddress::new(raw.pgd_phys_address),
            pgd: PageEntryBits::from_bits(raw.pgd),
            pud: PageEntryBits::from_bits(raw.pud),
            pmd: PageEntryBits::from_bits(raw.pmd),
            pte: PageEntryBits::from_bits(raw.pte),
            address_width,
        }
    }

    /// The raw fields again, e.g. for logging or persisting a snapshot.
    #[must_use]
    pub const fn to_raw(&self) -> RawMapping {
        RawMapping {
            virt: self.virtual_address.as_u64(),
            phys: self.physical_address.as_u64(),
            pgd_phys_address: self.pgd_physical_base.as_u64(),
            pgd: self.pgd.into_bits(),
            pud: self.pud.into_bits(),
            pmd: self.pmd.into_bits(),
            pte: self.pte.into_bits(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn virtual_address(&self) -> VirtualAddress {
        self.virtual_address
    }

    /// Physical address of the mapped byte, as reported by the driver.
    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        self.physical_address
    }

    /// The top-level base exactly as reported; the walk masks it to
    /// [`address_width`](Self::address_width) and 4 KiB alignment.
    #[inline]
    #[must_use]
    pub const fn pgd_physical_base(&self) -> PhysicalAddress {
        self.pgd_physical_base
    }

    #[inline]
    #[must_use]
    pub const fn address_width(&self) -> u8 {
        self.address_width
    }

    /// Raw entry read at a directory level, or `None` for
    /// [`PagingLevel::Page`].
    ///
    /// Entries below a huge page are returned verbatim; they hold whatever
    /// the driver reported and are not part of the walk.
    #[must_use]
    pub const fn entry(&self, level: PagingLevel) -> Option<PageEntryBits> {
        match level {
            PagingLevel::Pgd => Some(self.pgd),
            PagingLevel::Pud => Some(self.pud),
            PagingLevel::Pmd => Some(self.pmd),
            PagingLevel::Pte => Some(self.pte),
            PagingLevel::Page => None,
        }
    }

    /// The huge page that terminates the walk, if any.
    #[must_use]
    pub const fn huge_leaf(&self) -> Option<HugeLeaf> {
        if self.pud.large_page() {
            Some(HugeLeaf::Pud1G)
        } else if self.pmd.large_page() {
            Some(HugeLeaf::Pmd2M)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_huge(&self) -> bool {
        self.huge_leaf().is_some()
    }

    /// Size of the frame the walk terminates in.
    #[must_use]
    pub const fn page_size(&self) -> FrameSize {
        match self.huge_leaf() {
            Some(HugeLeaf::Pud1G) => FrameSize::Size1G,
            Some(HugeLeaf::Pmd2M) => FrameSize::Size2M,
            None => FrameSize::Size4K,
        }
    }

    fn slot(&self, level: PagingLevel, table: PhysicalAddress) -> TableSlot {
        let shift = level.index_shift().unwrap_or(0);
        TableSlot::new(table, TableIndex::from_address(self.virtual_address, shift))
    }

    /// Decode the walk, short-circuiting at the first huge page.
    #[must_use]
    pub fn translation(&self) -> Translation {
        let va = self.virtual_address;
        let width = self.address_width;

        let pgd_table = self.pgd_physical_base.masked_to_width(width).page::<Size4K>().base();
        let pgd = self.slot(PagingLevel::Pgd, pgd_table);
        let pud = self.slot(PagingLevel::Pud, self.pgd.table_base(width));
        if self.pud.large_page() {
            return Translation::Huge1G {
                pgd,
                pud,
                frame: self.pud.frame::<Size1G>(width),
                offset: va.offset::<Size1G>(),
            };
        }

        let pmd = self.slot(PagingLevel::Pmd, self.pud.table_base(width));
        if self.pmd.large_page() {
            return Translation::Huge2M {
                pgd,
                pud,
                pmd,
                frame: self.pmd.frame::<Size2M>(width),
                offset: va.offset::<Size2M>(),
            };
        }

        let pte = self.slot(PagingLevel::Pte, self.pmd.table_base(width));
        Translation::Page4K {
            pgd,
            pud,
            pmd,
            pte,
            frame: self.pte.frame::<Size4K>(width),
            offset: va.offset::<Size4K>(),
        }
    }

    /// What `level` resolves to in this walk.
    ///
    /// # Errors
    /// [`LevelError`] if `level` is a directory below a huge-page leaf.
    pub fn level(&self, level: PagingLevel) -> Result<LevelView, LevelError> {
        let translation = self.translation();
        let slot = match (level, translation) {
            (PagingLevel::Pgd, t) => t.pgd(),
            (PagingLevel::Pud, t) => t.pud(),
            (PagingLevel::Pmd, Translation::Page4K { pmd, .. } | Translation::Huge2M { pmd, .. }) => {
                pmd
            }
            (PagingLevel::Pte, Translation::Page4K { pte, .. }) => pte,
            (PagingLevel::Page, t) => return Ok(LevelView::Frame(t.frame())),
            (PagingLevel::Pmd | PagingLevel::Pte, t) => {
                let terminated_by = match t {
                    Translation::Huge1G { .. } => HugeLeaf::Pud1G,
                    _ => HugeLeaf::Pmd2M,
                };
                log::trace!("{level} requested below a {terminated_by} leaf");
                return Err(LevelError {
                    level,
                    terminated_by,
                });
            }
        };
        Ok(LevelView::Directory(slot))
    }

    /// The slice of the virtual address that indexes `level`: a 9-bit entry
    /// index for directories, the in-frame byte offset for `Page`.
    ///
    /// # Errors
    /// [`LevelError`] for `Pmd`/`Pte` below a huge page.
    pub fn index_at(&self, level: PagingLevel) -> Result<u64, LevelError> {
        self.level(level).map(LevelView::index)
    }

    /// Physical base that [`index_at`](Self::index_at) indexes into.
    ///
    /// # Errors
    /// [`LevelError`] for `Pmd`/`Pte` below a huge page.
    pub fn physical_base_at(&self, level: PagingLevel) -> Result<PhysicalAddress, LevelError> {
        self.level(level).map(LevelView::base)
    }

    /// `physical_base_at(level) + index_at(level) × width`, where `width`
    /// is 8 bytes at directory levels and 1 byte at `Page`.
    ///
    /// That is the address of **the entry itself** for a directory, and of
    /// **the mapped byte** for `Page`.
    ///
    /// # Errors
    /// [`LevelError`] for `Pmd`/`Pte` below a huge page.
    pub fn physical_address_at(&self, level: PagingLevel) -> Result<PhysicalAddress, LevelError> {
        let view = self.level(level)?;
        log::trace!(
            "{level} of {}: base {} index {} -> {}",
            self.virtual_address,
            view.base(),
            view.index(),
            view.address()
        );
        Ok(view.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    const WIDTH: u8 = 46;
    const PRESENT_RW: u64 = 0b11;
    const PS: u64 = 1 << 7;
    const NX: u64 = 1 << 63;

    fn va(pgd: u64, pud: u64, pmd: u64, pte: u64, offset: u64) -> u64 {
        (pgd << 39) | (pud << 30) | (pmd << 21) | (pte << 12) | offset
    }

    fn raw_4k(virt: u64) -> RawMapping {
        RawMapping {
            virt,
            phys: 0x0000_0000_7654_3000 | (virt & 0xFFF),
            pgd_phys_address: 0x0000_0000_0100_0000,
            pgd: 0x0000_0000_0200_0000 | PRESENT_RW | 0x60,
            pud: 0x0000_0000_0300_0000 | PRESENT_RW,
            pmd: 0x0000_0000_0400_0000 | PRESENT_RW,
            pte: 0x0000_0000_7654_3000 | PRESENT_RW | NX,
        }
    }

    struct Fixture {
        raw: RawMapping,
        queries: Cell<usize>,
    }

    impl PageTableSource for Fixture {
        type Error = Infallible;

        fn query(&self, address: VirtualAddress) -> Result<RawMapping, Infallible> {
            self.queries.set(self.queries.get() + 1);
            Ok(RawMapping {
                virt: address.as_u64(),
                ..self.raw
            })
        }
    }

    #[test]
    fn end_to_end_4k_walk() {
        let virt = va(5, 3, 100, 200, 0x123);
        let m = Mapping::from_raw(&raw_4k(virt), WIDTH);

        assert_eq!(m.index_at(PagingLevel::Pgd), Ok(5));
        assert_eq!(m.index_at(PagingLevel::Pud), Ok(3));
        assert_eq!(m.index_at(PagingLevel::Pmd), Ok(100));
        assert_eq!(m.index_at(PagingLevel::Pte), Ok(200));
        assert_eq!(m.index_at(PagingLevel::Page), Ok(0x123));

        assert_eq!(
            m.physical_address_at(PagingLevel::Page).unwrap().as_u64(),
            0x7654_3000 + 0x123
        );
        assert_eq!(m.physical_address_at(PagingLevel::Page).unwrap(), m.physical_address());
    }

    #[test]
    fn directory_levels_scale_by_entry_width_page_by_byte() {
        let virt = va(5, 3, 100, 200, 0x123);
        let m = Mapping::from_raw(&raw_4k(virt), WIDTH);

        assert_eq!(
            m.physical_address_at(PagingLevel::Pgd).unwrap().as_u64(),
            0x0100_0000 + 5 * 8
        );
        assert_eq!(
            m.physical_address_at(PagingLevel::Pud).unwrap().as_u64(),
            0x0200_0000 + 3 * 8
        );
        assert_eq!(
            m.physical_address_at(PagingLevel::Pmd).unwrap().as_u64(),
            0x0300_0000 + 100 * 8
        );
        assert_eq!(
            m.physical_address_at(PagingLevel::Pte).unwrap().as_u64(),
            0x0400_0000 + 200 * 8
        );
        // Page: index is a byte offset, not an entry selector.
        assert_eq!(
            m.physical_address_at(PagingLevel::Page).unwrap().as_u64(),
            0x7654_3000 + 0x123
        );
    }

    #[test]
    fn bases_strip_flag_bits() {
        let m = Mapping::from_raw(&raw_4k(va(1, 2, 3, 4, 5)), WIDTH);
        assert_eq!(m.physical_base_at(PagingLevel::Pgd).unwrap().as_u64(), 0x0100_0000);
        assert_eq!(m.physical_base_at(PagingLevel::Pud).unwrap().as_u64(), 0x0200_0000);
        assert_eq!(m.physical_base_at(PagingLevel::Pmd).unwrap().as_u64(), 0x0300_0000);
        assert_eq!(m.physical_base_at(PagingLevel::Pte).unwrap().as_u64(), 0x0400_0000);
        assert_eq!(m.physical_base_at(PagingLevel::Page).unwrap().as_u64(), 0x7654_3000);
    }

    #[test]
    fn oversized_pgd_base_is_masked_before_indexing() {
        let raw = RawMapping {
            virt: va(511, 0, 0, 0, 0),
            pgd_phys_address: u64::MAX - 7,
            ..RawMapping::default()
        };
        let m = Mapping::from_raw(&raw, WIDTH);

        assert_eq!(
            m.physical_base_at(PagingLevel::Pgd).unwrap().as_u64(),
            0x0000_3FFF_FFFF_F000
        );
        assert_eq!(
            m.physical_address_at(PagingLevel::Pgd).unwrap().as_u64(),
            0x0000_3FFF_FFFF_F000 + 511 * 8
        );
        assert_eq!(m.pgd_physical_base().as_u64(), u64::MAX - 7);
        assert_eq!(m.to_raw(), raw);
    }

    #[test]
    fn page_address_is_leaf_base_plus_low_twelve_bits() {
        for virt in [va(0, 0, 0, 0, 0), va(511, 511, 511, 511, 0xFFF), 0x7FFF_1234_5ABC] {
            let m = Mapping::from_raw(&raw_4k(virt), WIDTH);
            assert_eq!(
                m.physical_address_at(PagingLevel::Page).unwrap().as_u64(),
                m.entry(PagingLevel::Pte).unwrap().table_base(WIDTH).as_u64() + (virt & 0xFFF)
            );
        }
    }

    #[test]
    fn huge_1g_short_circuits_pmd_and_pte() {
        let virt = va(7, 9, 300, 400, 0xABC);
        let raw = RawMapping {
            pud: 0x0000_0001_C000_0000 | PRESENT_RW | PS | (1 << 12),
            pmd: 0xDEAD_B000,
            pte: 0xBEEF_0000,
            ..raw_4k(virt)
        };
        let m = Mapping::from_raw(&raw, WIDTH);

        let err = LevelError {
            level: PagingLevel::Pmd,
            terminated_by: HugeLeaf::Pud1G,
        };
        assert_eq!(m.index_at(PagingLevel::Pmd), Err(err));
        assert_eq!(m.physical_base_at(PagingLevel::Pmd), Err(err));
        assert_eq!(
            m.index_at(PagingLevel::Pte),
            Err(LevelError {
                level: PagingLevel::Pte,
                terminated_by: HugeLeaf::Pud1G,
            })
        );
        assert!(m.physical_address_at(PagingLevel::Pte).is_err());

        assert_eq!(m.index_at(PagingLevel::Page), Ok(virt & 0x3FFF_FFFF));
        assert_eq!(
            m.physical_address_at(PagingLevel::Page).unwrap().as_u64(),
            0x0000_0001_C000_0000 + (virt & 0x3FFF_FFFF)
        );
        assert_eq!(m.page_size(), FrameSize::Size1G);
        assert!(m.is_huge());
        assert!(matches!(m.translation(), Translation::Huge1G { .. }));
    }

    #[test]
    fn huge_2m_short_circuits_pte_only() {
        let virt = va(7, 9, 300, 400, 0xABC);
        let raw = RawMapping {
            pmd: 0x0000_0000_3FE0_0000 | PRESENT_RW | PS,
            pte: 0xBEEF_0000,
            ..raw_4k(virt)
        };
        let m = Mapping::from_raw(&raw, WIDTH);

        assert_eq!(m.index_at(PagingLevel::Pmd), Ok(300));
        assert_eq!(
            m.physical_address_at(PagingLevel::Pmd).unwrap().as_u64(),
            0x0300_0000 + 300 * 8
        );
        assert_eq!(
            m.index_at(PagingLevel::Pte),
            Err(LevelError {
                level: PagingLevel::Pte,
                terminated_by: HugeLeaf::Pmd2M,
            })
        );
        assert_eq!(m.index_at(PagingLevel::Page), Ok(virt & 0x1F_FFFF));
        assert_eq!(
            m.physical_address_at(PagingLevel::Page).unwrap().as_u64(),
            0x3FE0_0000 + (virt & 0x1F_FFFF)
        );
    }

    #[test]
    fn canonical_edges_do_not_overflow_indices() {
        for virt in [0u64, 0x0000_7FFF_FFFF_FFFF, 0xFFFF_8000_0000_0000, u64::MAX] {
            let m = Mapping::from_raw(&raw_4k(virt), WIDTH);
            for level in [PagingLevel::Pgd, PagingLevel::Pud, PagingLevel::Pmd, PagingLevel::Pte] {
                assert!(m.index_at(level).unwrap() < 512);
            }
            assert!(m.index_at(PagingLevel::Page).unwrap() < 4096);
        }
        let top = Mapping::from_raw(&raw_4k(u64::MAX), WIDTH);
        assert_eq!(top.index_at(PagingLevel::Pgd), Ok(511));
    }

    #[test]
    fn resolving_twice_yields_identical_snapshots() {
        let source = Fixture {
            raw: raw_4k(0),
            queries: Cell::new(0),
        };
        let address = VirtualAddress::new(va(5, 3, 100, 200, 0x123));
        let a = Mapping::resolve(&source, address, WIDTH).unwrap();
        let b = Mapping::resolve(&source, address, WIDTH).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_raw(), b.to_raw());
        assert_eq!(source.queries.get(), 2);
    }
}

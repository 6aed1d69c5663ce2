//! # Translation
//!
//! A decoded walk, produced once from a [`Mapping`](crate::Mapping).
//!
//! Each variant carries exactly the table slots that exist for its page
//! size, so code matching on a [`Translation`] cannot ask for the PMD or
//! PTE slot of a walk that a huge page cut short:
//!
//! ```text
//! Page4K:  PGD ─► PUD ─► PMD ─► PTE ─► 4 KiB frame + offset[11:0]
//! Huge2M:  PGD ─► PUD ─► PMD ────────► 2 MiB frame + offset[20:0]
//! Huge1G:  PGD ─► PUD ───────────────► 1 GiB frame + offset[29:0]
//! ```

use crate::addresses::{
    PageOffset, PageSize, PhysicalAddress, PhysicalPage, Size1G, Size2M, Size4K,
};
use crate::level::TableIndex;
use core::fmt;

/// One directory visited by the walk: the table's physical base and the
/// index used to enter it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct TableSlot {
    pub table: PhysicalAddress,
    pub index: TableIndex,
}

impl TableSlot {
    #[inline]
    #[must_use]
    pub const fn new(table: PhysicalAddress, index: TableIndex) -> Self {
        Self { table, index }
    }

    /// Physical address of the selected 8-byte entry (`table + index × 8`).
    #[inline]
    #[must_use]
    pub const fn entry_address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.table.as_u64() + self.index.byte_offset())
    }
}

/// Size of the frame a walk terminates in.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FrameSize {
    Size4K,
    Size2M,
    Size1G,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Size4K => Size4K::NAME,
            Self::Size2M => Size2M::NAME,
            Self::Size1G => Size1G::NAME,
        })
    }
}

/// The final frame of a walk and the byte offset into it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FrameSlot {
    pub base: PhysicalAddress,
    pub offset: u64,
    pub size: FrameSize,
}

impl FrameSlot {
    fn from_parts<S: PageSize>(frame: PhysicalPage<S>, offset: PageOffset<S>, size: FrameSize) -> Self {
        Self {
            base: frame.base(),
            offset: offset.as_u64(),
            size,
        }
    }

    /// Physical address of the mapped byte (`base + offset`, byte granular).
    #[inline]
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        PhysicalAddress::new(self.base.as_u64() + self.offset)
    }
}

/// What a single level of a walk resolves to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LevelView {
    /// A directory: table base plus the entry index.
    Directory(TableSlot),
    /// The terminating frame: frame base plus byte offset.
    Frame(FrameSlot),
}

impl LevelView {
    /// Physical base the index or offset applies to.
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        match self {
            Self::Directory(slot) => slot.table,
            Self::Frame(slot) => slot.base,
        }
    }

    /// Entry index for a directory, byte offset for the frame.
    #[must_use]
    pub const fn index(self) -> u64 {
        match self {
            Self::Directory(slot) => slot.index.as_u64(),
            Self::Frame(slot) => slot.offset,
        }
    }

    /// Address of the entry itself (directory) or of the mapped byte (frame).
    #[must_use]
    pub const fn address(self) -> PhysicalAddress {
        match self {
            Self::Directory(slot) => slot.entry_address(),
            Self::Frame(slot) => slot.address(),
        }
    }
}

/// A fully decoded walk.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Translation {
    Page4K {
        pgd: TableSlot,
        pud: TableSlot,
        pmd: TableSlot,
        pte: TableSlot,
        frame: PhysicalPage<Size4K>,
        offset: PageOffset<Size4K>,
    },
    Huge2M {
        pgd: TableSlot,
        pud: TableSlot,
        pmd: TableSlot,
        frame: PhysicalPage<Size2M>,
        offset: PageOffset<Size2M>,
    },
    Huge1G {
        pgd: TableSlot,
        pud: TableSlot,
        frame: PhysicalPage<Size1G>,
        offset: PageOffset<Size1G>,
    },
}

impl Translation {
    /// The PGD slot, present in every walk.
    #[must_use]
    pub const fn pgd(&self) -> TableSlot {
        match self {
            Self::Page4K { pgd, .. } | Self::Huge2M { pgd, .. } | Self::Huge1G { pgd, .. } => *pgd,
        }
    }

    /// The PUD slot, present in every walk.
    #[must_use]
    pub const fn pud(&self) -> TableSlot {
        match self {
            Self::Page4K { pud, .. } | Self::Huge2M { pud, .. } | Self::Huge1G { pud, .. } => *pud,
        }
    }

    /// The terminating frame and the offset of the mapped byte within it.
    #[must_use]
    pub fn frame(&self) -> FrameSlot {
        match *self {
            Self::Page4K { frame, offset, .. } => {
                FrameSlot::from_parts(frame, offset, FrameSize::Size4K)
            }
            Self::Huge2M { frame, offset, .. } => {
                FrameSlot::from_parts(frame, offset, FrameSize::Size2M)
            }
            Self::Huge1G { frame, offset, .. } => {
                FrameSlot::from_parts(frame, offset, FrameSize::Size1G)
            }
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> FrameSize {
        match self {
            Self::Page4K { .. } => FrameSize::Size4K,
            Self::Huge2M { .. } => FrameSize::Size2M,
            Self::Huge1G { .. } => FrameSize::Size1G,
        }
    }
}

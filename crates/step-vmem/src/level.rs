//! # Paging Levels
//!
//! The five positions of a 4-level x86-64 walk, root to leaf, and the
//! strongly typed 9-bit index used to enter a directory level.

use crate::addresses::VirtualAddress;
use core::fmt;
use core::str::FromStr;

/// One position in the paging hierarchy, ordered root → leaf.
///
/// The first four name a **directory** (a 512-entry table); [`Page`](Self::Page)
/// names the final mapped frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PagingLevel {
    /// Top-level directory (PML4), entered with VA bits `[47:39]`.
    Pgd,
    /// Upper directory (PDPT), entered with VA bits `[38:30]`.
    Pud,
    /// Middle directory (PD), entered with VA bits `[29:21]`.
    Pmd,
    /// Leaf table (PT), entered with VA bits `[20:12]`.
    Pte,
    /// The mapped frame itself (4 KiB, 2 MiB or 1 GiB).
    Page,
}

impl PagingLevel {
    /// All levels, root first.
    pub const ALL: [Self; 5] = [Self::Pgd, Self::Pud, Self::Pmd, Self::Pte, Self::Page];

    /// Bit position of this level's index in a virtual address, or `None`
    /// for [`Page`](Self::Page), whose offset width depends on the walk.
    #[inline]
    #[must_use]
    pub const fn index_shift(self) -> Option<u32> {
        match self {
            Self::Pgd => Some(39),
            Self::Pud => Some(30),
            Self::Pmd => Some(21),
            Self::Pte => Some(12),
            Self::Page => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pgd => "pgd",
            Self::Pud => "pud",
            Self::Pmd => "pmd",
            Self::Pte => "pte",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for PagingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A level name that is not one of `pgd`, `pud`, `pmd`, `pte`, `page`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, thiserror::Error)]
#[error("unknown paging level (expected pgd, pud, pmd, pte or page)")]
pub struct ParseLevelError;

impl FromStr for PagingLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or(ParseLevelError)
    }
}

/// Index into a 512-entry directory, derived from a virtual address.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl TableIndex {
    /// Size of one directory entry in bytes.
    pub const ENTRY_SIZE: u64 = 8;

    /// Extract the index at bit `shift` of `va` (always masked to 9 bits).
    #[inline]
    #[must_use]
    pub const fn from_address(va: VirtualAddress, shift: u32) -> Self {
        Self(va.index_bits(shift))
    }

    /// Construct from a raw value.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 512);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Byte offset of the selected entry within its table.
    #[inline]
    #[must_use]
    pub const fn byte_offset(self) -> u64 {
        self.as_u64() * Self::ENTRY_SIZE
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

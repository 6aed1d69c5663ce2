//! # Page-Table Walk Reconstruction
//!
//! Rebuilds the x86-64 translation of a single virtual address from the raw
//! paging-structure entries a kernel driver reports for it.
//!
//! ## What you get
//! - [`VirtualAddress`]/[`PhysicalAddress`] newtypes and page-size markers.
//! - [`PageEntryBits`], a bit-level view of one raw entry.
//! - [`PagingLevel`], the five positions of a walk (`Pgd` … `Page`).
//! - [`Mapping`], an immutable snapshot with per-level index, base and
//!   address derivation ([`Mapping::physical_address_at`]).
//! - [`Translation`], the decoded walk as a tagged union over 4 KiB, 2 MiB
//!   and 1 GiB terminations.
//! - [`PageTableSource`], the seam a driver (or a test fixture) implements.
//! - [`MappingDump`], a human-readable tree of the walk.
//!
//! ## Virtual address layout
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PGD  |  PUD  |  PMD  |  PTE  | Offset |
//! ```
//!
//! Each directory holds 512 entries of 8 bytes. A PUD entry with `PS=1`
//! maps a 1 GiB frame and ends the walk; so does a PMD entry with `PS=1`
//! for a 2 MiB frame. Asking for a level below such a leaf yields a
//! [`LevelError`] instead of a made-up address.
//!
//! ## Physical address width
//!
//! Base addresses stored in entries are masked to the CPU's implemented
//! physical address bits (`MAXPHYADDR`) before the low frame-offset bits
//! are cleared. The width is a plain input here; querying the CPU for it
//! lives in `step-registers`.
//!
//! ```rust
//! use step_vmem::{Mapping, PagingLevel, RawMapping};
//!
//! let raw = RawMapping {
//!     virt: (5 << 39) | (3 << 30) | (100 << 21) | (200 << 12) | 0x123,
//!     phys: 0x7654_3123,
//!     pgd_phys_address: 0x0100_0000,
//!     pgd: 0x0200_0003,
//!     pud: 0x0300_0003,
//!     pmd: 0x0400_0003,
//!     pte: 0x7654_3003,
//! };
//! let mapping = Mapping::from_raw(&raw, 46);
//! assert_eq!(mapping.index_at(PagingLevel::Pmd), Ok(100));
//! assert_eq!(
//!     mapping.physical_address_at(PagingLevel::Pte).unwrap().as_u64(),
//!     0x0400_0000 + 200 * 8
//! );
//! ```

#![cfg_attr(not(test), no_std)]

mod addresses;
mod dump;
mod entry;
mod error;
mod level;
mod mapping;
mod source;
mod translation;

pub use crate::addresses::{
    MAX_PHYSICAL_ADDRESS_WIDTH, PageOffset, PageSize, PhysicalAddress, PhysicalPage, Size1G,
    Size2M, Size4K, VirtualAddress,
};
pub use crate::dump::MappingDump;
pub use crate::entry::PageEntryBits;
pub use crate::error::{HugeLeaf, LevelError};
pub use crate::level::{PagingLevel, ParseLevelError, TableIndex};
pub use crate::mapping::Mapping;
pub use crate::source::{PageTableSource, RawMapping};
pub use crate::translation::{FrameSize, FrameSlot, LevelView, TableSlot, Translation};

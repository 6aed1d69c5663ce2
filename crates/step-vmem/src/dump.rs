//! Human-readable tree rendering of a [`Mapping`].

use crate::entry::PageEntryBits;
use crate::level::PagingLevel;
use crate::mapping::Mapping;
use crate::translation::{FrameSlot, LevelView};
use core::fmt;

/// Renders a walk as an indented tree, root first, ending at the frame.
///
/// Levels a huge page cut short are not printed; the terminating directory
/// entry is flagged with its page size instead.
///
/// ```rust
/// # use step_vmem::{Mapping, MappingDump, RawMapping};
/// let raw = RawMapping { virt: 0x7000_0123, pgd_phys_address: 0x1000, ..RawMapping::default() };
/// let text = MappingDump(&Mapping::from_raw(&raw, 46)).to_string();
/// assert!(text.starts_with("mapping 0x0000000070000123"));
/// assert!(text.contains("page [4KiB]"));
/// ```
#[derive(Copy, Clone)]
pub struct MappingDump<'a>(pub &'a Mapping);

const INDENT: &str = "  ";

fn pad(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn write_directory(
    f: &mut fmt::Formatter<'_>,
    depth: usize,
    level: PagingLevel,
    view: LevelView,
    entry: PageEntryBits,
) -> fmt::Result {
    pad(f, depth)?;
    writeln!(f, "{level}")?;
    pad(f, depth + 1)?;
    writeln!(f, "base    {}", view.base())?;
    pad(f, depth + 1)?;
    writeln!(f, "index   {}", view.index())?;
    pad(f, depth + 1)?;
    writeln!(f, "entry   {} = 0x{:016X}", view.address(), entry.into_bits())?;
    pad(f, depth + 1)?;
    write!(
        f,
        "flags   present={} accessed={} writable={} executable={}",
        flag(entry.present()),
        flag(entry.accessed()),
        flag(entry.writable()),
        flag(entry.executable()),
    )?;
    if matches!(level, PagingLevel::Pud | PagingLevel::Pmd) {
        write!(f, " page_size={}", flag(entry.large_page()))?;
    }
    let leaf = level == PagingLevel::Pte
        || (matches!(level, PagingLevel::Pud | PagingLevel::Pmd) && entry.large_page());
    if leaf {
        write!(f, " dirty={}", flag(entry.dirty()))?;
    }
    writeln!(f)
}

fn write_frame(f: &mut fmt::Formatter<'_>, depth: usize, frame: FrameSlot) -> fmt::Result {
    pad(f, depth)?;
    writeln!(f, "page [{}]", frame.size)?;
    pad(f, depth + 1)?;
    writeln!(f, "base    {}", frame.base)?;
    pad(f, depth + 1)?;
    writeln!(f, "offset  0x{:X}", frame.offset)?;
    pad(f, depth + 1)?;
    writeln!(f, "phys    {}", frame.address())
}

impl fmt::Display for MappingDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mapping = self.0;
        writeln!(
            f,
            "mapping {} -> {}",
            mapping.virtual_address(),
            mapping.physical_address()
        )?;

        let mut depth = 1;
        for level in PagingLevel::ALL {
            match (mapping.level(level), mapping.entry(level)) {
                (Ok(LevelView::Frame(frame)), _) => write_frame(f, depth, frame)?,
                (Ok(view), Some(entry)) => write_directory(f, depth, level, view, entry)?,
                // Below a huge leaf, or a frame without an entry.
                _ => continue,
            }
            depth += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawMapping;

    #[test]
    fn four_k_walk_lists_every_level() {
        let raw = RawMapping {
            virt: (5 << 39) | (3 << 30) | (100 << 21) | (200 << 12) | 0x123,
            phys: 0x7654_3123,
            pgd_phys_address: 0x0100_0000,
            pgd: 0x0200_0023,
            pud: 0x0300_0003,
            pmd: 0x0400_0003,
            pte: 0x7654_3063,
        };
        let text = MappingDump(&Mapping::from_raw(&raw, 46)).to_string();
        for level in ["pgd", "pud", "pmd", "pte", "page [4KiB]"] {
            assert!(text.contains(level), "missing {level} in\n{text}");
        }
        assert!(text.contains("index   200"));
        assert!(text.contains("phys    0x0000000076543123"));
        assert!(text.contains("dirty=1"));
    }

    #[test]
    fn huge_walk_stops_at_the_leaf() {
        let raw = RawMapping {
            virt: 0x4012_3456,
            pgd_phys_address: 0x1000,
            pgd: 0x2003,
            pud: 0x4000_0083,
            pmd: 0xFFFF_F000,
            ..RawMapping::default()
        };
        let text = MappingDump(&Mapping::from_raw(&raw, 46)).to_string();
        assert!(text.contains("page_size=1"));
        assert!(!text.contains("pmd"));
        assert!(!text.contains("pte"));
        assert!(text.contains("page [1GiB]"));
        assert!(text.contains("offset  0x123456"));
    }
}

use crate::level::PagingLevel;
use core::fmt;

/// The huge-page entry that ended a walk early.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HugeLeaf {
    /// The PUD entry has `PS=1` and maps a 1 GiB frame.
    Pud1G,
    /// The PMD entry has `PS=1` and maps a 2 MiB frame.
    Pmd2M,
}

impl fmt::Display for HugeLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pud1G => f.write_str("1 GiB PUD"),
            Self::Pmd2M => f.write_str("2 MiB PMD"),
        }
    }
}

/// A directory level was requested below a huge-page short-circuit.
///
/// There is no table at `level` to index into: the walk already ended at
/// `terminated_by`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
#[error("no {level} table exists: the walk ends at a {terminated_by} huge page")]
pub struct LevelError {
    pub level: PagingLevel,
    pub terminated_by: HugeLeaf,
}

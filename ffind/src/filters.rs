/// Per-entry filters applied by the traversal engine before a path is printed.
///
/// A `MatchFilters` value is built once from the configuration and then shared
/// read-only by every worker, so nothing in here needs a lock.
use serde::{Deserialize, Serialize};

use crate::search::fs::EntryKind;

/// Which kinds of entries are eligible to be reported (`-type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    /// Every entry, whatever its kind
    #[default]
    Any,
    /// Everything that is not a directory (`-type f`)
    File,
    /// Directories only (`-type d`)
    Directory,
}

impl TypeFilter {
    /// Parses the single-letter form used by find(1)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'f' => Some(Self::File),
            'd' => Some(Self::Directory),
            _ => None,
        }
    }

    pub fn accepts(self, kind: EntryKind) -> bool {
        match self {
            Self::Any => true,
            Self::File => !kind.is_dir(),
            Self::Directory => kind.is_dir(),
        }
    }
}

/// Record separator written after every matched path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terminator {
    #[default]
    Newline,
    /// `-print0`
    Nul,
}

impl Terminator {
    pub fn from_print0(print0: bool) -> Self {
        if print0 {
            Self::Nul
        } else {
            Self::Newline
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Newline => b"\n",
            Self::Nul => b"\0",
        }
    }
}

/// Filters shared by every worker for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchFilters {
    pub entry_type: TypeFilter,
    pub follow_symlinks: bool,
    pub terminator: Terminator,
}

impl MatchFilters {
    pub fn accepts(&self, kind: EntryKind) -> bool {
        self.entry_type.accepts(kind)
    }
}

/// Remaining number of directory levels the walker may descend into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthBudget {
    Unlimited,
    Remaining(u32),
}

impl DepthBudget {
    /// Converts a `-maxdepth` value; any negative number means no limit
    pub fn from_max_depth(max_depth: i64) -> Self {
        if max_depth < 0 {
            Self::Unlimited
        } else {
            Self::Remaining(u32::try_from(max_depth).unwrap_or(u32::MAX))
        }
    }

    /// Budget for the level below, or `None` if descending is not allowed
    pub fn descend(self) -> Option<Self> {
        match self {
            Self::Unlimited => Some(Self::Unlimited),
            Self::Remaining(0) => None,
            Self::Remaining(n) => Some(Self::Remaining(n - 1)),
        }
    }
}

//! Region resolution.
//!
//! The [`ConflictResolver`] turns each aligned region into a [`Hunk`]: the
//! region either resolves cleanly to one side's lines or is surfaced as a
//! conflict carrying all three versions.

use serde::{Deserialize, Serialize};

use super::aligner::{AlignedRegion, RegionKind};
use super::lines::owned;

/// One contiguous piece of merged output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Hunk {
    /// Lines that merged without disagreement.
    Clean {
        #[serde(rename = "resolvedLines")]
        resolved_lines: Vec<String>,
    },
    /// Both sides changed the same lines differently.
    Conflict {
        #[serde(rename = "baseLines")]
        base_lines: Vec<String>,
        #[serde(rename = "headLines")]
        head_lines: Vec<String>,
        #[serde(rename = "ancestorLines")]
        ancestor_lines: Vec<String>,
    },
}

impl Hunk {
    pub fn clean(lines: &[&str]) -> Self {
        Hunk::Clean {
            resolved_lines: owned(lines),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Hunk::Conflict { .. })
    }

    /// A clean hunk with no lines, as produced for a deleted file.
    pub fn is_empty_clean(&self) -> bool {
        matches!(self, Hunk::Clean { resolved_lines } if resolved_lines.is_empty())
    }
}

/// Stateless region-to-hunk resolution.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Resolve one aligned region.
    ///
    /// Unchanged regions keep the ancestor's lines, one-sided edits take that
    /// side's lines, convergent edits take the shared result, and divergent
    /// edits become a [`Hunk::Conflict`].
    pub fn resolve(region: &AlignedRegion<'_>) -> Hunk {
        match region.kind {
            RegionKind::Unchanged => Hunk::clean(region.ancestor_lines),
            RegionKind::BaseOnly | RegionKind::BothSame => Hunk::clean(region.base_lines),
            RegionKind::HeadOnly => Hunk::clean(region.head_lines),
            RegionKind::BothDiff => Hunk::Conflict {
                base_lines: owned(region.base_lines),
                head_lines: owned(region.head_lines),
                ancestor_lines: owned(region.ancestor_lines),
            },
        }
    }
}

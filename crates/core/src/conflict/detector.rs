//! Whole-file change detection.
//!
//! Before any line is compared, the three optional versions of a file are
//! classified into a [`MergePath`]. Every combination of present / absent
//! content maps to exactly one path, checked in priority order.

use serde::{Deserialize, Serialize};

/// How a single file is merged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MergePath {
    /// Neither base nor head has the file.
    DeletedBoth,
    /// The file was created on head only.
    HeadOnlyCreate,
    /// The file was created on base only.
    BaseOnlyCreate,
    /// Base still matches the ancestor; head changed (or deleted) the file.
    HeadChanged,
    /// Head still matches the ancestor; base changed (or deleted) the file.
    BaseChanged,
    /// All three versions are identical.
    NoChange,
    /// Both sides changed the file to the same content.
    Convergent,
    /// Both sides changed the file differently; run the line merge.
    Merging,
}

impl std::fmt::Display for MergePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeletedBoth => write!(f, "deleted_both"),
            Self::HeadOnlyCreate => write!(f, "head_only_create"),
            Self::BaseOnlyCreate => write!(f, "base_only_create"),
            Self::HeadChanged => write!(f, "head_changed"),
            Self::BaseChanged => write!(f, "base_changed"),
            Self::NoChange => write!(f, "no_change"),
            Self::Convergent => write!(f, "convergent"),
            Self::Merging => write!(f, "merging"),
        }
    }
}

/// Classify a file from its ancestor, base, and head content.
///
/// `None` means the file does not exist at that revision, which is not the
/// same as an empty file.
pub fn classify(ancestor: Option<&str>, base: Option<&str>, head: Option<&str>) -> MergePath {
    match (ancestor, base, head) {
        (_, None, None) => MergePath::DeletedBoth,
        (None, None, Some(_)) => MergePath::HeadOnlyCreate,
        (None, Some(_), None) => MergePath::BaseOnlyCreate,
        _ if base == ancestor && head != ancestor => MergePath::HeadChanged,
        _ if head == ancestor && base != ancestor => MergePath::BaseChanged,
        _ if base == ancestor => MergePath::NoChange,
        _ if base == head => MergePath::Convergent,
        _ => MergePath::Merging,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_combinations() {
        assert_eq!(classify(Some("x"), None, None), MergePath::DeletedBoth);
        assert_eq!(classify(None, None, None), MergePath::DeletedBoth);
        assert_eq!(classify(None, None, Some("new")), MergePath::HeadOnlyCreate);
        assert_eq!(classify(None, Some("new"), None), MergePath::BaseOnlyCreate);
    }

    #[test]
    fn test_one_sided_changes() {
        assert_eq!(classify(Some("a"), Some("a"), Some("b")), MergePath::HeadChanged);
        assert_eq!(classify(Some("a"), Some("b"), Some("a")), MergePath::BaseChanged);
        // Deleted on one side, untouched on the other.
        assert_eq!(classify(Some("a"), Some("a"), None), MergePath::HeadChanged);
        assert_eq!(classify(Some("a"), None, Some("a")), MergePath::BaseChanged);
    }

    #[test]
    fn test_no_change_and_convergence() {
        assert_eq!(classify(Some("a"), Some("a"), Some("a")), MergePath::NoChange);
        assert_eq!(classify(Some("a"), Some("b"), Some("b")), MergePath::Convergent);
        assert_eq!(classify(None, Some("b"), Some("b")), MergePath::Convergent);
    }

    #[test]
    fn test_empty_is_not_absent() {
        assert_eq!(classify(Some(""), Some(""), None), MergePath::HeadChanged);
        assert_eq!(classify(None, Some(""), Some("x")), MergePath::Merging);
    }

    #[test]
    fn test_divergent_changes_merge() {
        assert_eq!(classify(Some("a"), Some("b"), Some("c")), MergePath::Merging);
        assert_eq!(classify(Some("a"), None, Some("c")), MergePath::Merging);
        assert_eq!(classify(None, Some("b"), Some("c")), MergePath::Merging);
    }
}

//! Wire-level model types for merge previews.
//!
//! These types bridge the preview service, the HTTP API, and the CLI. They
//! serialize with camelCase field names.

use serde::{Deserialize, Serialize};

use crate::conflict::{Hunk, MergeResult};

// ---------------------------------------------------------------------------
// Per-file results
// ---------------------------------------------------------------------------

/// The merged view of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictFileData {
    pub path: String,
    pub hunks: Vec<Hunk>,
    pub has_conflicts: bool,
    /// Always the negation of `has_conflicts`.
    pub auto_resolved: bool,
}

impl ConflictFileData {
    pub fn new(path: impl Into<String>, result: MergeResult) -> Self {
        Self {
            path: path.into(),
            auto_resolved: !result.has_conflicts,
            has_conflicts: result.has_conflicts,
            hunks: result.hunks,
        }
    }

    /// True when the merge removes the file.
    pub fn is_deletion(&self) -> bool {
        self.hunks.iter().all(Hunk::is_empty_clean)
    }
}

/// A file whose merge could not be computed (fetch error, timeout, non-text
/// content, size limit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

impl FailedFile {
    pub fn new(path: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// One entry of a preview's file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileMergeEntry {
    Merged(ConflictFileData),
    Failed(FailedFile),
}

impl FileMergeEntry {
    pub fn path(&self) -> &str {
        match self {
            Self::Merged(data) => &data.path,
            Self::Failed(failed) => &failed.path,
        }
    }

    /// Whether this entry is a merged file with at least one conflict.
    pub fn has_conflicts(&self) -> bool {
        matches!(self, Self::Merged(data) if data.has_conflicts)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

/// The result of previewing a merge of `head_branch` into `base_branch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergePreview {
    pub merge_base_sha: String,
    pub base_branch: String,
    pub head_branch: String,
    /// Entries in the order the comparison listed the files.
    pub files: Vec<FileMergeEntry>,
    /// Whether the changed-file list was cut to the configured maximum.
    pub truncated: bool,
}

impl MergePreview {
    pub fn conflicted_count(&self) -> usize {
        self.files.iter().filter(|f| f.has_conflicts()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }
}

//! Where file revisions come from.
//!
//! The preview service only needs two things from a repository host: the
//! merge base and changed-file list of two refs, and the content of one file
//! at one revision. [`RevisionSource`] is that seam; the GitHub API and local
//! git repositories implement it in [`crate::git`].

use async_trait::async_trait;

use crate::errors::SourceError;

/// The result of comparing two refs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// The best common ancestor of the two refs.
    pub merge_base_sha: String,
    /// Paths changed between the merge base and the head ref, in the order
    /// the host reports them.
    pub files: Vec<String>,
}

#[async_trait]
pub trait RevisionSource: Send + Sync {
    /// Compare `base_ref` with `head_ref`.
    async fn compare(&self, base_ref: &str, head_ref: &str) -> Result<Comparison, SourceError>;

    /// Fetch the text of `path` at `rev`. `Ok(None)` means the file does not
    /// exist at that revision; it is not an error.
    async fn fetch(&self, path: &str, rev: &str) -> Result<Option<String>, SourceError>;
}

/// Interpret raw blob bytes as text.
pub(crate) fn decode_text(bytes: Vec<u8>, path: &str, rev: &str) -> Result<String, SourceError> {
    String::from_utf8(bytes).map_err(|_| SourceError::NotText {
        path: path.to_string(),
        rev: rev.to_string(),
    })
}

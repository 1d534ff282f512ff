//! Error types for the mergelens core library.
//!
//! The merge engine itself is total and has no error type. Everything around
//! it (fetching revisions, comparing refs, loading configuration) reports
//! failures through the `thiserror` enums below.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// The two refs share no history.
    #[error("no merge base between '{base}' and '{head}'")]
    NoMergeBase { base: String, head: String },
}

// ---------------------------------------------------------------------------
// GitHub API errors
// ---------------------------------------------------------------------------

/// Errors from GitHub REST API interactions.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("GitHub HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("GitHub API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Authentication token is missing or invalid.
    #[error("GitHub authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded.
    #[error("GitHub rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    /// JSON or content decoding failure.
    #[error("GitHub response parse error: {0}")]
    ParseError(String),
}

// ---------------------------------------------------------------------------
// Revision source errors
// ---------------------------------------------------------------------------

/// A failed call to a [`RevisionSource`](crate::source::RevisionSource).
///
/// A file that does not exist at a revision is *not* an error; sources report
/// that as `Ok(None)`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Git(#[from] GitError),

    /// The file exists but its content is not valid UTF-8.
    #[error("'{path}' at {rev} is not a UTF-8 text file")]
    NotText { path: String, rev: String },

    /// The fetch did not finish within the configured timeout.
    #[error("timed out after {secs}s fetching '{path}' at {rev}")]
    Timeout { path: String, rev: String, secs: u64 },

    /// A blocking worker panicked or was cancelled.
    #[error("background task failed: {0}")]
    TaskFailed(String),
}

// ---------------------------------------------------------------------------
// Preview errors
// ---------------------------------------------------------------------------

/// Request-level failures of a merge preview. Per-file failures never surface
/// here; they are reported as failed entries in the preview itself.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// Comparing the two refs failed, so there is no file list to merge.
    #[error("failed to compare '{base}'...'{head}': {source}")]
    Comparison {
        base: String,
        head: String,
        #[source]
        source: SourceError,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

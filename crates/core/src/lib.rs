//! mergelens core library.
//!
//! This crate provides the three-way line merge engine ([`conflict`]), the
//! merge preview service that runs it over every file changed between two
//! refs ([`preview`]), the revision sources it reads from ([`git`]), and the
//! shared configuration and error types.

pub mod config;
pub mod conflict;
pub mod errors;
pub mod git;
pub mod models;
pub mod preview;
pub mod source;

// Re-exports for convenience.
pub use config::AppConfig;
pub use conflict::{MergeResult, Merger};
pub use models::{ConflictFileData, FailedFile, FileMergeEntry, MergePreview};
pub use preview::MergePreviewer;
pub use source::{Comparison, RevisionSource};

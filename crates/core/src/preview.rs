//! Merge preview: run the three-way merge over every file changed between
//! two refs.
//!
//! A preview compares the refs once, bounds the changed-file list, then fans
//! out one task per file. Each task fetches the ancestor, base, and head
//! versions concurrently and merges them on a blocking worker. A file that
//! cannot be fetched or merged becomes a [`FailedFile`] entry; it never aborts
//! its siblings.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::config::MergeConfig;
use crate::conflict::Merger;
use crate::errors::{PreviewError, SourceError};
use crate::models::{ConflictFileData, FailedFile, FileMergeEntry, MergePreview};
use crate::source::{Comparison, RevisionSource};

/// Limits applied to a single preview.
#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub max_files: usize,
    pub max_concurrency: usize,
    pub max_diff_cost: usize,
    pub max_file_lines: usize,
    pub fetch_timeout: Duration,
}

impl From<&MergeConfig> for PreviewSettings {
    fn from(config: &MergeConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_concurrency: config.max_concurrency.max(1),
            max_diff_cost: config.max_diff_cost,
            max_file_lines: config.max_file_lines,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self::from(&MergeConfig::default())
    }
}

/// Why one file could not be merged.
#[derive(Debug, Error)]
enum FileFailure {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("file too large to merge ({lines} lines, limit {limit})")]
    TooLarge { lines: usize, limit: usize },

    #[error("merge worker failed: {0}")]
    Worker(String),
}

/// The three revisions every file is fetched at.
#[derive(Debug)]
struct Revisions {
    ancestor: String,
    base: String,
    head: String,
}

/// Computes [`MergePreview`]s against one [`RevisionSource`].
#[derive(Clone)]
pub struct MergePreviewer {
    source: Arc<dyn RevisionSource>,
    settings: PreviewSettings,
}

impl MergePreviewer {
    pub fn new(source: Arc<dyn RevisionSource>, settings: PreviewSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    /// Preview merging `head_ref` into `base_ref`.
    ///
    /// Only a failed comparison fails the whole preview.
    #[instrument(skip(self))]
    pub async fn preview(&self, base_ref: &str, head_ref: &str) -> Result<MergePreview, PreviewError> {
        let Comparison {
            merge_base_sha,
            mut files,
        } = self
            .source
            .compare(base_ref, head_ref)
            .await
            .map_err(|source| PreviewError::Comparison {
                base: base_ref.to_string(),
                head: head_ref.to_string(),
                source,
            })?;

        let truncated = files.len() > self.settings.max_files;
        if truncated {
            warn!(
                changed = files.len(),
                limit = self.settings.max_files,
                "changed-file list truncated"
            );
            files.truncate(self.settings.max_files);
        }
        debug!(merge_base = %merge_base_sha, files = files.len(), "comparison complete");

        let revisions = Arc::new(Revisions {
            ancestor: merge_base_sha.clone(),
            base: base_ref.to_string(),
            head: head_ref.to_string(),
        });
        let entries = self.merge_all(&files, revisions).await;

        let preview = MergePreview {
            merge_base_sha,
            base_branch: base_ref.to_string(),
            head_branch: head_ref.to_string(),
            files: entries,
            truncated,
        };
        info!(
            files = preview.files.len(),
            conflicted = preview.conflicted_count(),
            failed = preview.failed_count(),
            truncated,
            "merge preview complete"
        );
        Ok(preview)
    }

    /// Merge every path, at most `max_concurrency` at a time, and return the
    /// entries in the order of `paths`.
    async fn merge_all(&self, paths: &[String], revisions: Arc<Revisions>) -> Vec<FileMergeEntry> {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let merger = Merger::with_limits(self.settings.max_diff_cost);
        let mut tasks = JoinSet::new();

        for (index, path) in paths.iter().cloned().enumerate() {
            let source = Arc::clone(&self.source);
            let semaphore = Arc::clone(&semaphore);
            let revisions = Arc::clone(&revisions);
            let settings = self.settings.clone();
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let failed = FailedFile::new(path, FileFailure::Worker(e.to_string()));
                        return (index, FileMergeEntry::Failed(failed));
                    }
                };
                let entry = merge_path(source.as_ref(), merger, &revisions, path, &settings).await;
                (index, entry)
            });
        }

        let mut slots: Vec<Option<FileMergeEntry>> = vec![None; paths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, entry)) => slots[index] = Some(entry),
                Err(e) => warn!(error = %e, "merge task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| {
                    FileMergeEntry::Failed(FailedFile::new(
                        path.as_str(),
                        FileFailure::Worker("task aborted".into()),
                    ))
                })
            })
            .collect()
    }
}

async fn merge_path(
    source: &dyn RevisionSource,
    merger: Merger,
    revisions: &Revisions,
    path: String,
    settings: &PreviewSettings,
) -> FileMergeEntry {
    match fetch_and_merge(source, merger, revisions, &path, settings).await {
        Ok(data) => FileMergeEntry::Merged(data),
        Err(error) => {
            warn!(path = %path, %error, "file merge failed");
            FileMergeEntry::Failed(FailedFile::new(path, error))
        }
    }
}

async fn fetch_and_merge(
    source: &dyn RevisionSource,
    merger: Merger,
    revisions: &Revisions,
    path: &str,
    settings: &PreviewSettings,
) -> Result<ConflictFileData, FileFailure> {
    let timeout = settings.fetch_timeout;
    let (ancestor, base, head) = tokio::try_join!(
        fetch_with_timeout(source, path, &revisions.ancestor, timeout),
        fetch_with_timeout(source, path, &revisions.base, timeout),
        fetch_with_timeout(source, path, &revisions.head, timeout),
    )?;

    let lines = [&ancestor, &base, &head]
        .into_iter()
        .map(|content| content.as_deref().map_or(0, line_count))
        .max()
        .unwrap_or(0);
    if lines > settings.max_file_lines {
        return Err(FileFailure::TooLarge {
            lines,
            limit: settings.max_file_lines,
        });
    }

    let result = tokio::task::spawn_blocking(move || {
        merger.merge_file(ancestor.as_deref(), base.as_deref(), head.as_deref())
    })
    .await
    .map_err(|e| FileFailure::Worker(e.to_string()))?;

    debug!(path, conflicts = result.conflict_count(), "file merged");
    Ok(ConflictFileData::new(path, result))
}

async fn fetch_with_timeout(
    source: &dyn RevisionSource,
    path: &str,
    rev: &str,
    timeout: Duration,
) -> Result<Option<String>, SourceError> {
    tokio::time::timeout(timeout, source.fetch(path, rev))
        .await
        .map_err(|_| SourceError::Timeout {
            path: path.to_string(),
            rev: rev.to_string(),
            secs: timeout.as_secs(),
        })?
}

fn line_count(content: &str) -> usize {
    content.matches('\n').count() + 1
}

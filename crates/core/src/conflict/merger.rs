//! Three-way merge engine.
//!
//! [`Merger::merge_file`] is the per-file driver: it short-circuits the
//! whole-file cases classified by [`detector::classify`](super::detector::classify)
//! and otherwise runs the line pipeline (diff both sides against the
//! ancestor, align, resolve each region).

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::aligner::ThreeWayAligner;
use super::detector::{classify, MergePath};
use super::differ::LineDiffer;
use super::lines::LineSequence;
use super::resolver::{ConflictResolver, Hunk};

/// The outcome of merging one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// Hunks in ancestor order. Adjacent clean hunks are coalesced.
    pub hunks: Vec<Hunk>,
    /// Whether any hunk is a conflict.
    pub has_conflicts: bool,
}

impl MergeResult {
    fn from_hunks(hunks: Vec<Hunk>) -> Self {
        let has_conflicts = hunks.iter().any(Hunk::is_conflict);
        Self {
            hunks,
            has_conflicts,
        }
    }

    fn deleted() -> Self {
        Self::from_hunks(Vec::new())
    }

    /// One clean hunk carrying a side's content; an absent side carries no
    /// lines.
    fn whole(content: Option<&str>) -> Self {
        Self::from_hunks(vec![Hunk::clean(&LineSequence::from_optional(content))])
    }

    /// True when the merged file no longer exists: there are no conflicts and
    /// no clean hunk carries any line.
    pub fn is_deletion(&self) -> bool {
        self.hunks.iter().all(Hunk::is_empty_clean)
    }

    /// Number of conflict hunks.
    pub fn conflict_count(&self) -> usize {
        self.hunks.iter().filter(|h| h.is_conflict()).count()
    }

    /// The merged text, if the merge is free of conflicts and the file still
    /// exists.
    pub fn resolved_text(&self) -> Option<String> {
        if self.has_conflicts || self.is_deletion() {
            return None;
        }
        Some(self.render(&MarkerLabels::default()))
    }

    /// Render the merge as text, writing git-style conflict markers around
    /// each conflict (diff3 style, including the ancestor section).
    pub fn render(&self, labels: &MarkerLabels) -> String {
        let mut out: Vec<String> = Vec::new();
        for hunk in &self.hunks {
            match hunk {
                Hunk::Clean { resolved_lines } => out.extend(resolved_lines.iter().cloned()),
                Hunk::Conflict {
                    base_lines,
                    head_lines,
                    ancestor_lines,
                } => {
                    out.push(format!("<<<<<<< {}", labels.base));
                    out.extend(base_lines.iter().cloned());
                    out.push(format!("||||||| {}", labels.ancestor));
                    out.extend(ancestor_lines.iter().cloned());
                    out.push("=======".to_string());
                    out.extend(head_lines.iter().cloned());
                    out.push(format!(">>>>>>> {}", labels.head));
                }
            }
        }
        out.join("\n")
    }
}

/// Labels written after conflict markers by [`MergeResult::render`].
#[derive(Debug, Clone)]
pub struct MarkerLabels {
    pub base: String,
    pub ancestor: String,
    pub head: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            base: "base".into(),
            ancestor: "ancestor".into(),
            head: "head".into(),
        }
    }
}

/// Stateless three-way merge engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Merger {
    differ: LineDiffer,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A merger whose differ gives up on spans costlier than `max_diff_cost`.
    pub fn with_limits(max_diff_cost: usize) -> Self {
        Self {
            differ: LineDiffer::new(max_diff_cost),
        }
    }

    /// Merge one file from its three optional versions.
    ///
    /// Total: every combination of present and absent content produces a
    /// result. A conflict is a successful outcome, reported via
    /// [`MergeResult::has_conflicts`].
    pub fn merge_file(
        &self,
        ancestor: Option<&str>,
        base: Option<&str>,
        head: Option<&str>,
    ) -> MergeResult {
        let path = classify(ancestor, base, head);
        debug!(%path, "merging file");

        match path {
            MergePath::DeletedBoth => MergeResult::deleted(),
            MergePath::HeadOnlyCreate | MergePath::HeadChanged => MergeResult::whole(head),
            MergePath::BaseOnlyCreate | MergePath::BaseChanged | MergePath::Convergent => {
                MergeResult::whole(base)
            }
            MergePath::NoChange => MergeResult::whole(ancestor),
            MergePath::Merging => {
                let ancestor = LineSequence::from_optional(ancestor);
                let base = LineSequence::from_optional(base);
                let head = LineSequence::from_optional(head);
                self.merge_lines(&ancestor, &base, &head)
            }
        }
    }

    /// Run the line pipeline on already-split sequences.
    pub fn merge_lines(
        &self,
        ancestor: &LineSequence<'_>,
        base: &LineSequence<'_>,
        head: &LineSequence<'_>,
    ) -> MergeResult {
        let diff_base = self.differ.diff(ancestor, base);
        let diff_head = self.differ.diff(ancestor, head);
        trace!(
            base_cost = diff_base.cost(),
            head_cost = diff_head.cost(),
            "diffed both sides against ancestor"
        );

        let regions = ThreeWayAligner::align(ancestor, base, head, &diff_base, &diff_head);

        let mut hunks: Vec<Hunk> = Vec::with_capacity(regions.len());
        for region in &regions {
            match ConflictResolver::resolve(region) {
                Hunk::Clean { resolved_lines } if resolved_lines.is_empty() => {}
                Hunk::Clean { resolved_lines } => match hunks.last_mut() {
                    Some(Hunk::Clean {
                        resolved_lines: prev,
                    }) => prev.extend(resolved_lines),
                    _ => hunks.push(Hunk::Clean { resolved_lines }),
                },
                conflict => hunks.push(conflict),
            }
        }

        let result = MergeResult::from_hunks(hunks);
        debug!(
            regions = regions.len(),
            conflicts = result.conflict_count(),
            "line merge complete"
        );
        result
    }
}

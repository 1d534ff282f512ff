//! Three-way alignment.
//!
//! Walks the ancestor->base and ancestor->head edit scripts in lockstep over
//! the ancestor's line space and groups overlapping edits into regions.

use std::ops::Range;

use serde::Serialize;
use tracing::trace;

use super::differ::EditScript;
use super::lines::LineSequence;

/// Which sides touched an aligned region, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    /// Neither side edited these ancestor lines.
    Unchanged,
    /// Only base edited the region.
    BaseOnly,
    /// Only head edited the region.
    HeadOnly,
    /// Both sides edited the region and ended with identical lines.
    BothSame,
    /// Both sides edited the region with different results.
    BothDiff,
}

impl std::fmt::Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::BaseOnly => write!(f, "base_only"),
            Self::HeadOnly => write!(f, "head_only"),
            Self::BothSame => write!(f, "both_same"),
            Self::BothDiff => write!(f, "both_diff"),
        }
    }
}

/// A contiguous ancestor range with the matching base and head spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRegion<'a> {
    pub kind: RegionKind,
    pub ancestor: Range<usize>,
    pub base: Range<usize>,
    pub head: Range<usize>,
    pub ancestor_lines: &'a [&'a str],
    pub base_lines: &'a [&'a str],
    pub head_lines: &'a [&'a str],
}

/// One non-equal op of an edit script, reduced to what alignment needs.
#[derive(Debug, Clone)]
struct Change {
    a: Range<usize>,
    b_len: usize,
}

/// Position within one side's list of changes, plus the running offset
/// between ancestor and side line numbers.
struct SideCursor {
    changes: Vec<Change>,
    next: usize,
    delta: isize,
}

impl SideCursor {
    fn new(script: &EditScript) -> Self {
        let changes = script
            .changes()
            .map(|op| Change {
                a: op.a_range(),
                b_len: op.b_len(),
            })
            .collect();
        Self {
            changes,
            next: 0,
            delta: 0,
        }
    }

    fn peek(&self) -> Option<&Change> {
        self.changes.get(self.next)
    }

    fn take_if_overlapping(&mut self, span: &Range<usize>) -> Option<Range<usize>> {
        let change = self.peek().filter(|c| overlaps(span, &c.a))?.clone();
        self.next += 1;
        self.delta += change.b_len as isize - change.a.len() as isize;
        Some(change.a)
    }

    fn map(&self, ancestor_pos: usize) -> usize {
        (ancestor_pos as isize + self.delta) as usize
    }
}

/// Two ancestor ranges overlap when they intersect, or when either is a
/// pure insertion point that touches or lies inside the other.
fn overlaps(x: &Range<usize>, y: &Range<usize>) -> bool {
    if x.is_empty() || y.is_empty() {
        x.start <= y.end && y.start <= x.end
    } else {
        x.start < y.end && y.start < x.end
    }
}

/// Stateless three-way aligner.
pub struct ThreeWayAligner;

impl ThreeWayAligner {
    /// Partition the ancestor into aligned regions.
    ///
    /// `diff_base` must transform `ancestor` into `base` and `diff_head`
    /// must transform `ancestor` into `head`. Overlapping edits from the two
    /// sides are always merged into a single region spanning their union,
    /// transitively.
    pub fn align<'a>(
        ancestor: &'a LineSequence<'a>,
        base: &'a LineSequence<'a>,
        head: &'a LineSequence<'a>,
        diff_base: &EditScript,
        diff_head: &EditScript,
    ) -> Vec<AlignedRegion<'a>> {
        debug_assert_eq!(diff_base.len_a(), ancestor.len());
        debug_assert_eq!(diff_head.len_a(), ancestor.len());
        debug_assert_eq!(diff_base.len_b(), base.len());
        debug_assert_eq!(diff_head.len_b(), head.len());

        let mut bc = SideCursor::new(diff_base);
        let mut hc = SideCursor::new(diff_head);
        let mut regions = Vec::new();
        let mut pos = 0;

        let region = |kind, a: Range<usize>, b: Range<usize>, h: Range<usize>| AlignedRegion {
            kind,
            ancestor_lines: ancestor.slice(a.clone()),
            base_lines: base.slice(b.clone()),
            head_lines: head.slice(h.clone()),
            ancestor: a,
            base: b,
            head: h,
        };

        loop {
            let start = match (bc.peek(), hc.peek()) {
                (None, None) => break,
                (Some(b), None) => b.a.start,
                (None, Some(h)) => h.a.start,
                (Some(b), Some(h)) => b.a.start.min(h.a.start),
            };

            if start > pos {
                regions.push(region(
                    RegionKind::Unchanged,
                    pos..start,
                    bc.map(pos)..bc.map(start),
                    hc.map(pos)..hc.map(start),
                ));
            }

            let base_from = bc.map(start);
            let head_from = hc.map(start);
            let mut span = start..start;
            let mut touched_base = false;
            let mut touched_head = false;
            loop {
                if let Some(a) = bc.take_if_overlapping(&span) {
                    span = span.start.min(a.start)..span.end.max(a.end);
                    touched_base = true;
                    continue;
                }
                if let Some(a) = hc.take_if_overlapping(&span) {
                    span = span.start.min(a.start)..span.end.max(a.end);
                    touched_head = true;
                    continue;
                }
                break;
            }

            let base_range = base_from..bc.map(span.end);
            let head_range = head_from..hc.map(span.end);
            let kind = match (touched_base, touched_head) {
                (true, false) => RegionKind::BaseOnly,
                (false, true) => RegionKind::HeadOnly,
                _ if base.slice(base_range.clone()) == head.slice(head_range.clone()) => {
                    RegionKind::BothSame
                }
                _ => RegionKind::BothDiff,
            };
            trace!(%kind, ancestor = ?span, "aligned region");
            regions.push(region(kind, span.clone(), base_range, head_range));
            pos = span.end;
        }

        if pos < ancestor.len() {
            regions.push(region(
                RegionKind::Unchanged,
                pos..ancestor.len(),
                bc.map(pos)..base.len(),
                hc.map(pos)..head.len(),
            ));
        }

        regions
    }
}

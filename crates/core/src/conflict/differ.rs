//! Line differ.
//!
//! Computes a shortest edit script between two line sequences. The longest
//! common prefix and suffix are matched first; the interior left between them
//! is solved with Myers' greedy O((N+M)·D) forward search, and the script is
//! read back along the furthest-reaching paths so that ambiguous lines are
//! matched at their earliest indices. The search is a plain loop, never
//! recursive.

use std::ops::Range;

use tracing::{debug, trace};

/// Default upper bound on the edit cost searched for the interior of a diff.
pub const DEFAULT_MAX_DIFF_COST: usize = 4096;

/// One step of an edit script. Ranges are half-open line indices; `a` is the
/// source sequence and `b` the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOp {
    /// `a[a]` and `b[b]` are identical.
    Equal { a: Range<usize>, b: Range<usize> },
    /// `b[b]` is inserted before `a[at]`.
    Insert { at: usize, b: Range<usize> },
    /// `a[a]` is removed.
    Delete { a: Range<usize> },
    /// `a[a]` is replaced by `b[b]`.
    Replace { a: Range<usize>, b: Range<usize> },
}

impl EditOp {
    /// The source-side span of this op (empty for insertions).
    pub fn a_range(&self) -> Range<usize> {
        match self {
            EditOp::Equal { a, .. } | EditOp::Delete { a } | EditOp::Replace { a, .. } => {
                a.clone()
            }
            EditOp::Insert { at, .. } => *at..*at,
        }
    }

    /// Number of target lines this op produces.
    pub fn b_len(&self) -> usize {
        match self {
            EditOp::Equal { b, .. } | EditOp::Insert { b, .. } | EditOp::Replace { b, .. } => {
                b.len()
            }
            EditOp::Delete { .. } => 0,
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, EditOp::Equal { .. })
    }
}

/// An ordered list of [`EditOp`]s whose source spans tile `0..len_a` and
/// whose target spans tile `0..len_b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScript {
    ops: Vec<EditOp>,
    len_a: usize,
    len_b: usize,
}

impl EditScript {
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    pub fn len_a(&self) -> usize {
        self.len_a
    }

    pub fn len_b(&self) -> usize {
        self.len_b
    }

    /// True when the script contains no change.
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(EditOp::is_equal)
    }

    /// Iterate over the non-`Equal` ops.
    pub fn changes(&self) -> impl Iterator<Item = &EditOp> {
        self.ops.iter().filter(|op| !op.is_equal())
    }

    /// Total number of inserted plus deleted lines.
    pub fn cost(&self) -> usize {
        self.changes()
            .map(|op| op.a_range().len() + op.b_len())
            .sum()
    }
}

/// A run of matching lines: `a[a..a + len] == b[b..b + len]`.
#[derive(Debug, Clone, Copy)]
struct Run {
    a: usize,
    b: usize,
    len: usize,
}

/// Myers differ with a configurable cost cap.
#[derive(Debug, Clone, Copy)]
pub struct LineDiffer {
    max_cost: usize,
}

impl Default for LineDiffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIFF_COST)
    }
}

impl LineDiffer {
    /// Create a differ. When the interior of a diff needs more than
    /// `max_cost` inserted plus deleted lines, it is emitted as a single
    /// `Replace` instead of being searched further.
    pub fn new(max_cost: usize) -> Self {
        Self { max_cost }
    }

    pub fn max_cost(&self) -> usize {
        self.max_cost
    }

    /// Compute the edit script turning `a` into `b`.
    pub fn diff(&self, a: &[&str], b: &[&str]) -> EditScript {
        let prefix = common_prefix_len(a, b);
        let suffix = common_suffix_len(&a[prefix..], &b[prefix..]);
        let ra = prefix..a.len() - suffix;
        let rb = prefix..b.len() - suffix;

        let mut runs: Vec<Run> = Vec::new();
        if prefix > 0 {
            runs.push(Run {
                a: 0,
                b: 0,
                len: prefix,
            });
        }

        if !ra.is_empty() && !rb.is_empty() {
            match greedy_runs(&a[ra.clone()], &b[rb.clone()], self.max_cost) {
                Some(interior) => {
                    trace!(matched_runs = interior.len(), "interior solved");
                    runs.extend(interior.into_iter().map(|run| Run {
                        a: ra.start + run.a,
                        b: rb.start + run.b,
                        len: run.len,
                    }));
                }
                None => {
                    debug!(
                        a_lines = ra.len(),
                        b_lines = rb.len(),
                        max_cost = self.max_cost,
                        "diff cost cap reached, emitting span as a single replace"
                    );
                }
            }
        }

        if suffix > 0 {
            runs.push(Run {
                a: ra.end,
                b: rb.end,
                len: suffix,
            });
        }

        build_script(&runs, a.len(), b.len())
    }
}

/// Diff two sequences with the default cost cap.
pub fn diff(a: &[&str], b: &[&str]) -> EditScript {
    LineDiffer::default().diff(a, b)
}

// ---------------------------------------------------------------------------
// Greedy forward search
// ---------------------------------------------------------------------------

/// Furthest-reaching x per diagonal, indexed by a signed diagonal `k`.
struct V {
    offset: isize,
    v: Vec<isize>,
}

impl V {
    fn new(max_d: usize) -> Self {
        Self {
            offset: max_d as isize,
            v: vec![0; 2 * max_d + 1],
        }
    }
}

impl std::ops::Index<isize> for V {
    type Output = isize;

    fn index(&self, k: isize) -> &isize {
        &self.v[(k + self.offset) as usize]
    }
}

impl std::ops::IndexMut<isize> for V {
    fn index_mut(&mut self, k: isize) -> &mut isize {
        &mut self.v[(k + self.offset) as usize]
    }
}

/// Snapshots of `V` after each cost level `d`, holding diagonals
/// `-d, -d + 2, ..., d`.
struct Trace {
    levels: Vec<Vec<isize>>,
}

impl Trace {
    fn get(&self, d: isize, k: isize) -> isize {
        self.levels[d as usize][((k + d) / 2) as usize]
    }

    /// Whether the furthest point on diagonal `k` at level `d` was reached by
    /// a downward step (an insertion) from diagonal `k + 1`.
    fn came_down(&self, d: isize, k: isize) -> bool {
        k == -d || (k != d && self.get(d - 1, k - 1) < self.get(d - 1, k + 1))
    }
}

/// Matching runs of a shortest path through `a` x `b`, in order. Returns
/// `None` when the path costs more than `max_cost`.
fn greedy_runs(a: &[&str], b: &[&str], max_cost: usize) -> Option<Vec<Run>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let d_limit = (a.len() + b.len()).min(max_cost) as isize;

    let mut v = V::new(d_limit as usize + 1);
    let mut trace = Trace { levels: Vec::new() };

    for d in 0..=d_limit {
        for k in (-d..=d).step_by(2) {
            let mut x = if k == -d || (k != d && v[k - 1] < v[k + 1]) {
                v[k + 1]
            } else {
                v[k - 1] + 1
            };
            while x < n && x - k < m && a[x as usize] == b[(x - k) as usize] {
                x += 1;
            }
            v[k] = x;
            if x >= n && x - k >= m {
                return Some(backtrack(&trace, d, n, m));
            }
        }
        trace
            .levels
            .push((-d..=d).step_by(2).map(|k| v[k]).collect());
    }

    None
}

/// Walk back from `(n, m)` at cost `cost` through the furthest-reaching
/// points of each level, collecting the diagonal runs.
fn backtrack(trace: &Trace, cost: isize, n: isize, m: isize) -> Vec<Run> {
    let mut runs = Vec::new();
    let (mut x, mut y) = (n, m);

    for d in (1..=cost).rev() {
        let k = x - y;
        let (prev_k, start_x, start_y) = if trace.came_down(d, k) {
            let px = trace.get(d - 1, k + 1);
            (k + 1, px, px - (k + 1) + 1)
        } else {
            let px = trace.get(d - 1, k - 1);
            (k - 1, px + 1, px - (k - 1))
        };
        if x > start_x {
            runs.push(Run {
                a: start_x as usize,
                b: start_y as usize,
                len: (x - start_x) as usize,
            });
        }
        x = trace.get(d - 1, prev_k);
        y = x - prev_k;
    }

    if x > 0 {
        runs.push(Run {
            a: 0,
            b: 0,
            len: x as usize,
        });
    }

    runs.reverse();
    runs
}

fn common_prefix_len(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix_len(a: &[&str], b: &[&str]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

// ---------------------------------------------------------------------------
// Script assembly
// ---------------------------------------------------------------------------

fn build_script(runs: &[Run], len_a: usize, len_b: usize) -> EditScript {
    let mut ops: Vec<EditOp> = Vec::new();
    let (mut x, mut y) = (0, 0);
    let sentinel = Run {
        a: len_a,
        b: len_b,
        len: 0,
    };

    for run in runs.iter().chain(std::iter::once(&sentinel)) {
        push_change(&mut ops, x..run.a, y..run.b);
        if run.len > 0 {
            match ops.last_mut() {
                Some(EditOp::Equal { a, b }) if a.end == run.a && b.end == run.b => {
                    a.end += run.len;
                    b.end += run.len;
                }
                _ => ops.push(EditOp::Equal {
                    a: run.a..run.a + run.len,
                    b: run.b..run.b + run.len,
                }),
            }
        }
        x = run.a + run.len;
        y = run.b + run.len;
    }

    EditScript { ops, len_a, len_b }
}

fn push_change(ops: &mut Vec<EditOp>, a: Range<usize>, b: Range<usize>) {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => {}
        (true, false) => ops.push(EditOp::Insert { at: a.start, b }),
        (false, true) => ops.push(EditOp::Delete { a }),
        (false, false) => ops.push(EditOp::Replace { a, b }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(s: &str) -> Vec<&str> {
        if s.is_empty() {
            Vec::new()
        } else {
            s.split(' ').collect()
        }
    }

    /// Check the tiling invariants and that applying the script to `a`
    /// yields `b`.
    fn check_script(a: &[&str], b: &[&str], script: &EditScript) {
        let mut next_a = 0;
        let mut next_b = 0;
        let mut rebuilt: Vec<&str> = Vec::new();
        let mut prev_equal = false;
        let mut prev_change = false;
        for op in script.ops() {
            let ra = op.a_range();
            assert_eq!(ra.start, next_a, "source gap or overlap at {:?}", op);
            next_a = ra.end;
            match op {
                EditOp::Equal { a: ea, b: eb } => {
                    assert!(!prev_equal, "adjacent equal ops");
                    assert_eq!(eb.start, next_b);
                    assert_eq!(&a[ea.clone()], &b[eb.clone()]);
                    rebuilt.extend_from_slice(&a[ea.clone()]);
                    next_b = eb.end;
                    prev_equal = true;
                    prev_change = false;
                }
                EditOp::Insert { b: ib, .. } | EditOp::Replace { b: ib, .. } => {
                    assert!(!prev_change, "adjacent change ops");
                    assert_eq!(ib.start, next_b);
                    rebuilt.extend_from_slice(&b[ib.clone()]);
                    next_b = ib.end;
                    prev_equal = false;
                    prev_change = true;
                }
                EditOp::Delete { .. } => {
                    assert!(!prev_change, "adjacent change ops");
                    prev_equal = false;
                    prev_change = true;
                }
            }
        }
        assert_eq!(next_a, a.len());
        assert_eq!(next_b, b.len());
        assert_eq!(rebuilt, b);
    }

    fn lcs_len(a: &[&str], b: &[&str]) -> usize {
        let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for i in (0..a.len()).rev() {
            for j in (0..b.len()).rev() {
                table[i][j] = if a[i] == b[j] {
                    table[i + 1][j + 1] + 1
                } else {
                    table[i + 1][j].max(table[i][j + 1])
                };
            }
        }
        table[0][0]
    }

    #[test]
    fn test_equal_sequences_single_equal() {
        let a = lines("a b c");
        let script = diff(&a, &a);
        assert_eq!(script.ops(), &[EditOp::Equal { a: 0..3, b: 0..3 }]);
        assert!(script.is_identity());
    }

    #[test]
    fn test_both_empty() {
        let script = diff(&[], &[]);
        assert!(script.ops().is_empty());
        assert!(script.is_identity());
    }

    #[test]
    fn test_disjoint_single_replace() {
        let a = lines("a b c");
        let b = lines("x y");
        let script = diff(&a, &b);
        assert_eq!(script.ops(), &[EditOp::Replace { a: 0..3, b: 0..2 }]);
    }

    #[test]
    fn test_empty_to_content_is_insert() {
        let b = lines("x y");
        let script = diff(&[], &b);
        assert_eq!(script.ops(), &[EditOp::Insert { at: 0, b: 0..2 }]);
        let script = diff(&b, &[]);
        assert_eq!(script.ops(), &[EditOp::Delete { a: 0..2 }]);
    }

    #[test]
    fn test_append_and_middle_replace() {
        let a = lines("a b c");
        let script = diff(&a, &lines("a b c d"));
        assert_eq!(
            script.ops(),
            &[
                EditOp::Equal { a: 0..3, b: 0..3 },
                EditOp::Insert { at: 3, b: 3..4 },
            ]
        );

        let script = diff(&a, &lines("a X c"));
        assert_eq!(
            script.ops(),
            &[
                EditOp::Equal { a: 0..1, b: 0..1 },
                EditOp::Replace { a: 1..2, b: 1..2 },
                EditOp::Equal { a: 2..3, b: 2..3 },
            ]
        );
    }

    #[test]
    fn test_scripts_are_valid_and_minimal() {
        let cases = [
            ("a b c a b b a", "c b a b a c"),
            ("a b c d e f", "a c e f g"),
            ("x a b x", "a x b x a"),
            ("a a a b", "b a a a"),
            ("p", "q r s"),
            ("one two three four", "zero one three four five"),
        ];
        for (sa, sb) in cases {
            let a = lines(sa);
            let b = lines(sb);
            let script = diff(&a, &b);
            check_script(&a, &b, &script);
            let expected_cost = a.len() + b.len() - 2 * lcs_len(&a, &b);
            assert_eq!(script.cost(), expected_cost, "not minimal for {sa:?} -> {sb:?}");
        }
    }

    #[test]
    fn test_pseudo_random_inputs_are_minimal() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };
        let alphabet = ["a", "b", "c", "d"];
        for _ in 0..200 {
            let la = (next() % 12) as usize;
            let lb = (next() % 12) as usize;
            let a: Vec<&str> = (0..la).map(|_| alphabet[(next() % 4) as usize]).collect();
            let b: Vec<&str> = (0..lb).map(|_| alphabet[(next() % 4) as usize]).collect();
            let script = diff(&a, &b);
            check_script(&a, &b, &script);
            assert_eq!(script.cost(), a.len() + b.len() - 2 * lcs_len(&a, &b));
        }
    }

    #[test]
    fn test_prefix_and_suffix_are_preferred() {
        // "a" could match either copy; the common prefix wins.
        let a = lines("a");
        let b = lines("a x a");
        let script = diff(&a, &b);
        assert_eq!(
            script.ops(),
            &[
                EditOp::Equal { a: 0..1, b: 0..1 },
                EditOp::Insert { at: 1, b: 1..3 },
            ]
        );
    }

    #[test]
    fn test_interior_matches_earliest_occurrence() {
        // "a" pairs with b[0], not b[2], even though both scripts cost 4.
        let a = lines("p a q");
        let b = lines("a r a");
        let script = diff(&a, &b);
        assert_eq!(
            script.ops(),
            &[
                EditOp::Delete { a: 0..1 },
                EditOp::Equal { a: 1..2, b: 0..1 },
                EditOp::Replace { a: 2..3, b: 1..3 },
            ]
        );

        // Either copy of "a" could pair with b[1]; the first one does.
        let a = lines("p a a q");
        let b = lines("r a s");
        let script = diff(&a, &b);
        assert_eq!(
            script.ops(),
            &[
                EditOp::Replace { a: 0..1, b: 0..1 },
                EditOp::Equal { a: 1..2, b: 1..2 },
                EditOp::Replace { a: 2..4, b: 2..3 },
            ]
        );
    }

    #[test]
    fn test_same_inputs_give_same_script() {
        let a = lines("x y x y z x");
        let b = lines("y x z y x y");
        assert_eq!(diff(&a, &b), diff(&a, &b));
    }

    #[test]
    fn test_cost_cap_falls_back_to_replace() {
        let a = lines("a b c d e");
        let b = lines("a x c y e");
        let script = LineDiffer::new(0).diff(&a, &b);
        check_script(&a, &b, &script);
        assert_eq!(
            script.ops(),
            &[
                EditOp::Equal { a: 0..1, b: 0..1 },
                EditOp::Replace { a: 1..4, b: 1..4 },
                EditOp::Equal { a: 4..5, b: 4..5 },
            ]
        );
    }

    #[test]
    fn test_large_input_does_not_recurse() {
        let owned_a: Vec<String> = (0..20_000).map(|i| format!("line {i}")).collect();
        let owned_b: Vec<String> = (0..20_000)
            .map(|i| {
                if i % 97 == 0 {
                    format!("changed {i}")
                } else {
                    format!("line {i}")
                }
            })
            .collect();
        let a: Vec<&str> = owned_a.iter().map(String::as_str).collect();
        let b: Vec<&str> = owned_b.iter().map(String::as_str).collect();
        let script = diff(&a, &b);
        check_script(&a, &b, &script);
        assert_eq!(script.changes().count(), 20_000 / 97 + 1);
    }
}

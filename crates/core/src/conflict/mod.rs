//! Three-way line merging.
//!
//! The pipeline for a single file is:
//! 1. **Detection** -- classify the three optional versions into a
//!    [`MergePath`]; most files never reach the line merge.
//! 2. **Diffing** -- compute a minimal line edit script from the ancestor to
//!    each side with [`LineDiffer`].
//! 3. **Alignment** -- walk both scripts over the ancestor and split it into
//!    [`AlignedRegion`]s.
//! 4. **Resolution** -- turn each region into a clean or conflict [`Hunk`].

pub mod aligner;
pub mod detector;
pub mod differ;
pub mod lines;
pub mod merger;
pub mod resolver;

pub use aligner::{AlignedRegion, RegionKind, ThreeWayAligner};
pub use detector::{classify, MergePath};
pub use differ::{diff, EditOp, EditScript, LineDiffer, DEFAULT_MAX_DIFF_COST};
pub use lines::LineSequence;
pub use merger::{MarkerLabels, MergeResult, Merger};
pub use resolver::{ConflictResolver, Hunk};

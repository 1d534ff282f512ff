//! REST API endpoint modules.

pub mod merge_conflicts;
pub mod status;

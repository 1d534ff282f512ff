//! Human-readable rendering of merge previews.

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use mergelens_core::conflict::Hunk;
use mergelens_core::{FileMergeEntry, MergePreview};

/// One row per file: path, outcome, hunk count, conflict count.
pub fn preview_table(preview: &MergePreview) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "Result", "Hunks", "Conflicts"]);

    for entry in &preview.files {
        match entry {
            FileMergeEntry::Merged(data) => {
                let conflicts = conflict_hunks(&data.hunks);
                let outcome = if data.has_conflicts {
                    Cell::new("✗ conflict").fg(Color::Red)
                } else if data.is_deletion() {
                    Cell::new("deleted").fg(Color::DarkGrey)
                } else {
                    Cell::new("✓ clean").fg(Color::Green)
                };
                table.add_row(vec![
                    Cell::new(&data.path),
                    outcome,
                    Cell::new(data.hunks.len()),
                    Cell::new(conflicts),
                ]);
            }
            FileMergeEntry::Failed(failed) => {
                table.add_row(vec![
                    Cell::new(&failed.path),
                    Cell::new(format!("⚠ {}", failed.error)).fg(Color::Yellow),
                    Cell::new("—"),
                    Cell::new("—"),
                ]);
            }
        }
    }

    table
}

/// A one-line summary of the preview, e.g. `3 files: 2 clean, 1 conflicted`.
pub fn summary(preview: &MergePreview) -> String {
    let total = preview.files.len();
    let conflicted = preview.conflicted_count();
    let failed = preview.failed_count();
    let clean = total - conflicted - failed;

    let mut line = format!(
        "{} file{}: {} clean, {} conflicted",
        total,
        if total == 1 { "" } else { "s" },
        clean,
        conflicted
    );
    if failed > 0 {
        line.push_str(&format!(", {} failed", failed));
    }
    if preview.truncated {
        line.push_str(" (file list truncated)");
    }
    line
}

/// Count conflict hunks in a list of hunks.
pub fn conflict_hunks(hunks: &[Hunk]) -> usize {
    hunks.iter().filter(|h| h.is_conflict()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mergelens_core::{ConflictFileData, FailedFile, Merger};

    fn sample() -> MergePreview {
        let merger = Merger::new();
        MergePreview {
            merge_base_sha: "abc".into(),
            base_branch: "main".into(),
            head_branch: "feature".into(),
            files: vec![
                FileMergeEntry::Merged(ConflictFileData::new(
                    "clean.rs",
                    merger.merge_file(Some("a"), Some("b"), Some("a")),
                )),
                FileMergeEntry::Merged(ConflictFileData::new(
                    "conflict.rs",
                    merger.merge_file(Some("a"), Some("b"), Some("c")),
                )),
                FileMergeEntry::Failed(FailedFile::new("huge.txt", "file too large to merge")),
            ],
            truncated: true,
        }
    }

    #[test]
    fn test_table_lists_every_file() {
        let rendered = preview_table(&sample()).to_string();
        assert!(rendered.contains("clean.rs"));
        assert!(rendered.contains("conflict.rs"));
        assert!(rendered.contains("huge.txt"));
        assert!(rendered.contains("file too large"));
    }

    #[test]
    fn test_one_sided_delete_is_labelled_deleted() {
        let result = Merger::new().merge_file(Some("x"), Some("x"), None);
        let preview = MergePreview {
            merge_base_sha: "abc".into(),
            base_branch: "main".into(),
            head_branch: "feature".into(),
            files: vec![FileMergeEntry::Merged(ConflictFileData::new("gone.rs", result))],
            truncated: false,
        };
        let rendered = preview_table(&preview).to_string();
        assert!(rendered.contains("deleted"));
        assert_eq!(summary(&preview), "1 file: 1 clean, 0 conflicted");
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            summary(&sample()),
            "3 files: 1 clean, 1 conflicted, 1 failed (file list truncated)"
        );
    }

    #[test]
    fn test_conflict_hunks() {
        let result = Merger::new().merge_file(Some("a\nb\nc"), Some("a\nX\nc"), Some("a\nY\nc"));
        assert_eq!(conflict_hunks(&result.hunks), 1);
    }
}

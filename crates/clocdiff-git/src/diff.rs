use std::path::Path;

use clocdiff_process::{AuditLog, CommandRunner, CommandSpec};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GitError, ResolvedRefs};

/// Kind of change git reports for a single file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// The diff had fewer than two lines, nothing to classify
    #[default]
    Unknown,
    Modified,
    Deleted,
    Added,
    Copied,
    Renamed,
}

impl FileStatus {
    /// Classify a `git diff` output by its second line (the extended header)
    pub fn from_diff(diff_text: &str) -> Self {
        let Some(second_line) = diff_text.split('\n').nth(1) else {
            return FileStatus::Unknown;
        };

        if second_line.starts_with("deleted file mode") {
            FileStatus::Deleted
        } else if second_line.starts_with("new file mode") {
            FileStatus::Added
        } else if second_line.starts_with("copy ") {
            FileStatus::Copied
        } else if second_line.starts_with("rename ") {
            FileStatus::Renamed
        } else {
            FileStatus::Modified
        }
    }

    pub fn is_known(&self) -> bool {
        *self != FileStatus::Unknown
    }

    pub fn deleted(&self) -> Option<bool> {
        self.flag(FileStatus::Deleted)
    }

    pub fn added(&self) -> Option<bool> {
        self.flag(FileStatus::Added)
    }

    pub fn copied(&self) -> Option<bool> {
        self.flag(FileStatus::Copied)
    }

    pub fn renamed(&self) -> Option<bool> {
        self.flag(FileStatus::Renamed)
    }

    /// Label used when describing the change in prose
    pub fn change_type(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Deleted => "removed",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::Modified | FileStatus::Unknown => "changed",
        }
    }

    // None while unknown, so reports can tell "not classified" from "false"
    fn flag(&self, kind: FileStatus) -> Option<bool> {
        self.is_known().then_some(*self == kind)
    }
}

/// Textual diff of one file between two refs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub text: String,
    pub status: FileStatus,
}

impl FileDiff {
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

/// Run `git diff <to> <from> -- <file>` in `project_dir` and classify the result
pub async fn file_diff(
    runner: &dyn CommandRunner,
    project_dir: &Path,
    refs: &ResolvedRefs,
    file: &str,
    audit: &AuditLog,
) -> Result<FileDiff, GitError> {
    let command = CommandSpec::new("git")
        .args(["diff", refs.to.as_str(), refs.from.as_str(), "--", file])
        .current_dir(project_dir);

    audit.record_command(&command);
    let text = runner.run(&command).await?;
    let status = FileStatus::from_diff(&text);

    debug!(file, status = ?status, diff_len = text.len(), "Computed file diff");

    Ok(FileDiff { text, status })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_second_line() {
        let cases = [
            (
                "diff --git a/x b/x\ndeleted file mode 100644\nindex 1..0",
                FileStatus::Deleted,
            ),
            (
                "diff --git a/x b/x\nnew file mode 100644\nindex 0..1",
                FileStatus::Added,
            ),
            (
                "diff --git a/x b/y\ncopy from x\ncopy to y",
                FileStatus::Copied,
            ),
            (
                "diff --git a/x b/y\nrename from x\nrename to y",
                FileStatus::Renamed,
            ),
            (
                "diff --git a/x b/x\nindex 1234..5678 100644\n--- a/x",
                FileStatus::Modified,
            ),
        ];

        for (diff, expected) in cases {
            assert_eq!(FileStatus::from_diff(diff), expected, "diff {:?}", diff);
        }
    }

    #[test]
    fn test_short_output_is_unknown() {
        assert_eq!(FileStatus::from_diff(""), FileStatus::Unknown);
        assert_eq!(
            FileStatus::from_diff("diff --git a/x b/x"),
            FileStatus::Unknown
        );
    }

    #[test]
    fn test_only_second_line_is_inspected() {
        let diff = "diff --git a/x b/x\nindex 1..2\nnew file mode 100644";
        assert_eq!(FileStatus::from_diff(diff), FileStatus::Modified);
    }

    #[test]
    fn test_flags_have_at_most_one_true() {
        let status = FileStatus::Renamed;
        assert_eq!(status.renamed(), Some(true));
        assert_eq!(status.deleted(), Some(false));
        assert_eq!(status.added(), Some(false));
        assert_eq!(status.copied(), Some(false));

        let modified = FileStatus::Modified;
        assert_eq!(modified.deleted(), Some(false));
        assert_eq!(modified.renamed(), Some(false));

        let unknown = FileStatus::Unknown;
        assert_eq!(unknown.deleted(), None);
        assert_eq!(unknown.added(), None);
    }

    #[test]
    fn test_change_type_labels() {
        assert_eq!(FileStatus::Added.change_type(), "added");
        assert_eq!(FileStatus::Deleted.change_type(), "removed");
        assert_eq!(FileStatus::Renamed.change_type(), "renamed");
        assert_eq!(FileStatus::Modified.change_type(), "changed");
        assert_eq!(FileStatus::Unknown.change_type(), "changed");
    }
}

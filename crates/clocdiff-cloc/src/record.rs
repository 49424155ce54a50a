use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// same / modified / added / removed counters for one kind of line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub same: u64,
    pub modified: u64,
    pub added: u64,
    pub removed: u64,
}

/// One changed file as reported by cloc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStatRecord {
    /// Path relative to the project directory
    pub file: String,
    pub blank: LineCounts,
    pub comment: LineCounts,
    pub code: LineCounts,
    pub project_dir: PathBuf,
    pub full_file_path: PathBuf,
    /// Extension including the leading dot, empty when the file has none
    pub extension: String,
}

impl DiffStatRecord {
    pub(crate) fn from_row(row: ClocRow, project_dir: &Path) -> Self {
        let full_file_path = project_dir.join(&row.file);
        let extension = full_file_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        Self {
            file: row.file,
            blank: LineCounts {
                same: row.blank_same,
                modified: row.blank_modified,
                added: row.blank_added,
                removed: row.blank_removed,
            },
            comment: LineCounts {
                same: row.comment_same,
                modified: row.comment_modified,
                added: row.comment_added,
                removed: row.comment_removed,
            },
            code: LineCounts {
                same: row.code_same,
                modified: row.code_modified,
                added: row.code_added,
                removed: row.code_removed,
            },
            project_dir: project_dir.to_path_buf(),
            full_file_path,
            extension,
        }
    }
}

/// A CSV row, keyed by the canonical header
#[derive(Debug, Deserialize)]
pub(crate) struct ClocRow {
    #[serde(rename = "File")]
    pub file: String,
    pub blank_same: u64,
    pub blank_modified: u64,
    pub blank_added: u64,
    pub blank_removed: u64,
    pub comment_same: u64,
    pub comment_modified: u64,
    pub comment_added: u64,
    pub comment_removed: u64,
    pub code_same: u64,
    pub code_modified: u64,
    pub code_added: u64,
    pub code_removed: u64,
}

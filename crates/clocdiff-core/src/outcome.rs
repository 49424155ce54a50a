use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::AnnotatedDiff;

/// The final outcome of one comparison
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Every file was annotated (possibly with fallbacks) and summarized
    Completed {
        files: usize,
        failed_annotations: usize,
        summary: String,
        diffs: Vec<AnnotatedDiff>,
        total_duration_secs: f64,
    },
    /// The project directory does not exist; nothing ran
    ProjectMissing {
        project_dir: PathBuf,
        total_duration_secs: f64,
    },
    /// User requested stop (e.g., Ctrl+C)
    Interrupted {
        files_annotated: usize,
        diffs: Vec<AnnotatedDiff>,
        total_duration_secs: f64,
    },
}

impl ComparisonOutcome {
    pub fn completed(diffs: Vec<AnnotatedDiff>, summary: String, duration: Duration) -> Self {
        Self::Completed {
            files: diffs.len(),
            failed_annotations: diffs.iter().filter(|d| d.is_fallback()).count(),
            summary,
            diffs,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn project_missing(project_dir: PathBuf, duration: Duration) -> Self {
        Self::ProjectMissing {
            project_dir,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn interrupted(diffs: Vec<AnnotatedDiff>, duration: Duration) -> Self {
        Self::Interrupted {
            files_annotated: diffs.len(),
            diffs,
            total_duration_secs: duration.as_secs_f64(),
        }
    }

    /// Annotated files in cloc order
    pub fn diffs(&self) -> &[AnnotatedDiff] {
        match self {
            Self::Completed { diffs, .. } | Self::Interrupted { diffs, .. } => diffs,
            Self::ProjectMissing { .. } => &[],
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            Self::Completed { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } | Self::ProjectMissing { .. } => 0,
            Self::Interrupted { .. } => 130,
        }
    }
}

use clocdiff_cloc::DiffStatRecord;
use clocdiff_git::FileStatus;
use serde::{Deserialize, Serialize};

/// A changed file with its diff and current content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedDiff {
    /// Position in cloc's output, 0-based
    pub seq: usize,
    pub stat: DiffStatRecord,
    pub status: FileStatus,
    pub diff_text: String,
    /// Current content, or [`crate::FILE_NOT_FOUND`]
    pub file_content: String,
}

/// Where an explanation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationOrigin {
    /// Answer of the text-generation service
    Service,
    /// Fixed text; no template for this kind of change
    Placeholder,
    /// Fixed text; the service call failed
    Fallback,
}

/// A changed file with its explanation; diff text and content are dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedDiff {
    pub seq: usize,
    #[serde(flatten)]
    pub stat: DiffStatRecord,
    pub status: FileStatus,
    pub explanation: String,
    pub origin: ExplanationOrigin,
}

impl AnnotatedDiff {
    pub fn new(enriched: EnrichedDiff, explanation: String, origin: ExplanationOrigin) -> Self {
        Self {
            seq: enriched.seq,
            stat: enriched.stat,
            status: enriched.status,
            explanation,
            origin,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == ExplanationOrigin::Fallback
    }
}

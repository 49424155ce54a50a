//! # clocdiff-core
//!
//! Orchestrates one comparison between two refs of a project:
//!
//! 1. bootstrap the checkout (fetch refs, register the `base` remote)
//! 2. extract per-file line statistics with cloc
//! 3. enrich each file with its diff, change kind and current content, one file at a
//!    time
//! 4. annotate the files through the text-generation service, a bounded number at a
//!    time
//! 5. summarize all annotations in one more call
//!
//! Steps 1 to 3 hold the project directory's [`clocdiff_git::WorkTreeGuard`]; no
//! other comparison issues git commands in that directory meanwhile.

mod annotate;
mod enrich;
mod error;
mod outcome;
mod record;
mod request;
mod runner;
mod summary;

pub use annotate::{
    placeholder_explanation, select_template, AnnotationSettings, AnnotationStage,
    DEFAULT_CONCURRENCY, DEFAULT_MODEL, DEFAULT_TIMEOUT, EXPLAIN_FALLBACK,
};
pub use enrich::{FileEnricher, FILE_NOT_FOUND};
pub use error::PipelineError;
pub use outcome::ComparisonOutcome;
pub use record::{AnnotatedDiff, EnrichedDiff, ExplanationOrigin};
pub use request::ComparisonRequest;
pub use runner::ComparisonRunner;
pub use summary::{summary_blocks, SUMMARY_FALLBACK};

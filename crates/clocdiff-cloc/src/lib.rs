//! # clocdiff-cloc
//!
//! Line-level diff statistics between two refs, produced by
//! `cloc --git-diff-rel --csv --by-file`.
//!
//! cloc's CSV output is normalised before parsing: blank lines and cloc's own
//! header (which embeds the cloc version and timing) are dropped, a trailing field
//! separator is stripped, and rows are read against a fixed header. Rows are passed
//! through untouched otherwise, including the duplicated entries cloc sometimes
//! reports for renamed files.

mod extract;
mod record;

pub use extract::{ClocError, ClocNormalizer, DiffStatExtractor, CANONICAL_HEADER};
pub use record::{DiffStatRecord, LineCounts};

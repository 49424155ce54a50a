use std::path::PathBuf;

use clocdiff_cloc::ClocError;
use clocdiff_git::GitError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Diff statistics error: {0}")]
    Cloc(#[from] ClocError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Comparison was interrupted")]
    Interrupted,
}

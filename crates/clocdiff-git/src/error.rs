use std::path::PathBuf;

use clocdiff_process::ProcessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Invalid url {0}")]
    InvalidUrl(String),

    #[error("Work tree {0} is already in use by another comparison")]
    WorkTreeBusy(PathBuf),
}

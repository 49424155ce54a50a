use std::path::Path;
use std::sync::LazyLock;

use clocdiff_git::ResolvedRefs;
use clocdiff_process::{AuditLog, CommandRunner, CommandSpec, ProcessError};
use csv::{ReaderBuilder, StringRecord};
use futures::{future, Stream, TryStreamExt};
use thiserror::Error;
use tracing::{debug, trace};

use crate::record::{ClocRow, DiffStatRecord};

/// Header the rows are parsed against, whatever header cloc printed
pub const CANONICAL_HEADER: &str = "File,blank_same,blank_modified,blank_added,blank_removed,comment_same,comment_modified,comment_added,comment_removed,code_same,code_modified,code_added,code_removed";

static HEADER: LazyLock<StringRecord> =
    LazyLock::new(|| StringRecord::from(CANONICAL_HEADER.split(',').collect::<Vec<_>>()));

#[derive(Error, Debug)]
pub enum ClocError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Malformed cloc row {line:?}: {source}")]
    Parse {
        line: String,
        #[source]
        source: csv::Error,
    },

    #[error("Empty cloc row {0:?}")]
    EmptyRow(String),
}

/// Turns raw cloc output lines into data rows
#[derive(Debug, Default)]
pub struct ClocNormalizer {
    header_seen: bool,
}

impl ClocNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line; returns the cleaned data row, if the line is one
    pub fn push(&mut self, raw: &str) -> Option<String> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        // The first non-blank line is cloc's own header
        if !self.header_seen {
            self.header_seen = true;
            trace!(header = line, "Dropping cloc header");
            return None;
        }
        Some(line.strip_suffix(',').unwrap_or(line).to_string())
    }
}

/// Runs cloc between two refs of a project
#[derive(Debug, Clone)]
pub struct DiffStatExtractor {
    program: String,
}

impl Default for DiffStatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffStatExtractor {
    pub fn new() -> Self {
        Self {
            program: "cloc".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command(&self, project_dir: &Path, refs: &ResolvedRefs, languages: &[String]) -> CommandSpec {
        let mut command = CommandSpec::new(&self.program)
            .args([
                "--git-diff-rel",
                "--csv",
                "--by-file",
                refs.from.as_str(),
                refs.to.as_str(),
            ])
            .current_dir(project_dir);

        if !languages.is_empty() {
            command = command.arg(format!("--include-lang={}", languages.join(",")));
        }
        command
    }

    /// Stream one record per changed file; no differences means an empty stream.
    ///
    /// Must not run while other git commands are issued against `project_dir`.
    pub fn extract(
        &self,
        runner: &dyn CommandRunner,
        project_dir: &Path,
        refs: &ResolvedRefs,
        languages: &[String],
        audit: &AuditLog,
    ) -> impl Stream<Item = Result<DiffStatRecord, ClocError>> + Send + 'static {
        let command = self.command(project_dir, refs, languages);
        debug!(command = %command, "Extracting diff statistics");
        audit.record_command(&command);

        let project_dir = project_dir.to_path_buf();
        let mut normalizer = ClocNormalizer::new();

        runner
            .lines(&command)
            .map_err(ClocError::from)
            .try_filter_map(move |raw| {
                let record = normalizer
                    .push(&raw)
                    .map(|row| parse_row(&row, &project_dir))
                    .transpose();
                future::ready(record)
            })
    }
}

fn parse_row(line: &str, project_dir: &Path) -> Result<DiffStatRecord, ClocError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line.as_bytes());

    let record = reader
        .records()
        .next()
        .ok_or_else(|| ClocError::EmptyRow(line.to_string()))?
        .map_err(|source| ClocError::Parse {
            line: line.to_string(),
            source,
        })?;

    let row: ClocRow = record
        .deserialize(Some(&HEADER))
        .map_err(|source| ClocError::Parse {
            line: line.to_string(),
            source,
        })?;

    Ok(DiffStatRecord::from_row(row, project_dir))
}

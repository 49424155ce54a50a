use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::try_stream;
use clocdiff_cloc::{ClocError, DiffStatRecord};
use clocdiff_git::{file_diff, ResolvedRefs};
use clocdiff_logging::{LogEvent, Logger};
use clocdiff_process::{AuditLog, CommandRunner};
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::{EnrichedDiff, PipelineError};

/// Content recorded for a file that no longer exists on disk
pub const FILE_NOT_FOUND: &str = "file not found";

/// Adds diff text, change kind and current content to each cloc record.
///
/// Files are processed strictly one after the other: the next `git diff` is
/// issued only once the previous file's diff and content read are done.
#[derive(Clone, Copy)]
pub struct FileEnricher<'a> {
    runner: &'a dyn CommandRunner,
    refs: &'a ResolvedRefs,
    audit: &'a AuditLog,
    logger: &'a Logger,
    interrupted: &'a AtomicBool,
}

impl<'a> FileEnricher<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        refs: &'a ResolvedRefs,
        audit: &'a AuditLog,
        logger: &'a Logger,
        interrupted: &'a AtomicBool,
    ) -> Self {
        Self {
            runner,
            refs,
            audit,
            logger,
            interrupted,
        }
    }

    /// Enrich records in input order; an interrupt ends the stream with
    /// [`PipelineError::Interrupted`]
    pub fn enrich<S>(self, records: S) -> impl Stream<Item = Result<EnrichedDiff, PipelineError>> + 'a
    where
        S: Stream<Item = Result<DiffStatRecord, ClocError>> + 'a,
    {
        try_stream! {
            let mut records = Box::pin(records);
            let mut seq = 0;

            while let Some(record) = records.next().await {
                if self.interrupted.load(Ordering::SeqCst) {
                    Err::<(), _>(PipelineError::Interrupted)?;
                }
                let enriched = self.enrich_one(seq, record?).await?;
                seq += 1;
                yield enriched;
            }
        }
    }

    async fn enrich_one(&self, seq: usize, stat: DiffStatRecord) -> Result<EnrichedDiff, PipelineError> {
        let diff = file_diff(self.runner, &stat.project_dir, self.refs, &stat.file, self.audit).await?;

        if !diff.status.is_known() {
            self.audit.note(format!(
                "No diff found for file {}",
                stat.full_file_path.display()
            ));
        }

        self.logger.log(&LogEvent::FileDiffComputed {
            seq,
            file: stat.file.clone(),
            change_type: diff.status.change_type().to_string(),
            diff_lines: diff.line_count(),
        });

        let file_content = read_content(&stat.full_file_path).await?;

        Ok(EnrichedDiff {
            seq,
            stat,
            status: diff.status,
            diff_text: diff.text,
            file_content,
        })
    }
}

async fn read_content(path: &Path) -> Result<String, PipelineError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not on disk");
            Ok(FILE_NOT_FOUND.to_string())
        }
        Err(source) => Err(PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_content_missing_file_is_sentinel() {
        let dir = TempDir::new().unwrap();
        let content = read_content(&dir.path().join("gone.rs")).await.unwrap();
        assert_eq!(content, FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_read_content_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        std::fs::write(&path, "fn main() {}\n").unwrap();
        assert_eq!(read_content(&path).await.unwrap(), "fn main() {}\n");
    }

    #[tokio::test]
    async fn test_read_content_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = read_content(dir.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}

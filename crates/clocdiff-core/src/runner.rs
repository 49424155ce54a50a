use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use clocdiff_cloc::{DiffStatExtractor, DiffStatRecord};
use clocdiff_git::{ensure_remote_and_fetch, BootstrapOutcome, WorkTreeGuard, WorkTreeRegistry};
use clocdiff_llm::TextGenerator;
use clocdiff_logging::{LogEvent, Logger};
use clocdiff_process::{AuditLog, CommandRunner};
use futures::{Stream, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::{
    AnnotatedDiff, AnnotationSettings, AnnotationStage, ComparisonOutcome, ComparisonRequest,
    FileEnricher, PipelineError,
};

/// Runs comparisons end to end
pub struct ComparisonRunner {
    runner: Arc<dyn CommandRunner>,
    generator: Arc<dyn TextGenerator>,
    extractor: DiffStatExtractor,
    worktrees: WorkTreeRegistry,
    settings: AnnotationSettings,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

impl ComparisonRunner {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        generator: Arc<dyn TextGenerator>,
        settings: AnnotationSettings,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            runner,
            generator,
            extractor: DiffStatExtractor::new(),
            worktrees: WorkTreeRegistry::new(),
            settings,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share directory locks with other runners
    pub fn with_worktrees(mut self, worktrees: WorkTreeRegistry) -> Self {
        self.worktrees = worktrees;
        self
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run one comparison, recording every issued command in `audit`.
    ///
    /// Waits while another comparison holds the same project directory. A command
    /// failing after an interrupt was requested ends the run as interrupted.
    pub async fn run(
        &self,
        request: &ComparisonRequest,
        audit: &AuditLog,
    ) -> Result<ComparisonOutcome, PipelineError> {
        request.validate()?;
        let started = Instant::now();

        match self.execute(request, audit, started).await {
            Err(e) if self.is_interrupted() => {
                warn!(error = %e, "Command failed after interrupt");
                audit.note(format!("Interrupted: {}", e));
                Ok(self.interrupted_outcome(Vec::new(), started))
            }
            result => result,
        }
    }

    async fn execute(
        &self,
        request: &ComparisonRequest,
        audit: &AuditLog,
        started: Instant,
    ) -> Result<ComparisonOutcome, PipelineError> {
        self.logger.log(&LogEvent::ComparisonStarted {
            project_dir: request.project_dir.clone(),
            from: request.from_ref.clone(),
            to: request.to_ref.clone(),
            remote_url: request.remote.url.clone(),
        });

        let worktree = self.worktrees.lock(&request.project_dir).await;

        let bootstrap_started = Instant::now();
        let bootstrap = ensure_remote_and_fetch(
            self.runner.as_ref(),
            &request.project_dir,
            &request.remote,
            audit,
        )
        .await?;
        if bootstrap == BootstrapOutcome::ProjectMissing {
            self.logger.log(&LogEvent::ProjectMissing {
                project_dir: request.project_dir.clone(),
            });
            return Ok(ComparisonOutcome::project_missing(
                request.project_dir.clone(),
                started.elapsed(),
            ));
        }
        self.logger.log(&LogEvent::BootstrapCompleted {
            project_dir: request.project_dir.clone(),
            duration_secs: bootstrap_started.elapsed().as_secs_f64(),
        });

        if self.is_interrupted() {
            return Ok(self.interrupted_outcome(Vec::new(), started));
        }

        // cloc must exit before the first per-file `git diff` starts
        let refs = request.refs();
        let records: Vec<DiffStatRecord> = self
            .extractor
            .extract(
                self.runner.as_ref(),
                &request.project_dir,
                &refs,
                &request.languages,
                audit,
            )
            .try_collect()
            .await?;
        self.logger.log(&LogEvent::DiffStatsExtracted {
            files: records.len(),
        });
        debug!(files = records.len(), "Diff statistics extracted");

        let enricher = FileEnricher::new(
            self.runner.as_ref(),
            &refs,
            audit,
            &self.logger,
            &self.interrupted,
        );
        let enriched = release_when_done(
            enricher.enrich(futures::stream::iter(records.into_iter().map(Ok))),
            worktree,
        );

        let stage = AnnotationStage::new(
            self.generator.as_ref(),
            &self.settings,
            audit,
            &self.logger,
            &self.interrupted,
        );
        let mut annotations = Box::pin(stage.annotate(enriched));
        let mut annotated: Vec<AnnotatedDiff> = Vec::new();

        while let Some(result) = annotations.next().await {
            match result {
                Ok(diff) => annotated.push(diff),
                Err(e) if matches!(e, PipelineError::Interrupted) || self.is_interrupted() => {
                    debug!(error = %e, "Annotation stream ended by interrupt");
                    // Dropping the stream cancels the calls still in flight
                    drop(annotations);
                    annotated.sort_by_key(|d| d.seq);
                    return Ok(self.interrupted_outcome(annotated, started));
                }
                Err(e) => return Err(e),
            }
        }
        drop(annotations);

        // Completion order is arbitrary; restore cloc's order
        annotated.sort_by_key(|d| d.seq);

        if self.is_interrupted() {
            return Ok(self.interrupted_outcome(annotated, started));
        }

        let summary = stage
            .summarize(&annotated, &request.languages, &request.project_name())
            .await;

        let outcome = ComparisonOutcome::completed(annotated, summary, started.elapsed());
        if let ComparisonOutcome::Completed {
            files,
            failed_annotations,
            total_duration_secs,
            ..
        } = &outcome
        {
            info!(files, failed_annotations, "Comparison completed");
            self.logger.log(&LogEvent::ComparisonCompleted {
                files: *files,
                failed_annotations: *failed_annotations,
                duration_secs: *total_duration_secs,
            });
        }
        Ok(outcome)
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn interrupted_outcome(&self, diffs: Vec<AnnotatedDiff>, started: Instant) -> ComparisonOutcome {
        info!("Comparison interrupted by user");
        self.logger.log(&LogEvent::ComparisonInterrupted {
            files_annotated: diffs.len(),
        });
        ComparisonOutcome::interrupted(diffs, started.elapsed())
    }
}

/// Hold `guard` until `inner` is exhausted or dropped
fn release_when_done<S>(inner: S, guard: WorkTreeGuard) -> impl Stream<Item = S::Item>
where
    S: Stream,
{
    stream! {
        let worktree = guard;
        let mut inner = Box::pin(inner);
        while let Some(item) = inner.next().await {
            yield item;
        }
        debug!(path = %worktree.path().display(), "Releasing work tree");
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clocdiff_git::FileStatus;
use clocdiff_llm::{
    language_from_extension, CompletionRequest, ExplainDiffData, LlmError, PromptTemplate,
    PromptTemplates, TextGenerator,
};
use clocdiff_logging::{LogEvent, Logger};
use clocdiff_process::AuditLog;
use futures::{Stream, TryStreamExt};
use tracing::{debug, warn};

use crate::{AnnotatedDiff, EnrichedDiff, ExplanationOrigin, PipelineError};

/// Explanation recorded when the service call for a file fails
pub const EXPLAIN_FALLBACK: &str = "error in calling LLM to explain diffs";

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How explanations are requested
#[derive(Debug, Clone)]
pub struct AnnotationSettings {
    pub model: String,
    pub temperature: f32,
    /// Maximum service calls in flight
    pub concurrency: usize,
    /// Per call; `None` waits indefinitely
    pub timeout: Option<Duration>,
    pub templates: PromptTemplates,
    pub summary_template: PromptTemplate,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: Some(DEFAULT_TIMEOUT),
            templates: PromptTemplates::builtin(),
            summary_template: PromptTemplates::builtin_summary(),
        }
    }
}

/// Template for a change kind: removed, added, or the general changed-file one
pub fn select_template(templates: &PromptTemplates, status: FileStatus) -> &PromptTemplate {
    match status {
        FileStatus::Deleted => &templates.removed_file,
        FileStatus::Added => &templates.added_file,
        _ => &templates.changed_file,
    }
}

/// Explanation for a file whose template is empty
pub fn placeholder_explanation(status: FileStatus) -> String {
    let kind = match status {
        FileStatus::Copied => "copied",
        FileStatus::Renamed => "renamed",
        _ => "",
    };
    format!(
        "explanations are only for changed, added or removed files - this file is {}",
        kind
    )
}

/// Talks to the text-generation service for a comparison: one call per file and
/// one for the summary
#[derive(Clone, Copy)]
pub struct AnnotationStage<'a> {
    pub(crate) generator: &'a dyn TextGenerator,
    pub(crate) settings: &'a AnnotationSettings,
    pub(crate) audit: &'a AuditLog,
    pub(crate) logger: &'a Logger,
    pub(crate) interrupted: &'a AtomicBool,
}

impl<'a> AnnotationStage<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        settings: &'a AnnotationSettings,
        audit: &'a AuditLog,
        logger: &'a Logger,
        interrupted: &'a AtomicBool,
    ) -> Self {
        Self {
            generator,
            settings,
            audit,
            logger,
            interrupted,
        }
    }

    /// Annotate up to `settings.concurrency` files at once.
    ///
    /// Output is in completion order; `seq` identifies the source record. A failed
    /// call yields [`EXPLAIN_FALLBACK`], only upstream errors and interrupts end
    /// the stream early.
    pub fn annotate<S>(self, enriched: S) -> impl Stream<Item = Result<AnnotatedDiff, PipelineError>> + 'a
    where
        S: Stream<Item = Result<EnrichedDiff, PipelineError>> + 'a,
    {
        let limit = self.settings.concurrency.max(1);
        debug!(limit, "Annotating files");

        enriched
            .map_ok(move |diff| self.annotate_one(diff))
            .try_buffer_unordered(limit)
    }

    async fn annotate_one(self, diff: EnrichedDiff) -> Result<AnnotatedDiff, PipelineError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(PipelineError::Interrupted);
        }

        let template = select_template(&self.settings.templates, diff.status);
        if template.is_empty() {
            let explanation = placeholder_explanation(diff.status);
            self.logger.log(&LogEvent::AnnotationSkipped {
                seq: diff.seq,
                file: diff.stat.file.clone(),
                reason: diff.status.change_type().to_string(),
            });
            return Ok(AnnotatedDiff::new(
                diff,
                explanation,
                ExplanationOrigin::Placeholder,
            ));
        }

        let prompt = ExplainDiffData {
            language: language_from_extension(&diff.stat.extension),
            file_name: &diff.stat.file,
            file_content: &diff.file_content,
            diffs: &diff.diff_text,
        }
        .fill(&template.prompt);
        let request =
            CompletionRequest::new(prompt, &self.settings.model, self.settings.temperature);

        let full_path = diff.stat.full_file_path.display().to_string();
        self.audit
            .record_call(format!("call LLM to explain diffs for file {}", full_path));
        self.logger.log(&LogEvent::AnnotationStarted {
            seq: diff.seq,
            file: diff.stat.file.clone(),
        });

        let started = Instant::now();
        match self.complete(&request).await {
            Ok(explanation) => {
                self.logger.log(&LogEvent::AnnotationCompleted {
                    seq: diff.seq,
                    file: diff.stat.file.clone(),
                    duration_secs: started.elapsed().as_secs_f64(),
                });
                Ok(AnnotatedDiff::new(
                    diff,
                    explanation,
                    ExplanationOrigin::Service,
                ))
            }
            Err(e) => {
                warn!(file = %full_path, error = %e, "Annotation failed");
                self.audit.note(format!(
                    "Error calling LLM to explain diffs for file {} - {}",
                    full_path, e
                ));
                self.logger.log(&LogEvent::AnnotationFailed {
                    seq: diff.seq,
                    file: diff.stat.file.clone(),
                    error: e.to_string(),
                });
                Ok(AnnotatedDiff::new(
                    diff,
                    EXPLAIN_FALLBACK.to_string(),
                    ExplanationOrigin::Fallback,
                ))
            }
        }
    }

    /// One service call, bounded by the configured timeout
    pub(crate) async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        match self.settings.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.complete(request))
                .await
                .map_err(|_| LlmError::Timeout(limit))?,
            None => self.generator.complete(request).await,
        }
    }
}

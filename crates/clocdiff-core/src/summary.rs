use std::time::Instant;

use clocdiff_llm::{CompletionRequest, SummarizeDiffsData};
use clocdiff_logging::LogEvent;
use tracing::{info, warn};

use crate::{AnnotatedDiff, AnnotationStage};

/// Summary recorded when the summary call fails
pub const SUMMARY_FALLBACK: &str = "error in calling LLM to summarize diffs";

const BLOCK_RULE: &str =
    "---------------------------------------------------------------------------------------------";

/// One block per file: path and change kind, explanation, then a rule
pub fn summary_blocks(diffs: &[AnnotatedDiff]) -> String {
    let mut lines = Vec::with_capacity(diffs.len() * 5);
    for diff in diffs {
        lines.push(format!(
            "File path: {} - type of diff: {}",
            diff.stat.file,
            diff.status.change_type()
        ));
        lines.push(diff.explanation.clone());
        lines.push(String::new());
        lines.push(BLOCK_RULE.to_string());
        lines.push(String::new());
    }
    lines.join("\n")
}

impl AnnotationStage<'_> {
    /// Ask for one narrative over all explanations; failures give [`SUMMARY_FALLBACK`].
    ///
    /// Nothing is requested when there are no files.
    pub async fn summarize(&self, diffs: &[AnnotatedDiff], languages: &[String], project: &str) -> String {
        if diffs.is_empty() {
            info!(project, "No differences, skipping summary");
            return String::new();
        }

        let blocks = summary_blocks(diffs);
        let languages = languages.join(", ");
        let prompt = SummarizeDiffsData {
            languages: &languages,
            diffs: &blocks,
        }
        .fill(&self.settings.summary_template.prompt);
        let request =
            CompletionRequest::new(prompt, &self.settings.model, self.settings.temperature);

        self.audit.record_call(format!(
            "call LLM to summarize all diffs for the project {}",
            project
        ));

        let started = Instant::now();
        let (summary, succeeded) = match self.complete(&request).await {
            Ok(summary) => (summary, true),
            Err(e) => {
                warn!(project, error = %e, "Summary failed");
                self.audit.note(format!(
                    "Error calling LLM to summarize all diffs for the project {} - {}",
                    project, e
                ));
                (SUMMARY_FALLBACK.to_string(), false)
            }
        };

        self.logger.log(&LogEvent::SummaryCompleted {
            succeeded,
            duration_secs: started.elapsed().as_secs_f64(),
        });
        summary
    }
}

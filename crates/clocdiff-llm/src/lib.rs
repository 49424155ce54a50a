//! # clocdiff-llm
//!
//! The external text-generation service and the prompts sent to it.
//!
//! ## Key Types
//!
//! - [`TextGenerator`] - submit a prompt, receive text or fail
//! - [`OpenAiClient`] - OpenAI-compatible chat completions over HTTP
//! - [`AgentCliGenerator`] - a locally installed agent CLI (`claude --print`)
//! - [`PromptTemplates`] / [`fill_template`] - `{{placeholder}}` templates for
//!   changed, added and removed files, and for the project summary

mod agent;
mod generator;
mod openai;
mod templates;

use std::sync::Arc;

use clocdiff_process::CommandRunner;

pub use agent::AgentCliGenerator;
pub use generator::{CompletionRequest, LlmError, ProviderType, TextGenerator, NO_EXPLANATION};
pub use openai::{OpenAiClient, DEFAULT_BASE_URL, OPENAI_API_KEY_ENV};
pub use templates::{
    fill_template, language_from_extension, ExplainDiffData, PromptTemplate, PromptTemplates,
    SummarizeDiffsData,
};

/// Create a text generator by provider type.
///
/// The agent CLI is checked with `--version` first, so a missing binary fails the
/// run up front instead of turning every annotation into a fallback.
pub async fn create_generator(
    provider: ProviderType,
    base_url: Option<&str>,
    runner: Arc<dyn CommandRunner>,
) -> Result<Arc<dyn TextGenerator>, LlmError> {
    match provider {
        ProviderType::OpenAi => {
            let mut client = OpenAiClient::from_env()?;
            if let Some(url) = base_url {
                client = client.with_base_url(url);
            }
            Ok(Arc::new(client))
        }
        ProviderType::ClaudeCli => {
            let agent = AgentCliGenerator::new(runner);
            if !agent.is_available().await {
                return Err(LlmError::Unavailable(agent.binary_name()));
            }
            Ok(Arc::new(agent))
        }
    }
}

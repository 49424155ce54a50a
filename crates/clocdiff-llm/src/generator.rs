use std::time::Duration;

use async_trait::async_trait;
use clocdiff_process::ProcessError;
use thiserror::Error;

/// Returned when the service answers without any text
pub const NO_EXPLANATION: &str = "no explanation received";

/// Errors that can occur while calling the text-generation service
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("Agent CLI `{0}` not found or not runnable")]
    Unavailable(String),

    #[error("Agent CLI failed: {0}")]
    Process(#[from] ProcessError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// One prompt submission
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature,
        }
    }
}

/// Supported text-generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    OpenAi,
    ClaudeCli,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::OpenAi => write!(f, "openai"),
            ProviderType::ClaudeCli => write!(f, "claude"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" => Ok(ProviderType::OpenAi),
            "claude" | "claude-code" | "claude-cli" => Ok(ProviderType::ClaudeCli),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// The external text-generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Human-readable name of the provider
    fn name(&self) -> &str;

    /// Submit a prompt and wait for the full answer
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Substitute [`NO_EXPLANATION`] for an empty answer
pub(crate) fn non_empty_answer(text: Option<&str>) -> String {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => NO_EXPLANATION.to_string(),
    }
}

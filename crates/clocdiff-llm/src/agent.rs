use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clocdiff_process::{CommandRunner, CommandSpec};
use tracing::debug;

use crate::generator::non_empty_answer;
use crate::{CompletionRequest, LlmError, TextGenerator};

/// Uses a locally installed agent CLI as the text-generation service
pub struct AgentCliGenerator {
    binary_path: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl AgentCliGenerator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary_path: PathBuf::from("claude"),
            runner,
        }
    }

    pub fn with_binary_path(mut self, path: PathBuf) -> Self {
        self.binary_path = path;
        self
    }

    /// Check if the agent CLI is available on the system
    pub async fn is_available(&self) -> bool {
        let command = CommandSpec::new(self.binary_path.to_string_lossy()).arg("--version");
        self.runner.run(&command).await.is_ok()
    }

    pub(crate) fn binary_name(&self) -> String {
        self.binary_path.display().to_string()
    }

    fn command(&self, request: &CompletionRequest) -> CommandSpec {
        self.command_with_prompt(request, &request.prompt)
    }

    /// The command line as it appears in errors: the prompt carries whole files
    fn display_command(&self, request: &CompletionRequest) -> String {
        let placeholder = format!("<prompt: {} bytes>", request.prompt.len());
        self.command_with_prompt(request, &placeholder).to_string()
    }

    fn command_with_prompt(&self, request: &CompletionRequest, prompt: &str) -> CommandSpec {
        // Non-interactive mode, output only
        let mut command = CommandSpec::new(self.binary_path.to_string_lossy()).arg("--print");

        if !request.model.is_empty() {
            command = command.args(["--model", request.model.as_str()]);
        }

        // -- ends option parsing, so prompts starting with '-' stay positional
        command.args(["--", prompt])
    }
}

#[async_trait]
impl TextGenerator for AgentCliGenerator {
    fn name(&self) -> &str {
        "Claude CLI"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            agent = self.name(),
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Executing agent (temperature is not configurable here)"
        );

        let stdout = self
            .runner
            .run(&self.command(request))
            .await
            .map_err(|e| e.with_command(self.display_command(request)))?;
        Ok(non_empty_answer(Some(&stdout)))
    }
}

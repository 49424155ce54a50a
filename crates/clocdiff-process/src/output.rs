use std::time::Duration;

use crate::{CommandSpec, ProcessError};

/// Output captured from a finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Combined stdout output
    pub stdout: String,
    /// Combined stderr output
    pub stderr: String,
    /// Exit code from the process (-1 when killed by a signal)
    pub exit_code: i32,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn new(stdout: String, stderr: String, exit_code: i32, duration: Duration) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            duration,
        }
    }

    /// Check if the process exited successfully
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Text describing why the process failed: stderr, else stdout, else the exit code
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("process exited with code {}", self.exit_code)
    }

    /// Consume the output, keeping stdout on success
    pub fn into_stdout(self, command: &CommandSpec) -> Result<String, ProcessError> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(ProcessError::Failed {
                command: command.to_string(),
                exit_code: self.exit_code,
                message: self.error_message(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_stderr() {
        let output = ProcessOutput::new(
            "some stdout".into(),
            "fatal: not a git repository\n".into(),
            128,
            Duration::ZERO,
        );
        assert_eq!(output.error_message(), "fatal: not a git repository");
    }

    #[test]
    fn test_error_message_falls_back_to_exit_code() {
        let output = ProcessOutput::new(String::new(), "  ".into(), 3, Duration::ZERO);
        assert_eq!(output.error_message(), "process exited with code 3");
    }

    #[test]
    fn test_into_stdout_on_failure_carries_command() {
        let command = CommandSpec::new("git").arg("fetch");
        let output = ProcessOutput::new(String::new(), "boom".into(), 1, Duration::ZERO);
        let err = output.into_stdout(&command).unwrap_err();
        match err {
            ProcessError::Failed {
                command,
                exit_code,
                message,
            } => {
                assert_eq!(command, "git fetch");
                assert_eq!(exit_code, 1);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

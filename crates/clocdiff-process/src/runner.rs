use std::io;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_stream::wrappers::SplitStream;
use tracing::{debug, trace};

use crate::{CommandSpec, ProcessOutput};

/// Errors that can occur while running an external command
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command `{command}` failed with exit code {exit_code}: {message}")]
    Failed {
        command: String,
        exit_code: i32,
        message: String,
    },

    #[error("Failed to read output of `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

impl ProcessError {
    /// The command line that produced this error
    pub fn command(&self) -> &str {
        match self {
            Self::SpawnFailed { command, .. }
            | Self::Failed { command, .. }
            | Self::Io { command, .. }
            | Self::Timeout { command, .. } => command,
        }
    }

    /// Replace the recorded command line, e.g. to keep a long argument out of messages
    pub fn with_command(mut self, display: impl Into<String>) -> Self {
        match &mut self {
            Self::SpawnFailed { command, .. }
            | Self::Failed { command, .. }
            | Self::Io { command, .. }
            | Self::Timeout { command, .. } => *command = display.into(),
        }
        self
    }

    /// Error text reported by the process itself, if it ran to completion
    pub fn process_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Lazily produced stdout lines of a running process
pub type LineStream = BoxStream<'static, Result<String, ProcessError>>;

/// Seam between the pipeline and the operating system
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output, whatever the exit code
    async fn output(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError>;

    /// Run the command to completion, returning stdout or failing on a non-zero exit
    async fn run(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.output(command).await?.into_stdout(command)
    }

    /// Stream stdout line by line; a non-zero exit surfaces as the final item
    fn lines(&self, command: &CommandSpec) -> LineStream;
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Upper bound for buffered runs (None = no limit)
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn output(&self, command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, capture(command))
                .await
                .map_err(|_| ProcessError::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                })?,
            None => capture(command).await,
        }
    }

    fn lines(&self, command: &CommandSpec) -> LineStream {
        Box::pin(stdout_lines(command.clone()))
    }
}

fn spawn(command: &CommandSpec) -> Result<Child, ProcessError> {
    let mut cmd = Command::new(&command.program);
    cmd.args(command.args.iter().filter(|a| !a.is_empty()))
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null()) // Non-interactive
        .kill_on_drop(true);

    if let Some(ref dir) = command.working_dir {
        cmd.current_dir(dir);
    }

    // Own process group: a terminal Ctrl+C reaches clocdiff, not the child
    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
        command: command.to_string(),
        source,
    })
}

fn take_pipes(
    child: &mut Child,
    command: &CommandSpec,
) -> Result<(ChildStdout, ChildStderr), ProcessError> {
    let not_captured = |stream: &str| ProcessError::Io {
        command: command.to_string(),
        source: io::Error::new(io::ErrorKind::BrokenPipe, format!("{stream} not captured")),
    };
    let stdout = child.stdout.take().ok_or_else(|| not_captured("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| not_captured("stderr"))?;
    Ok((stdout, stderr))
}

fn io_error(command: &CommandSpec, source: io::Error) -> ProcessError {
    ProcessError::Io {
        command: command.to_string(),
        source,
    }
}

/// Lossy decode so that non-UTF-8 file content in a diff never aborts a run
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// One streamed stdout line, without its `\r\n` or `\n` terminator
fn decode_line(segment: Vec<u8>) -> String {
    let mut line = decode(&segment);
    if line.ends_with('\r') {
        line.pop();
    }
    line
}

async fn capture(command: &CommandSpec) -> Result<ProcessOutput, ProcessError> {
    let start = Instant::now();

    debug!(
        command = %command,
        working_dir = ?command.working_dir,
        "Spawning process"
    );

    let mut child = spawn(command)?;
    let (mut stdout_handle, mut stderr_handle) = take_pipes(&mut child, command)?;

    // Output is kept byte for byte; diff text must reach the prompt unaltered
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    // Drain both pipes together so neither can fill up and stall the child
    let (stdout_read, stderr_read) = tokio::join!(
        stdout_handle.read_to_end(&mut stdout),
        stderr_handle.read_to_end(&mut stderr)
    );
    stdout_read.map_err(|e| io_error(command, e))?;
    stderr_read.map_err(|e| io_error(command, e))?;
    trace!(
        stdout_bytes = stdout.len(),
        stderr_bytes = stderr.len(),
        "Captured process output"
    );

    let status = child.wait().await.map_err(|e| io_error(command, e))?;
    let duration = start.elapsed();

    debug!(
        command = %command,
        exit_code = status.code().unwrap_or(-1),
        duration_ms = duration.as_millis(),
        "Process completed"
    );

    Ok(ProcessOutput::new(
        decode(&stdout),
        decode(&stderr),
        status.code().unwrap_or(-1),
        duration,
    ))
}

async fn read_all(mut stderr: ChildStderr) -> String {
    let mut buf = Vec::new();
    let _ = stderr.read_to_end(&mut buf).await;
    decode(&buf)
}

fn stdout_lines(command: CommandSpec) -> impl Stream<Item = Result<String, ProcessError>> {
    try_stream! {
        debug!(
            command = %command,
            working_dir = ?command.working_dir,
            "Streaming process output"
        );

        let mut child = spawn(&command)?;
        let (stdout, stderr) = take_pipes(&mut child, &command)?;
        let stderr_task = tokio::spawn(read_all(stderr));

        let mut lines = SplitStream::new(BufReader::new(stdout).split(b'\n'));
        while let Some(segment) = lines.next().await {
            let segment = segment.map_err(|e| io_error(&command, e))?;
            let line = decode_line(segment);
            trace!(line = %line, "stdout");
            yield line;
        }

        let status = child.wait().await.map_err(|e| io_error(&command, e))?;
        let stderr = stderr_task.await.unwrap_or_default();
        let exit_code = status.code().unwrap_or(-1);

        debug!(command = %command, exit_code, "Streamed process completed");

        if !status.success() {
            let output = ProcessOutput::new(String::new(), stderr, exit_code, Duration::ZERO);
            Err::<(), _>(ProcessError::Failed {
                command: command.to_string(),
                exit_code,
                message: output.error_message(),
            })?;
        }
    }
}

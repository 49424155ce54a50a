use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for one comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    ComparisonStarted {
        project_dir: PathBuf,
        from: String,
        to: String,
        remote_url: Option<String>,
    },
    BootstrapCompleted {
        project_dir: PathBuf,
        duration_secs: f64,
    },
    ProjectMissing {
        project_dir: PathBuf,
    },
    DiffStatsExtracted {
        files: usize,
    },
    FileDiffComputed {
        seq: usize,
        file: String,
        change_type: String,
        diff_lines: usize,
    },
    AnnotationStarted {
        seq: usize,
        file: String,
    },
    AnnotationCompleted {
        seq: usize,
        file: String,
        duration_secs: f64,
    },
    /// No service call was made for this file
    AnnotationSkipped {
        seq: usize,
        file: String,
        reason: String,
    },
    AnnotationFailed {
        seq: usize,
        file: String,
        error: String,
    },
    SummaryCompleted {
        succeeded: bool,
        duration_secs: f64,
    },
    ComparisonCompleted {
        files: usize,
        failed_annotations: usize,
        duration_secs: f64,
    },
    ComparisonInterrupted {
        files_annotated: usize,
    },
    ReportWritten {
        path: PathBuf,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

/// Logger for pipeline events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let _ = writeln!(file, "{}", event.with_timestamp());
            }
        }

        let line = match self.format {
            LogFormat::Json => serde_json::to_string(event).ok(),
            LogFormat::Pretty => Self::render_pretty(event),
            LogFormat::Compact => Self::render_compact(event),
        };
        if let Some(line) = line {
            let _ = writeln!(std::io::stderr(), "{}", line);
        }
    }

    fn render_pretty(event: &LogEvent) -> Option<String> {
        let line = match event {
            LogEvent::ComparisonStarted {
                project_dir,
                from,
                to,
                remote_url,
            } => {
                let rule = "─".repeat(69).bright_blue();
                let target = match remote_url {
                    Some(url) => format!("{} {}", to, format!("({})", url).dimmed()),
                    None => to.clone(),
                };
                format!(
                    "\n{}\n  {} {} {} {}\n  {} {}\n{}",
                    rule,
                    "clocdiff".bold().bright_white(),
                    from.bright_cyan(),
                    "→".dimmed(),
                    target.bright_cyan(),
                    "Dir:".dimmed(),
                    project_dir.display().to_string().dimmed(),
                    rule
                )
            }
            LogEvent::BootstrapCompleted { duration_secs, .. } => format!(
                "  {} Refs fetched ({:.1}s)",
                "✓".bright_green(),
                duration_secs
            ),
            LogEvent::ProjectMissing { project_dir } => format!(
                "  {} Project directory {} does not exist, skipping",
                "⚠".bright_yellow(),
                project_dir.display()
            ),
            LogEvent::DiffStatsExtracted { files } => format!(
                "  {} {} {} with differences",
                "📁".dimmed(),
                files,
                if *files == 1 { "file" } else { "files" }
            ),
            LogEvent::FileDiffComputed {
                seq,
                file,
                change_type,
                ..
            } => format!(
                "    {} {:>4} {} {}",
                "│".dimmed(),
                seq + 1,
                change_type.dimmed(),
                file
            ),
            // Too chatty next to the completion line
            LogEvent::AnnotationStarted { .. } => return None,
            LogEvent::AnnotationCompleted {
                seq,
                file,
                duration_secs,
            } => format!(
                "    {} {:>4} {} ({:.1}s)",
                "✓".bright_green(),
                seq + 1,
                file,
                duration_secs
            ),
            LogEvent::AnnotationSkipped { seq, file, reason } => format!(
                "    {} {:>4} {} {}",
                "→".bright_yellow(),
                seq + 1,
                file,
                reason.dimmed()
            ),
            LogEvent::AnnotationFailed { seq, file, error } => format!(
                "    {} {:>4} {} {}",
                "✗".bright_red(),
                seq + 1,
                file,
                error.bright_red()
            ),
            LogEvent::SummaryCompleted {
                succeeded,
                duration_secs,
            } => {
                if *succeeded {
                    format!(
                        "  {} Summary ready ({:.1}s)",
                        "✓".bright_green(),
                        duration_secs
                    )
                } else {
                    format!("  {} Summary failed", "✗".bright_red())
                }
            }
            LogEvent::ComparisonCompleted {
                files,
                failed_annotations,
                duration_secs,
            } => {
                let failures = if *failed_annotations > 0 {
                    format!(", {} failed", failed_annotations)
                        .bright_red()
                        .to_string()
                } else {
                    String::new()
                };
                format!(
                    "  {} {} files annotated{} ({:.1}s)",
                    "✓".bright_green().bold(),
                    files,
                    failures,
                    duration_secs
                )
            }
            LogEvent::ComparisonInterrupted { files_annotated } => format!(
                "\n{} Interrupted after {} annotated files",
                "⚠".bright_yellow(),
                files_annotated
            ),
            LogEvent::ReportWritten { path } => {
                format!("  {} {}", "Wrote".dimmed(), path.display())
            }
        };
        Some(line)
    }

    fn render_compact(event: &LogEvent) -> Option<String> {
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::ComparisonStarted { from, to, .. } => {
                format!("compare:start {}..{}", from, to)
            }
            LogEvent::BootstrapCompleted { duration_secs, .. } => {
                format!("bootstrap:done {:.1}s", duration_secs)
            }
            LogEvent::ProjectMissing { project_dir } => {
                format!("bootstrap:missing {}", project_dir.display())
            }
            LogEvent::DiffStatsExtracted { files } => format!("cloc:done {}f", files),
            LogEvent::FileDiffComputed {
                seq,
                file,
                change_type,
                diff_lines,
            } => format!(
                "diff:{} {} {} {}l",
                seq + 1,
                change_type,
                file,
                diff_lines
            ),
            LogEvent::AnnotationStarted { .. } => return None,
            LogEvent::AnnotationCompleted {
                seq, duration_secs, ..
            } => format!("llm:done:{} {:.1}s", seq + 1, duration_secs),
            LogEvent::AnnotationSkipped { seq, .. } => format!("llm:skip:{}", seq + 1),
            LogEvent::AnnotationFailed { seq, error, .. } => {
                format!("llm:error:{} {}", seq + 1, error)
            }
            LogEvent::SummaryCompleted {
                succeeded,
                duration_secs,
            } => format!(
                "summary:{} {:.1}s",
                if *succeeded { "done" } else { "error" },
                duration_secs
            ),
            LogEvent::ComparisonCompleted {
                files,
                failed_annotations,
                duration_secs,
            } => format!(
                "compare:done {}f {}err {:.1}s",
                files, failed_annotations, duration_secs
            ),
            LogEvent::ComparisonInterrupted { files_annotated } => {
                format!("compare:interrupted {}f", files_annotated)
            }
            LogEvent::ReportWritten { path } => format!("report {}", path.display()),
        };
        Some(format!("[{}] {}", timestamp, msg))
    }
}

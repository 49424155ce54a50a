mod config;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, error};

use clocdiff_core::{ComparisonOutcome, ComparisonRequest, ComparisonRunner};
use clocdiff_llm::{create_generator, ProviderType};
use clocdiff_logging::{init_tracing, LogEvent, LogFormat, Logger};
use clocdiff_process::{AuditLog, CommandRunner, SystemRunner};

use config::{ProjectConfig, RunSettings};
use report::{ReportFormat, ReportWriter};

/// File name of the pipeline event log inside `--log-dir`
const EVENT_LOG_FILE: &str = "clocdiff-events.log";

#[derive(Parser, Debug)]
#[command(
    name = "clocdiff",
    about = "Explain the differences between two revisions of a repository",
    version,
    author
)]
struct Cli {
    /// Project directory, relative to --repo-root unless absolute
    #[arg(short = 'p', long)]
    project_dir: Option<PathBuf>,

    /// Tag, branch or commit to compare from
    #[arg(long)]
    from: Option<String>,

    /// Tag, branch or commit to compare to
    #[arg(long)]
    to: Option<String>,

    /// Take the `to` revision from this remote repository
    #[arg(long)]
    remote_url: Option<String>,

    /// Register the remote with its SSH URL
    #[arg(long)]
    use_ssh: bool,

    /// Languages passed to cloc, comma separated (default: all)
    #[arg(short, long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Base directory for relative project directories
    #[arg(long)]
    repo_root: Option<PathBuf>,

    /// Directory the reports are written to
    #[arg(short, long)]
    outdir: Option<PathBuf>,

    /// Which reports to write
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Text-generation service
    #[arg(long, value_enum)]
    provider: Option<ProviderChoice>,

    /// Model to use (if the provider supports it)
    #[arg(short, long)]
    model: Option<String>,

    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum concurrent annotation calls
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file (default: ./clocdiff.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Diagnostics filter, overridden by RUST_LOG
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also write logs to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Output the outcomes as JSON
    #[arg(long)]
    json_output: bool,

    /// Show the planned comparisons without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Openai,
    Claude,
}

impl From<ProviderChoice> for ProviderType {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Openai => ProviderType::OpenAi,
            ProviderChoice::Claude => ProviderType::ClaudeCli,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// One comparison's outcome plus the files written for it
#[derive(Debug, Serialize)]
struct ComparisonReport {
    project: PathBuf,
    from: String,
    to: String,
    #[serde(flatten)]
    outcome: ComparisonOutcome,
    reports: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    let _guard = init_tracing(&cli.log_level, log_format, cli.log_dir.as_deref());

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let file_config = ProjectConfig::load(cli.config.as_deref(), &working_dir)?;
    let settings = RunSettings::resolve(&cli, file_config.as_ref(), &working_dir)?;
    debug!(
        comparisons = settings.comparisons.len(),
        provider = %settings.provider,
        outdir = %settings.outdir.display(),
        "Settings resolved"
    );

    if cli.dry_run {
        print_plan(&settings);
        return Ok(ExitCode::SUCCESS);
    }

    let logger = match cli.log_dir {
        Some(ref dir) => Logger::with_file(log_format, &dir.join(EVENT_LOG_FILE))
            .with_context(|| format!("Failed to open event log in {}", dir.display()))?,
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let generator = create_generator(
        settings.provider,
        settings.base_url.as_deref(),
        runner.clone(),
    )
    .await
    .context("Failed to create the text generator")?;

    let comparison_runner =
        ComparisonRunner::new(runner, generator, settings.annotation.clone(), logger.clone());

    // Handle Ctrl+C gracefully
    let interrupt_handle = comparison_runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Waiting for running commands to finish...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let writer = ReportWriter::new(&settings.outdir);
    let mut reports = Vec::new();

    for request in &settings.comparisons {
        let audit = AuditLog::new();
        let result = comparison_runner.run(request, &audit).await;

        // The command log is kept even when the comparison failed
        let audit_path = writer.write_audit(request, &audit)?;
        logger.log(&LogEvent::ReportWritten {
            path: audit_path.clone(),
        });

        if let Err(ref e) = result {
            error!(project_dir = %request.project_dir.display(), error = %e, "Comparison failed");
        }
        let outcome = result
            .with_context(|| format!("Comparison failed for {}", request.project_dir.display()))?;
        let mut written = vec![audit_path];
        if let ComparisonOutcome::Completed {
            ref diffs,
            ref summary,
            ..
        } = outcome
        {
            written.extend(write_reports(&writer, &settings, request, diffs, summary)?);
            for path in &written[1..] {
                logger.log(&LogEvent::ReportWritten { path: path.clone() });
            }
        }

        let stop = matches!(outcome, ComparisonOutcome::Interrupted { .. });
        reports.push(ComparisonReport {
            project: request.project_dir.clone(),
            from: request.from_ref.clone(),
            to: request.to_ref.clone(),
            outcome,
            reports: written,
        });
        if stop {
            break;
        }
    }

    if cli.json_output {
        let json = serde_json::to_string_pretty(&reports)?;
        println!("{}", json);
    } else {
        for report in &reports {
            print_outcome(report);
        }
    }

    // The log file guard must be dropped before the process ends
    Ok(ExitCode::from(exit_status(&reports)))
}

/// Highest outcome exit code across the comparisons that ran
fn exit_status(reports: &[ComparisonReport]) -> u8 {
    reports
        .iter()
        .map(|r| r.outcome.exit_code())
        .max()
        .map_or(0, |code| u8::try_from(code).unwrap_or(1))
}

fn write_reports(
    writer: &ReportWriter,
    settings: &RunSettings,
    request: &ComparisonRequest,
    diffs: &[clocdiff_core::AnnotatedDiff],
    summary: &str,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if settings.format.csv() {
        written.push(writer.write_csv(request, diffs)?);
    }
    if settings.format.markdown() {
        written.push(writer.write_markdown(request, diffs, summary, &settings.annotation)?);
    }
    Ok(written)
}

fn print_plan(settings: &RunSettings) {
    println!("=== Dry Run ===");
    println!("Provider: {}", settings.provider);
    println!("Model: {}", settings.annotation.model);
    println!("Concurrency: {}", settings.annotation.concurrency);
    println!("Output: {}", settings.outdir.display());
    for request in &settings.comparisons {
        println!();
        println!("Project: {}", request.project_dir.display());
        println!("From: {}", request.from_ref);
        match request.remote.url {
            Some(ref url) => println!("To: {} in remote repo {}", request.to_ref, url),
            None => println!("To: {}", request.to_ref),
        }
        if request.languages.is_empty() {
            println!("Languages: all");
        } else {
            println!("Languages: {}", request.languages.join(", "));
        }
    }
}

fn print_outcome(report: &ComparisonReport) {
    eprintln!();
    match report.outcome {
        ComparisonOutcome::Completed {
            files,
            failed_annotations,
            total_duration_secs,
            ..
        } => {
            eprintln!("{}", "=== COMPLETED ===".green().bold());
            eprintln!("Project: {}", report.project.display());
            eprintln!("Files with differences: {}", files);
            if failed_annotations > 0 {
                eprintln!(
                    "{}",
                    format!("Annotations that fell back: {}", failed_annotations).yellow()
                );
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        ComparisonOutcome::ProjectMissing {
            ref project_dir,
            total_duration_secs,
        } => {
            eprintln!("{}", "=== SKIPPED ===".yellow().bold());
            eprintln!("Project directory {} does not exist", project_dir.display());
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        ComparisonOutcome::Interrupted {
            files_annotated,
            total_duration_secs,
            ..
        } => {
            eprintln!("{}", "=== INTERRUPTED ===".red().bold());
            eprintln!("Project: {}", report.project.display());
            eprintln!("Stopped after annotating {} file(s)", files_annotated);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
    for path in &report.reports {
        eprintln!("Wrote {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn report(outcome: ComparisonOutcome) -> ComparisonReport {
        ComparisonReport {
            project: PathBuf::from("/repo"),
            from: "tags/v1".into(),
            to: "tags/v2".into(),
            outcome,
            reports: Vec::new(),
        }
    }

    #[test]
    fn test_exit_status_takes_the_highest_code() {
        assert_eq!(exit_status(&[]), 0);

        let completed = report(ComparisonOutcome::completed(vec![], String::new(), Duration::ZERO));
        assert_eq!(exit_status(std::slice::from_ref(&completed)), 0);

        let interrupted = report(ComparisonOutcome::interrupted(vec![], Duration::ZERO));
        assert_eq!(exit_status(&[completed, interrupted]), 130);
    }
}

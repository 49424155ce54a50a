//! Report files written after each comparison.
//!
//! Every file name carries the project name and the timestamp of the run, so
//! reports of one run sort together:
//!
//! - `<project>-compare-with-explanations-<timestamp>.csv`
//! - `<project>-compare-with-explanations-<timestamp>.md`
//! - `<project>-executed-commands-<timestamp>.txt`

use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use clocdiff_core::{AnnotatedDiff, AnnotationSettings, ComparisonRequest};
use clocdiff_process::AuditLog;
use serde::{Deserialize, Serialize};

const THIN_RULE: &str =
    "------------------------------------------------------------------------------------------------";
const THICK_RULE: &str = "==========================================================================";

/// Which explanation reports to write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Markdown,
    #[default]
    Both,
}

impl ReportFormat {
    pub fn csv(&self) -> bool {
        matches!(self, ReportFormat::Csv | ReportFormat::Both)
    }

    pub fn markdown(&self) -> bool {
        matches!(self, ReportFormat::Markdown | ReportFormat::Both)
    }
}

pub const CSV_HEADER: [&str; 21] = [
    "File",
    "blank_same",
    "blank_modified",
    "blank_added",
    "blank_removed",
    "comment_same",
    "comment_modified",
    "comment_added",
    "comment_removed",
    "code_same",
    "code_modified",
    "code_added",
    "code_removed",
    "projectDir",
    "fullFilePath",
    "extension",
    "deleted",
    "added",
    "copied",
    "renamed",
    "explanation",
];

#[derive(Serialize)]
struct CsvRow<'a> {
    file: &'a str,
    blank_same: u64,
    blank_modified: u64,
    blank_added: u64,
    blank_removed: u64,
    comment_same: u64,
    comment_modified: u64,
    comment_added: u64,
    comment_removed: u64,
    code_same: u64,
    code_modified: u64,
    code_added: u64,
    code_removed: u64,
    project_dir: String,
    full_file_path: String,
    extension: &'a str,
    deleted: Option<bool>,
    added: Option<bool>,
    copied: Option<bool>,
    renamed: Option<bool>,
    explanation: &'a str,
}

impl<'a> From<&'a AnnotatedDiff> for CsvRow<'a> {
    fn from(diff: &'a AnnotatedDiff) -> Self {
        let stat = &diff.stat;
        Self {
            file: &stat.file,
            blank_same: stat.blank.same,
            blank_modified: stat.blank.modified,
            blank_added: stat.blank.added,
            blank_removed: stat.blank.removed,
            comment_same: stat.comment.same,
            comment_modified: stat.comment.modified,
            comment_added: stat.comment.added,
            comment_removed: stat.comment.removed,
            code_same: stat.code.same,
            code_modified: stat.code.modified,
            code_added: stat.code.added,
            code_removed: stat.code.removed,
            project_dir: stat.project_dir.display().to_string(),
            full_file_path: stat.full_file_path.display().to_string(),
            extension: &stat.extension,
            deleted: diff.status.deleted(),
            added: diff.status.added(),
            copied: diff.status.copied(),
            renamed: diff.status.renamed(),
            explanation: &diff.explanation,
        }
    }
}

/// Write the header and one row per file; the header is written even with no rows
pub fn write_csv<W: Write>(out: W, diffs: &[AnnotatedDiff]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for diff in diffs {
        writer.serialize(CsvRow::from(diff))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn render_markdown(
    request: &ComparisonRequest,
    diffs: &[AnnotatedDiff],
    summary: &str,
    settings: &AnnotationSettings,
) -> String {
    let mut md = String::new();
    let in_remote = request
        .remote
        .url
        .as_deref()
        .map(|url| format!(" in remote repo {}", url))
        .unwrap_or_default();

    // Writing to a String cannot fail
    let _ = writeln!(md, "# Comparing {} with {}\n", request.from_ref, request.to_ref);
    let _ = writeln!(md, "## Project directory: {}\n", request.project_dir.display());
    let _ = writeln!(md, "#### From Tag Branch or Commit: {}\n", request.from_ref);
    let _ = writeln!(md, "#### To Tag Branch or Commit: {}{}\n", request.to_ref, in_remote);
    let _ = writeln!(md, "#### Languages considered: {}\n", request.languages.join(", "));
    let _ = writeln!(md, "{}\n", THIN_RULE);

    let _ = writeln!(md, "### Files with differences: {}\n", diffs.len());
    let _ = writeln!(md, "{}\n", THICK_RULE);

    let _ = writeln!(md, "{}\n", THICK_RULE);
    let _ = writeln!(md, "## Summary of all diffs\n");
    let _ = writeln!(md, "{}\n", summary);
    let _ = writeln!(md, "{}\n", THICK_RULE);
    let _ = writeln!(md, "==================  Differences in files\n");

    for diff in diffs {
        let code = &diff.stat.code;
        let _ = writeln!(md, "{}\n", THIN_RULE);
        let _ = writeln!(md, "### {}\n", diff.stat.file);
        let _ = writeln!(md, "{}\n", diff.explanation);
        let _ = writeln!(
            md,
            "lines of code: {} same, {} modified, {} added, {} removed\n",
            code.same, code.modified, code.added, code.removed
        );
    }

    let _ = writeln!(md, "{}\n", THICK_RULE);
    let _ = writeln!(md, "## Prompt Templates\n");
    let templates = settings
        .templates
        .iter()
        .chain(std::iter::once(&settings.summary_template));
    for template in templates {
        let _ = writeln!(md, "## {}\n", template.description);
        let _ = writeln!(md, "{}\n", template.prompt);
    }

    md
}

/// Names and writes the report files of one run
#[derive(Debug, Clone)]
pub struct ReportWriter {
    outdir: PathBuf,
    timestamp: String,
}

impl ReportWriter {
    pub fn new(outdir: &Path) -> Self {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        Self::with_timestamp(outdir, timestamp)
    }

    pub fn with_timestamp(outdir: &Path, timestamp: impl Into<String>) -> Self {
        Self {
            outdir: outdir.to_path_buf(),
            timestamp: timestamp.into(),
        }
    }

    pub fn path(&self, project: &str, kind: &str, extension: &str) -> PathBuf {
        self.outdir
            .join(format!("{}-{}-{}.{}", project, kind, self.timestamp, extension))
    }

    pub fn write_csv(&self, request: &ComparisonRequest, diffs: &[AnnotatedDiff]) -> Result<PathBuf> {
        let path = self.path(&request.project_name(), "compare-with-explanations", "csv");
        let file = self.create(&path)?;
        write_csv(file, diffs).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_markdown(
        &self,
        request: &ComparisonRequest,
        diffs: &[AnnotatedDiff],
        summary: &str,
        settings: &AnnotationSettings,
    ) -> Result<PathBuf> {
        let path = self.path(&request.project_name(), "compare-with-explanations", "md");
        let mut file = self.create(&path)?;
        file.write_all(render_markdown(request, diffs, summary, settings).as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn write_audit(&self, request: &ComparisonRequest, audit: &AuditLog) -> Result<PathBuf> {
        let path = self.path(&request.project_name(), "executed-commands", "txt");
        let mut file = self.create(&path)?;
        for line in audit.lines() {
            writeln!(file, "{}", line)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(path)
    }

    fn create(&self, path: &Path) -> Result<std::fs::File> {
        std::fs::create_dir_all(&self.outdir)
            .with_context(|| format!("Failed to create {}", self.outdir.display()))?;
        std::fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clocdiff_cloc::{DiffStatRecord, LineCounts};
    use clocdiff_core::ExplanationOrigin;
    use clocdiff_git::{FileStatus, RemoteSpec};
    use clocdiff_process::CommandSpec;
    use tempfile::TempDir;

    fn diff(file: &str, status: FileStatus, explanation: &str) -> AnnotatedDiff {
        AnnotatedDiff {
            seq: 0,
            stat: DiffStatRecord {
                file: file.to_string(),
                blank: LineCounts::default(),
                comment: LineCounts::default(),
                code: LineCounts {
                    same: 10,
                    modified: 2,
                    added: 3,
                    removed: 1,
                },
                project_dir: PathBuf::from("/repos/web"),
                full_file_path: PathBuf::from("/repos/web").join(file),
                extension: ".ts".to_string(),
            },
            status,
            explanation: explanation.to_string(),
            origin: ExplanationOrigin::Service,
        }
    }

    fn request() -> ComparisonRequest {
        ComparisonRequest::new("/repos/web", "tags/v1", "feature")
            .with_remote(RemoteSpec::new("https://github.com/me/web.git"))
            .with_languages(vec!["TypeScript".into(), "Markdown".into()])
    }

    #[test]
    fn test_csv_quotes_explanations_and_leaves_unknown_flags_empty() {
        let diffs = [
            diff("src/a.ts", FileStatus::Added, "Adds a, b; and c"),
            diff("src/b.ts", FileStatus::Unknown, "no diff"),
        ];
        let mut out = Vec::new();
        write_csv(&mut out, &diffs).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "src/a.ts,0,0,0,0,0,0,0,0,10,2,3,1,/repos/web,/repos/web/src/a.ts,.ts,false,true,false,false,\"Adds a, b; and c\""
        );
        assert!(lines[2].ends_with(".ts,,,,,no diff"));
    }

    #[test]
    fn test_csv_without_rows_has_header() {
        let mut out = Vec::new();
        write_csv(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim_end(), CSV_HEADER.join(","));
    }

    #[test]
    fn test_markdown_layout() {
        let diffs = [diff("src/a.ts", FileStatus::Modified, "Refactors the router.")];
        let md = render_markdown(&request(), &diffs, "Small refactor.", &AnnotationSettings::default());

        assert!(md.starts_with("# Comparing tags/v1 with feature\n"));
        assert!(md.contains("#### To Tag Branch or Commit: feature in remote repo https://github.com/me/web.git"));
        assert!(md.contains("#### Languages considered: TypeScript, Markdown"));
        assert!(md.contains("### Files with differences: 1"));
        assert!(md.contains("## Summary of all diffs\n\nSmall refactor."));
        assert!(md.contains("### src/a.ts\n\nRefactors the router."));
        assert!(md.contains("lines of code: 10 same, 2 modified, 3 added, 1 removed"));
        assert!(md.contains("## Prompt Templates"));
        assert!(md.contains("## Prompt for removed files"));

        let summary_at = md.find("Summary of all diffs").unwrap();
        let file_at = md.find("### src/a.ts").unwrap();
        assert!(summary_at < file_at);
    }

    #[test]
    fn test_report_file_names() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::with_timestamp(&dir.path().join("out"), "2024-05-01T10-20-30");
        let request = request();

        let audit = AuditLog::new();
        audit.record_command(&CommandSpec::new("git").args(["fetch", "--all", "--tags"]));
        audit.note("No diff found for file /repos/web/x");

        let audit_path = writer.write_audit(&request, &audit).unwrap();
        assert_eq!(
            audit_path,
            dir.path()
                .join("out")
                .join("web-executed-commands-2024-05-01T10-20-30.txt")
        );
        assert_eq!(
            std::fs::read_to_string(&audit_path).unwrap(),
            "git fetch --all --tags\n===>>> No diff found for file /repos/web/x\n"
        );

        let csv_path = writer.write_csv(&request, &[]).unwrap();
        assert!(csv_path.ends_with("web-compare-with-explanations-2024-05-01T10-20-30.csv"));

        let md_path = writer
            .write_markdown(&request, &[], "", &AnnotationSettings::default())
            .unwrap();
        assert!(md_path.exists());
        assert_eq!(md_path.extension().unwrap(), "md");
    }

    #[test]
    fn test_report_format_flags() {
        assert!(ReportFormat::Both.csv() && ReportFormat::Both.markdown());
        assert!(ReportFormat::Csv.csv() && !ReportFormat::Csv.markdown());
        assert!(!ReportFormat::Markdown.csv());
    }
}

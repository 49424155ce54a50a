//! Configuration file support for clocdiff.
//!
//! Loads `clocdiff.toml` from the working directory, falling back to
//! `<config dir>/clocdiff/config.toml`. Command-line flags override the file,
//! the file overrides built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clocdiff_core::{AnnotationSettings, ComparisonRequest};
use clocdiff_git::RemoteSpec;
use clocdiff_llm::{PromptTemplate, PromptTemplates, ProviderType};
use serde::Deserialize;

use crate::report::ReportFormat;
use crate::Cli;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "clocdiff.toml";

/// Where reports go when neither flag nor file says otherwise
pub const DEFAULT_OUTDIR: &str = "clocdiff-reports";

/// Project-level configuration loaded from `clocdiff.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory that relative project directories are resolved against
    pub repo_root: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    /// Default language filter for every comparison
    #[serde(default)]
    pub languages: Vec<String>,
    pub format: Option<ReportFormat>,
    #[serde(default)]
    pub annotation: AnnotationConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default, rename = "comparison")]
    pub comparisons: Vec<ComparisonConfig>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AnnotationConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub concurrency: Option<usize>,
    /// Per call, e.g. "90s" or "2m"
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub base_url: Option<String>,
}

/// Template files replacing the built-in prompts
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct PromptsConfig {
    pub changed_file: Option<PathBuf>,
    pub added_file: Option<PathBuf>,
    pub removed_file: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

/// One `[[comparison]]` entry
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonConfig {
    pub project_dir: PathBuf,
    pub from: String,
    pub to: String,
    pub remote_url: Option<String>,
    #[serde(default)]
    pub use_ssh: bool,
    /// Replaces the top-level filter for this comparison
    pub languages: Option<Vec<String>>,
}

impl ProjectConfig {
    /// Load configuration.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if a file was found and parses successfully
    /// - `Ok(None)` if no file exists
    /// - `Err(...)` if an explicit file is missing, or a file fails to parse
    pub fn load(explicit: Option<&Path>, working_dir: &Path) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::load_from(path).map(Some);
        }
        match Self::locate(working_dir) {
            Some(path) => Self::load_from(&path).map(Some),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn locate(working_dir: &Path) -> Option<PathBuf> {
        let local = working_dir.join(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("clocdiff").join("config.toml"))
            .filter(|path| path.exists())
    }
}

/// Everything a run needs, after merging flags, file and defaults
#[derive(Debug)]
pub struct RunSettings {
    pub comparisons: Vec<ComparisonRequest>,
    pub outdir: PathBuf,
    pub format: ReportFormat,
    pub provider: ProviderType,
    pub base_url: Option<String>,
    pub annotation: AnnotationSettings,
}

impl RunSettings {
    pub fn resolve(cli: &Cli, config: Option<&ProjectConfig>, working_dir: &Path) -> Result<Self> {
        let fallback = ProjectConfig::default();
        let config = config.unwrap_or(&fallback);

        let repo_root = cli
            .repo_root
            .clone()
            .or_else(|| config.repo_root.clone())
            .unwrap_or_else(|| working_dir.to_path_buf());
        let languages = if cli.languages.is_empty() {
            config.languages.clone()
        } else {
            cli.languages.clone()
        };

        let comparisons = if cli.project_dir.is_some() || cli.from.is_some() || cli.to.is_some() {
            let Some(project_dir) = cli.project_dir.as_ref() else {
                bail!("Missing required parameter: --project-dir");
            };
            let Some(from) = cli.from.as_ref() else {
                bail!("Missing required parameter: --from");
            };
            let Some(to) = cli.to.as_ref() else {
                bail!("Missing required parameter: --to");
            };
            let remote = RemoteSpec {
                url: cli.remote_url.clone(),
                use_ssh: cli.use_ssh,
            };
            vec![ComparisonRequest::new(repo_root.join(project_dir), from, to)
                .with_remote(remote)
                .with_languages(languages)]
        } else if !config.comparisons.is_empty() {
            config
                .comparisons
                .iter()
                .map(|c| {
                    let remote = RemoteSpec {
                        url: c.remote_url.clone(),
                        use_ssh: c.use_ssh,
                    };
                    ComparisonRequest::new(repo_root.join(&c.project_dir), &c.from, &c.to)
                        .with_remote(remote)
                        .with_languages(c.languages.clone().unwrap_or_else(|| languages.clone()))
                })
                .collect()
        } else {
            bail!(
                "No comparison defined: pass --project-dir, --from and --to, or add [[comparison]] entries to {}",
                CONFIG_FILE_NAME
            );
        };

        for request in &comparisons {
            request.validate().with_context(|| {
                format!("Invalid comparison for {}", request.project_dir.display())
            })?;
        }

        let provider = match (cli.provider, config.annotation.provider.as_deref()) {
            (Some(choice), _) => choice.into(),
            (None, Some(name)) => name.parse::<ProviderType>().map_err(anyhow::Error::msg)?,
            (None, None) => ProviderType::OpenAi,
        };

        let defaults = AnnotationSettings::default();
        let concurrency = cli
            .concurrency
            .or(config.annotation.concurrency)
            .unwrap_or(defaults.concurrency);
        if concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }

        let annotation = AnnotationSettings {
            model: cli
                .model
                .clone()
                .or_else(|| config.annotation.model.clone())
                .unwrap_or_else(|| match provider {
                    // The agent CLI picks its own model unless told otherwise
                    ProviderType::ClaudeCli => String::new(),
                    ProviderType::OpenAi => defaults.model,
                }),
            temperature: cli
                .temperature
                .or(config.annotation.temperature)
                .unwrap_or(defaults.temperature),
            concurrency,
            timeout: cli
                .timeout
                .map(Duration::from_secs)
                .or(config.annotation.timeout)
                .or(defaults.timeout),
            templates: load_templates(&config.prompts)?,
            summary_template: match config.prompts.summary {
                Some(ref path) => read_template(path, "Prompt for the summary of all diffs")?,
                None => defaults.summary_template,
            },
        };

        Ok(Self {
            comparisons,
            outdir: cli
                .outdir
                .clone()
                .or_else(|| config.outdir.clone())
                .unwrap_or_else(|| working_dir.join(DEFAULT_OUTDIR)),
            format: cli.format.or(config.format).unwrap_or_default(),
            provider,
            base_url: config.annotation.base_url.clone(),
            annotation,
        })
    }
}

fn load_templates(prompts: &PromptsConfig) -> Result<PromptTemplates> {
    let mut templates = PromptTemplates::builtin();
    if let Some(ref path) = prompts.changed_file {
        templates.changed_file = read_template(path, "Prompt for changed files")?;
    }
    if let Some(ref path) = prompts.added_file {
        templates.added_file = read_template(path, "Prompt for added files")?;
    }
    if let Some(ref path) = prompts.removed_file {
        templates.removed_file = read_template(path, "Prompt for removed files")?;
    }
    Ok(templates)
}

fn read_template(path: &Path, description: &str) -> Result<PromptTemplate> {
    PromptTemplate::from_file(path, description)
        .with_context(|| format!("Failed to read prompt template {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("clocdiff").chain(args.iter().copied())).unwrap()
    }

    fn write_config(dir: &TempDir, content: &str) {
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), content).unwrap();
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ProjectConfig::load(Some(&missing), dir.path()).is_err());
    }

    #[test]
    fn test_load_full_config() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
repo_root = "/repos"
languages = ["TypeScript", "Markdown"]
format = "markdown"

[annotation]
provider = "claude"
model = "sonnet"
temperature = 0.2
concurrency = 3
timeout = "90s"

[[comparison]]
project_dir = "web"
from = "tags/v1"
to = "tags/v2"

[[comparison]]
project_dir = "fork"
from = "main"
to = "feature"
remote_url = "https://github.com/me/fork.git"
use_ssh = true
languages = ["Java"]
"#,
        );

        let config = ProjectConfig::load(None, dir.path()).unwrap().unwrap();
        assert_eq!(config.repo_root, Some(PathBuf::from("/repos")));
        assert_eq!(config.format, Some(ReportFormat::Markdown));
        assert_eq!(config.annotation.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.comparisons.len(), 2);
        assert!(config.comparisons[1].use_ssh);
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[annotation]\nmodle = \"gpt-4o\"\n");
        assert!(ProjectConfig::load(None, dir.path()).is_err());
    }

    #[test]
    fn test_comparison_without_to_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_config(&dir, "[[comparison]]\nproject_dir = \"web\"\nfrom = \"main\"\n");
        assert!(ProjectConfig::load(None, dir.path()).is_err());
    }

    #[test]
    fn test_cli_comparison_overrides_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
repo_root = "/repos"
languages = ["Java"]

[annotation]
model = "from-file"
concurrency = 3

[[comparison]]
project_dir = "ignored"
from = "a"
to = "b"
"#,
        );
        let config = ProjectConfig::load(None, dir.path()).unwrap();
        let cli = cli(&[
            "--project-dir",
            "web",
            "--from",
            "tags/v1",
            "--to",
            "tags/v2",
            "--model",
            "from-cli",
            "--languages",
            "TypeScript,Markdown",
        ]);

        let settings = RunSettings::resolve(&cli, config.as_ref(), dir.path()).unwrap();

        assert_eq!(settings.comparisons.len(), 1);
        let request = &settings.comparisons[0];
        assert_eq!(request.project_dir, PathBuf::from("/repos/web"));
        assert_eq!(request.languages, vec!["TypeScript", "Markdown"]);
        assert!(!request.compares_with_remote());
        assert_eq!(settings.annotation.model, "from-cli");
        assert_eq!(settings.annotation.concurrency, 3);
        assert_eq!(settings.provider, ProviderType::OpenAi);
    }

    #[test]
    fn test_file_comparisons_run_when_cli_has_none() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            r#"
languages = ["Java"]

[[comparison]]
project_dir = "/abs/one"
from = "tags/v1"
to = "tags/v2"

[[comparison]]
project_dir = "two"
from = "main"
to = "feature"
remote_url = "https://github.com/me/two.git"
languages = []
"#,
        );
        let config = ProjectConfig::load(None, dir.path()).unwrap();

        let settings = RunSettings::resolve(&cli(&[]), config.as_ref(), dir.path()).unwrap();

        assert_eq!(settings.comparisons.len(), 2);
        assert_eq!(settings.comparisons[0].project_dir, PathBuf::from("/abs/one"));
        assert_eq!(settings.comparisons[0].languages, vec!["Java"]);
        assert_eq!(settings.comparisons[1].project_dir, dir.path().join("two"));
        assert!(settings.comparisons[1].languages.is_empty());
        assert!(settings.comparisons[1].compares_with_remote());
        assert_eq!(settings.outdir, dir.path().join(DEFAULT_OUTDIR));
        assert_eq!(settings.format, ReportFormat::Both);
    }

    #[test]
    fn test_missing_parameters_are_fatal() {
        let dir = TempDir::new().unwrap();

        let err = RunSettings::resolve(&cli(&[]), None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("No comparison defined"));

        let partial = cli(&["--project-dir", "web", "--from", "main"]);
        let err = RunSettings::resolve(&partial, None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("--to"));
    }

    #[test]
    fn test_agent_provider_without_model_leaves_model_empty() {
        let dir = TempDir::new().unwrap();
        let args = cli(&["--project-dir", "w", "--from", "a", "--to", "b", "--provider", "claude"]);
        let settings = RunSettings::resolve(&args, None, dir.path()).unwrap();
        assert_eq!(settings.provider, ProviderType::ClaudeCli);
        assert!(settings.annotation.model.is_empty());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let dir = TempDir::new().unwrap();
        let args = cli(&["--project-dir", "w", "--from", "a", "--to", "b", "--concurrency", "0"]);
        assert!(RunSettings::resolve(&args, None, dir.path()).is_err());
    }

    #[test]
    fn test_prompt_files_replace_builtins() {
        let dir = TempDir::new().unwrap();
        let prompt = dir.path().join("changed.txt");
        std::fs::write(&prompt, "Explain {{fileName}}").unwrap();
        let config = ProjectConfig {
            prompts: PromptsConfig {
                changed_file: Some(prompt),
                ..PromptsConfig::default()
            },
            ..ProjectConfig::default()
        };
        let args = cli(&["--project-dir", "w", "--from", "a", "--to", "b"]);

        let settings = RunSettings::resolve(&args, Some(&config), dir.path()).unwrap();

        assert_eq!(settings.annotation.templates.changed_file.prompt, "Explain {{fileName}}");
        assert_eq!(
            settings.annotation.templates.added_file,
            PromptTemplates::builtin().added_file
        );
    }
}

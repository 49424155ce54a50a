use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

static PLACEHOLDER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").ok());

/// A prompt with `{{placeholder}}` slots and a human description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTemplate {
    pub prompt: String,
    pub description: String,
}

impl PromptTemplate {
    pub fn new(prompt: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            description: description.into(),
        }
    }

    pub fn from_file(path: &Path, description: impl Into<String>) -> io::Result<Self> {
        let prompt = std::fs::read_to_string(path)?;
        Ok(Self::new(prompt, description))
    }

    pub fn is_empty(&self) -> bool {
        self.prompt.trim().is_empty()
    }
}

/// The per-file templates, one per change kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptTemplates {
    pub changed_file: PromptTemplate,
    pub added_file: PromptTemplate,
    pub removed_file: PromptTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptTemplates {
    pub fn builtin() -> Self {
        Self {
            changed_file: PromptTemplate::new(CHANGED_FILE_PROMPT, "Prompt for changed files"),
            added_file: PromptTemplate::new(ADDED_FILE_PROMPT, "Prompt for added files"),
            removed_file: PromptTemplate::new(REMOVED_FILE_PROMPT, "Prompt for removed files"),
        }
    }

    /// Templates in report order
    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        [&self.changed_file, &self.added_file, &self.removed_file].into_iter()
    }

    pub fn builtin_summary() -> PromptTemplate {
        PromptTemplate::new(SUMMARY_PROMPT, "Prompt for the summary of all diffs")
    }
}

/// Replace every `{{name}}` that has a non-empty value; leave the rest verbatim
pub fn fill_template(template: &str, values: &HashMap<&str, &str>) -> String {
    let Some(placeholder) = PLACEHOLDER.as_ref() else {
        return template.to_string();
    };
    placeholder
        .replace_all(template, |caps: &Captures| {
            match values.get(&caps[1]).filter(|v| !v.is_empty()) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Values for a per-file explanation prompt
#[derive(Debug, Clone, Copy)]
pub struct ExplainDiffData<'a> {
    pub language: &'a str,
    pub file_name: &'a str,
    pub file_content: &'a str,
    pub diffs: &'a str,
}

impl ExplainDiffData<'_> {
    pub fn fill(&self, template: &str) -> String {
        let values = HashMap::from([
            ("language", self.language),
            ("fileName", self.file_name),
            ("fileContent", self.file_content),
            ("diffs", self.diffs),
        ]);
        fill_template(template, &values)
    }
}

/// Values for the project summary prompt
#[derive(Debug, Clone, Copy)]
pub struct SummarizeDiffsData<'a> {
    pub languages: &'a str,
    pub diffs: &'a str,
}

impl SummarizeDiffsData<'_> {
    pub fn fill(&self, template: &str) -> String {
        let values = HashMap::from([("languages", self.languages), ("diffs", self.diffs)]);
        fill_template(template, &values)
    }
}

/// Language name for a file extension (with leading dot); empty when unknown
pub fn language_from_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        ".java" => "java",
        ".ts" | ".tsx" => "TypeScript",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "JavaScript",
        ".rs" => "Rust",
        ".py" => "Python",
        ".go" => "Go",
        ".kt" | ".kts" => "Kotlin",
        ".scala" => "Scala",
        ".cs" => "C#",
        ".c" | ".h" => "C",
        ".cpp" | ".cc" | ".cxx" | ".hpp" => "C++",
        ".rb" => "Ruby",
        ".php" => "PHP",
        ".swift" => "Swift",
        ".sql" => "SQL",
        ".sh" | ".bash" => "Bourne Shell",
        ".html" | ".htm" => "HTML",
        ".css" => "CSS",
        ".scss" => "SCSS",
        ".md" => "Markdown",
        ".json" => "JSON",
        ".yaml" | ".yml" => "YAML",
        ".xml" => "XML",
        _ => "",
    }
}

const CHANGED_FILE_PROMPT: &str = r#"You are an expert {{language}} developer with 10 years of experience.

The file {{fileName}} has been changed. This is its current content:

{{fileContent}}

These are the differences between the two versions of the file, as reported by `git diff`:

{{diffs}}

Explain in a few sentences what has changed and why it matters. Do not repeat the code."#;

const ADDED_FILE_PROMPT: &str = r#"You are an expert {{language}} developer with 10 years of experience.

The file {{fileName}} has been added to the project. This is its content:

{{fileContent}}

Explain in a few sentences what this file does and what it adds to the project. Do not repeat the code."#;

const REMOVED_FILE_PROMPT: &str = r#"You are an expert {{language}} developer with 10 years of experience.

The file {{fileName}} has been removed from the project. These are the differences reported by `git diff`:

{{diffs}}

Explain in a few sentences what the file did and what the project loses by removing it. Do not repeat the code."#;

const SUMMARY_PROMPT: &str = r#"You are an expert developer with 10 years of experience. You are expert in many programming languages {{languages}}.
You have to examine the changes that occurred to a project from one version to the next and write a short summary of these changes.

This is the list of the files which have been changed, a note on whether the file has been changed, removed, added or renamed, and a short summary of the changes in each file:

{{diffs}}
"#;

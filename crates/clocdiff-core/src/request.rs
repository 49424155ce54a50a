use std::path::PathBuf;

use clocdiff_git::{RemoteSpec, ResolvedRefs};

use crate::PipelineError;

/// One comparison: two refs of one project, optionally against a remote fork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub project_dir: PathBuf,
    /// Tag (`tags/...`), branch or commit hash
    pub from_ref: String,
    pub to_ref: String,
    /// When set, `to_ref` is looked up on this remote
    pub remote: RemoteSpec,
    /// cloc language names; empty means every language
    pub languages: Vec<String>,
}

impl ComparisonRequest {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        from_ref: impl Into<String>,
        to_ref: impl Into<String>,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            from_ref: from_ref.into(),
            to_ref: to_ref.into(),
            remote: RemoteSpec::default(),
            languages: Vec::new(),
        }
    }

    pub fn with_remote(mut self, remote: RemoteSpec) -> Self {
        self.remote = remote;
        self
    }

    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        self.languages = languages;
        self
    }

    pub fn compares_with_remote(&self) -> bool {
        self.remote.url.is_some()
    }

    pub fn refs(&self) -> ResolvedRefs {
        ResolvedRefs::new(&self.from_ref, &self.to_ref, self.compares_with_remote())
    }

    /// Last component of the project directory, used to name reports
    pub fn project_name(&self) -> String {
        self.project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.project_dir.display().to_string())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.project_dir.as_os_str().is_empty() {
            return Err(PipelineError::MissingParameter("project directory"));
        }
        if self.from_ref.trim().is_empty() {
            return Err(PipelineError::MissingParameter("from ref"));
        }
        if self.to_ref.trim().is_empty() {
            return Err(PipelineError::MissingParameter("to ref"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refs_follow_remote_flag() {
        let local = ComparisonRequest::new("/repos/web", "main", "feature");
        assert_eq!(local.refs().to, "origin/feature");

        let remote = local
            .clone()
            .with_remote(RemoteSpec::new("https://github.com/me/web.git"));
        assert!(remote.compares_with_remote());
        assert_eq!(remote.refs().from, "origin/main");
        assert_eq!(remote.refs().to, "base/feature");
    }

    #[test]
    fn test_project_name() {
        let request = ComparisonRequest::new("/repos/my-service", "tags/v1", "tags/v2");
        assert_eq!(request.project_name(), "my-service");
    }

    #[test]
    fn test_validate_reports_first_missing_parameter() {
        assert!(ComparisonRequest::new("/p", "a", "b").validate().is_ok());
        assert!(matches!(
            ComparisonRequest::new("", "a", "b").validate(),
            Err(PipelineError::MissingParameter("project directory"))
        ));
        assert!(matches!(
            ComparisonRequest::new("/p", " ", "b").validate(),
            Err(PipelineError::MissingParameter("from ref"))
        ));
        assert!(matches!(
            ComparisonRequest::new("/p", "a", "").validate(),
            Err(PipelineError::MissingParameter("to ref"))
        ));
    }
}

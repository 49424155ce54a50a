use std::path::Path;

use clocdiff_process::{AuditLog, CommandRunner, CommandSpec, ProcessError};
use tracing::{debug, info, warn};

use crate::GitError;

/// Name under which the compared fork is registered
pub const BASE_REMOTE: &str = "base";

/// Optional fork to compare against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSpec {
    pub url: Option<String>,
    /// Register the remote with its SSH form (avoids password prompts)
    pub use_ssh: bool,
}

impl RemoteSpec {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            use_ssh: false,
        }
    }

    pub fn with_ssh(mut self, use_ssh: bool) -> Self {
        self.use_ssh = use_ssh;
        self
    }

    /// The URL that is actually registered
    pub fn effective_url(&self) -> Result<Option<String>, GitError> {
        match self.url {
            Some(ref url) if self.use_ssh => https_to_ssh_url(url).map(Some),
            Some(ref url) => Ok(Some(url.clone())),
            None => Ok(None),
        }
    }
}

/// Result of bootstrapping a project directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Refs are fetched; diff commands may run
    Ready,
    /// The directory does not exist (e.g. a fork that has not been cloned yet);
    /// nothing further should run for this comparison
    ProjectMissing,
}

/// Convert `https://host/group/project.git` into `git@host:group/project.git`
pub fn https_to_ssh_url(url: &str) -> Result<String, GitError> {
    let parts: Vec<&str> = url.split("//").collect();
    if parts.len() != 2 {
        return Err(GitError::InvalidUrl(url.to_string()));
    }

    let (host, project) = match parts[1].split_once('/') {
        Some((host, project)) => (host, project),
        None => (parts[1], ""),
    };
    Ok(format!("git@{}:{}", host, project))
}

/// Fetch all refs and tags of `project_dir` and, when a remote URL is given,
/// register it as [`BASE_REMOTE`] and fetch its tags.
///
/// Safe to repeat: a remote that is already registered is left in place.
pub async fn ensure_remote_and_fetch(
    runner: &dyn CommandRunner,
    project_dir: &Path,
    remote: &RemoteSpec,
    audit: &AuditLog,
) -> Result<BootstrapOutcome, GitError> {
    let is_dir = tokio::fs::metadata(project_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        warn!(project_dir = %project_dir.display(), "Project directory does not exist");
        audit.note(format!(
            "Error: Project directory {} does not exist",
            project_dir.display()
        ));
        return Ok(BootstrapOutcome::ProjectMissing);
    }

    let fetch_all = git(project_dir).args(["fetch", "--all", "--tags"]);
    audit.record_command(&fetch_all);
    runner.run(&fetch_all).await?;

    let Some(url) = remote.effective_url()? else {
        debug!(project_dir = %project_dir.display(), "No remote to register");
        return Ok(BootstrapOutcome::Ready);
    };

    let add_remote = git(project_dir).args(["remote", "add", BASE_REMOTE, &url]);
    audit.record_command(&add_remote);
    match runner.run(&add_remote).await {
        Ok(_) => info!(remote = BASE_REMOTE, url = %url, "Registered remote"),
        Err(e) if remote_already_exists(&e) => {
            debug!(remote = BASE_REMOTE, "Remote already registered");
        }
        Err(e) => return Err(e.into()),
    }

    let fetch_base = git(project_dir).args(["fetch", BASE_REMOTE, "--tags"]);
    audit.record_command(&fetch_base);
    runner.run(&fetch_base).await?;

    Ok(BootstrapOutcome::Ready)
}

fn git(project_dir: &Path) -> CommandSpec {
    CommandSpec::new("git").current_dir(project_dir)
}

fn remote_already_exists(error: &ProcessError) -> bool {
    error
        .process_message()
        .is_some_and(|m| m.contains(&format!("remote {} already exists", BASE_REMOTE)))
}

use std::fmt;
use std::path::{Path, PathBuf};

/// A program invocation: executable, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Line recorded in the audit log, reproducible from a shell
    pub fn audit_line(&self) -> String {
        match self.working_dir {
            Some(ref dir) => format!("cd {} && {}", dir.display(), self),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        // Empty arguments are dropped before spawning, so hide them here too
        for arg in self.args.iter().filter(|a| !a.is_empty()) {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_program_and_args() {
        let spec = CommandSpec::new("git").args(["diff", "refs/tags/v2", "refs/tags/v1"]);
        assert_eq!(spec.to_string(), "git diff refs/tags/v2 refs/tags/v1");
    }

    #[test]
    fn test_display_skips_empty_args() {
        let spec = CommandSpec::new("cloc").args(["--csv", "", "--by-file"]);
        assert_eq!(spec.to_string(), "cloc --csv --by-file");
    }

    #[test]
    fn test_audit_line_includes_working_dir() {
        let spec = CommandSpec::new("git")
            .args(["fetch", "--all", "--tags"])
            .current_dir("/repos/project");
        assert_eq!(
            spec.audit_line(),
            "cd /repos/project && git fetch --all --tags"
        );
    }
}

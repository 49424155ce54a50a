use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::GitError;

/// Hands out one lock per project directory.
///
/// `git fetch`, `git remote add` and the per-file diffs all mutate or read the
/// shared checkout, so a comparison must hold its directory's guard for as long
/// as it issues git commands there.
#[derive(Debug, Clone, Default)]
pub struct WorkTreeRegistry {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>>,
}

/// Exclusive access to one project directory
#[derive(Debug)]
pub struct WorkTreeGuard {
    path: PathBuf,
    _guard: OwnedMutexGuard<()>,
}

impl WorkTreeGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkTreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other comparison uses `project_dir`
    pub async fn lock(&self, project_dir: &Path) -> WorkTreeGuard {
        let (path, slot) = self.slot(project_dir);
        debug!(path = %path.display(), "Waiting for work tree");
        let guard = slot.lock_owned().await;
        WorkTreeGuard {
            path,
            _guard: guard,
        }
    }

    /// Take `project_dir` only if it is free
    pub fn try_lock(&self, project_dir: &Path) -> Result<WorkTreeGuard, GitError> {
        let (path, slot) = self.slot(project_dir);
        match slot.try_lock_owned() {
            Ok(guard) => Ok(WorkTreeGuard {
                path,
                _guard: guard,
            }),
            Err(_) => Err(GitError::WorkTreeBusy(path)),
        }
    }

    fn slot(&self, project_dir: &Path) -> (PathBuf, Arc<AsyncMutex<()>>) {
        // "./repo" and "/abs/repo" must share a lock; missing dirs keep their path
        let path = std::fs::canonicalize(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let slot = locks.entry(path.clone()).or_default().clone();
        (path, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_try_lock_rejects_busy_directory() {
        let registry = WorkTreeRegistry::new();
        let dir = Path::new("/tmp/clocdiff-worktree-test-a");

        let guard = registry.try_lock(dir).unwrap();
        assert!(matches!(
            registry.try_lock(dir),
            Err(GitError::WorkTreeBusy(_))
        ));

        drop(guard);
        assert!(registry.try_lock(dir).is_ok());
    }

    #[tokio::test]
    async fn test_different_directories_do_not_block() {
        let registry = WorkTreeRegistry::new();
        let _a = registry.lock(Path::new("/tmp/clocdiff-worktree-test-b")).await;
        assert!(registry
            .try_lock(Path::new("/tmp/clocdiff-worktree-test-c"))
            .is_ok());
    }

    #[tokio::test]
    async fn test_lock_waits_for_release() {
        let registry = WorkTreeRegistry::new();
        let dir = PathBuf::from("/tmp/clocdiff-worktree-test-d");

        let first = registry.lock(&dir).await;

        let waiter = {
            let registry = registry.clone();
            let dir = dir.clone();
            tokio::spawn(async move {
                let _second = registry.lock(&dir).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}

//! # clocdiff-git
//!
//! Git operations for the clocdiff comparison pipeline.
//!
//! All git work goes through the `git` CLI via [`clocdiff_process::CommandRunner`],
//! so the pipeline sees exactly the refs that `cloc --git-diff-rel` sees.
//!
//! ## Key Types
//!
//! - [`ResolvedRefs`] / [`RefPrefixPair`] - turn a tag, branch or commit into the
//!   form git expects, depending on whether the comparison targets a remote fork
//! - [`ensure_remote_and_fetch`] - idempotent fetch of all refs plus the optional
//!   `base` remote
//! - [`file_diff`] / [`FileStatus`] - textual diff of one file and its change kind
//! - [`WorkTreeRegistry`] - one lock per project directory, so that comparisons
//!   never issue overlapping git commands against the same checkout
//!
//! ## Ref prefixes
//!
//! | ref shape | prefix |
//! |---|---|
//! | `tags/...` | `refs/` |
//! | 7-40 hex characters | none |
//! | branch, "to" side, remote comparison | `base/` |
//! | any other branch | `origin/` |

mod diff;
mod error;
mod refs;
mod remote;
mod worktree;

pub use diff::{file_diff, FileDiff, FileStatus};
pub use error::GitError;
pub use refs::{is_hash_like, resolve_prefixes, RefPrefix, RefPrefixPair, ResolvedRefs};
pub use remote::{ensure_remote_and_fetch, https_to_ssh_url, BootstrapOutcome, RemoteSpec, BASE_REMOTE};
pub use worktree::{WorkTreeGuard, WorkTreeRegistry};

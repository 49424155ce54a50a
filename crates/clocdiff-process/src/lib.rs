//! # clocdiff-process
//!
//! Subprocess execution for clocdiff.
//!
//! Every external tool the comparison pipeline depends on (`git`, `cloc`, agent
//! CLIs) is reached through the [`CommandRunner`] trait. The production
//! implementation is [`SystemRunner`]; tests substitute in-memory fakes.
//!
//! ## Output shapes
//!
//! - [`CommandRunner::output`] buffers stdout and stderr and returns them once the
//!   process exits, whatever the exit code.
//! - [`CommandRunner::run`] does the same but turns a non-zero exit into a
//!   [`ProcessError::Failed`] carrying the process error text.
//! - [`CommandRunner::lines`] yields stdout lazily, one line at a time. A partial
//!   trailing line is held back until the next chunk or process exit.
//!
//! ## Audit trail
//!
//! [`AuditLog`] records the command lines a comparison issues. It is handed to
//! every component explicitly, so each comparison run owns its own trail.

mod audit;
mod command;
mod output;
mod runner;

pub use audit::{AuditEntry, AuditLog};
pub use command::CommandSpec;
pub use output::ProcessOutput;
pub use runner::{CommandRunner, LineStream, ProcessError, SystemRunner};

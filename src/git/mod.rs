//! Version-control facade.
//!
//! All interaction with the repository goes through the git CLI (rather than
//! libgit2) so worktrees, sparse-checkout, hooks, and user git config behave
//! exactly as they do on the command line.

mod cli;
mod repo;

pub use cli::{CommitRecord, GitCli, WorktreeEntry};
pub use repo::{BranchGauge, MergeOutcome, Repository};

use thiserror::Error;

/// Errors from git subprocess invocations.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git is not installed or not in PATH")]
    NotInstalled,

    #[error("git {command} failed (exit {code}): {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("merging '{branch}' into '{target}' stopped on conflicts")]
    MergeConflict { branch: String, target: String },

    #[error("ref '{0}' not found")]
    RefNotFound(String),

    #[error("'{0}' is not inside a git repository")]
    NotARepository(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Whether this error is a merge conflict, which callers surface as a
    /// distinct non-fatal outcome rather than a failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GitError::MergeConflict { .. })
    }
}

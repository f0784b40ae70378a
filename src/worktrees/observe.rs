//! Observed on-disk worktree state.

use std::path::PathBuf;

/// What actually exists on disk for one worktree, recomputed every
/// invocation via the version-control facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedWorktree {
    /// Directory basename, matched against configured worktree names
    pub name: String,
    pub path: PathBuf,
    /// None when HEAD is detached
    pub current_branch: Option<String>,
    /// The configured branch for this name, when the name is declared
    pub expected_branch: Option<String>,
    /// Uncommitted changes present
    pub dirty: bool,
}

impl ObservedWorktree {
    /// Branch label for display; detached HEADs have no branch name.
    pub fn branch_label(&self) -> &str {
        self.current_branch.as_deref().unwrap_or("(detached)")
    }
}

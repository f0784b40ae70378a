//! Thin command handlers.
//!
//! Every invocation builds one immutable [`Workspace`] snapshot - declared
//! configuration, observed worktree state, persisted state - and threads it
//! through the handlers as plain arguments. Nothing here caches across
//! invocations.

pub mod add;
pub mod check;
pub mod hotfix;
pub mod init;
pub mod list;
pub mod mergeback;
pub mod remove;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::git::Repository;
use crate::worktrees::observe::ObservedWorktree;
use crate::worktrees::tree::DependencyTree;
use crate::worktrees::{PersistedState, WorktreeConfig};

/// Everything a command needs, captured once at process start.
pub struct Workspace {
    pub repo: Repository,
    pub worktrees: WorktreeConfig,
    pub tree: DependencyTree,
    pub observed: Vec<ObservedWorktree>,
    pub state: PersistedState,
}

impl Workspace {
    /// Path of the declarative configuration document
    pub fn config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(WorktreeConfig::FILE_NAME)
    }

    /// Discover the repository from the current directory and capture the
    /// full snapshot. Structural configuration errors surface immediately.
    pub async fn load(tool_config: &Config) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let repo = Repository::discover(&cwd, &tool_config.paths.worktree_dir).await?;

        let config_path = Self::config_path(repo.root());
        let worktrees = WorktreeConfig::load(&config_path).with_context(|| {
            format!(
                "No usable {} at the repository root (run `stagehand init` to create one)",
                WorktreeConfig::FILE_NAME
            )
        })?;

        let tree = DependencyTree::build(&worktrees)?;
        let observed = repo.observe_worktrees(&worktrees).await?;
        let state = PersistedState::load(repo.root())?;

        Ok(Self {
            repo,
            worktrees,
            tree,
            observed,
            state,
        })
    }

    /// The observed worktree with the given name, if any
    pub fn observed_by_name(&self, name: &str) -> Option<&ObservedWorktree> {
        self.observed.iter().find(|wt| wt.name == name)
    }

    /// Persist the (mutated) state back to disk
    pub fn save_state(&self) -> Result<()> {
        self.state.save(self.repo.root())?;
        Ok(())
    }
}

//! Repository-scoped operations built on top of [`GitCli`].
//!
//! A [`Repository`] is rediscovered on every invocation; nothing here is
//! cached across runs. Worktrees managed by the tool live under a single
//! directory (default `.worktrees/` inside the repository root), one
//! subdirectory per configured worktree name.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::{CommitRecord, GitCli, GitError};
use crate::worktrees::observe::ObservedWorktree;
use crate::worktrees::spec::WorktreeConfig;

/// Per-branch log depth when scanning recent activity.
const ACTIVITY_LOG_LIMIT: usize = 200;

/// Outcome of a merge attempt. Conflicts are a reportable result, not a
/// failure; the working tree is left mid-merge for manual resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged,
    Conflict { source: String, target: String },
}

/// Answers directed ahead-checks for the mergeback planner.
///
/// Implemented by [`Repository`] against the real repository and by
/// in-memory fakes in planner tests.
#[async_trait]
pub trait BranchGauge {
    /// Number of commits on `source` that `target` lacks, or None when the
    /// comparison could not be made (missing refs, query failure).
    async fn ahead_of(&self, source: &str, target: &str) -> Option<u64>;
}

/// A discovered git repository plus the tool's worktree layout.
pub struct Repository {
    root: PathBuf,
    worktree_dir: PathBuf,
}

impl Repository {
    /// Discover the repository containing `start`, resolving the worktree
    /// directory against the repository root when relative.
    pub async fn discover(start: &Path, worktree_dir: &str) -> Result<Self, GitError> {
        let root = PathBuf::from(GitCli::repo_root(start).await?);
        let dir = PathBuf::from(worktree_dir);
        let worktree_dir = if dir.is_absolute() {
            dir
        } else {
            root.join(dir)
        };
        debug!(root = %root.display(), worktrees = %worktree_dir.display(), "Discovered repository");
        Ok(Self { root, worktree_dir })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a named worktree lives in (whether or not it exists yet)
    pub fn worktree_path(&self, name: &str) -> PathBuf {
        self.worktree_dir.join(name)
    }

    /// Capture the current on-disk worktree state.
    ///
    /// Worktree names are directory basenames; expected branches are
    /// annotated from the declared configuration when present. The primary
    /// checkout is reported under the name of the configured worktree whose
    /// branch it has checked out, since that branch can never be checked out
    /// a second time.
    #[instrument(skip_all)]
    pub async fn observe_worktrees(
        &self,
        config: &WorktreeConfig,
    ) -> Result<Vec<ObservedWorktree>, GitError> {
        let entries = GitCli::list_worktrees(&self.root).await?;
        let mut observed = Vec::new();

        for entry in entries {
            let path = PathBuf::from(&entry.path);
            if entry.bare {
                continue;
            }

            // The primary checkout stands in for the configured worktree
            // whose branch it has checked out; on any other branch it is not
            // an observed worktree.
            if path == self.root {
                let Some(spec) = entry
                    .branch
                    .as_deref()
                    .and_then(|branch| config.iter().find(|spec| spec.branch == branch))
                else {
                    continue;
                };
                let dirty = GitCli::is_dirty(&path).await.unwrap_or(false);
                observed.push(ObservedWorktree {
                    name: spec.name.clone(),
                    expected_branch: Some(spec.branch.clone()),
                    current_branch: entry.branch,
                    path,
                    dirty,
                });
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };

            // `git worktree list` can report worktrees whose directory was
            // deleted out from under git; they are not observable state.
            if !path.exists() {
                warn!(%name, "Skipping stale worktree entry (directory missing)");
                continue;
            }

            let dirty = GitCli::is_dirty(&path).await.unwrap_or(false);
            observed.push(ObservedWorktree {
                expected_branch: config.get(&name).map(|spec| spec.branch.clone()),
                current_branch: entry.branch,
                name,
                path,
                dirty,
            });
        }

        observed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(observed)
    }

    /// Ensure a worktree for `name` exists on `branch`, creating it when
    /// absent. Re-running against an existing worktree is a no-op, so a
    /// partially completed multi-step operation can simply run again.
    #[instrument(skip(self), fields(name, branch))]
    pub async fn ensure_worktree(
        &self,
        name: &str,
        branch: &str,
        base: Option<&str>,
    ) -> Result<PathBuf, GitError> {
        let path = self.worktree_path(name);

        if path.exists() {
            debug!(path = %path.display(), "Worktree already exists");
            return Ok(path);
        }

        // A branch can only be checked out once; when some worktree (the
        // primary checkout included) already holds it, that worktree serves.
        for entry in GitCli::list_worktrees(&self.root).await? {
            if entry.branch.as_deref() == Some(branch) {
                debug!(path = entry.path, %branch, "Branch already checked out, reusing");
                return Ok(PathBuf::from(entry.path));
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // A branch that exists only as origin/<branch> still works without
        // -b: `git worktree add` creates the tracking branch itself.
        let branch_exists = GitCli::ref_exists(&self.root, branch).await
            || GitCli::ref_exists(&self.root, &format!("origin/{branch}")).await;
        if branch_exists {
            GitCli::add_worktree(&self.root, &path, branch, false, None).await?;
        } else {
            let base_ref = match base {
                Some(b) => b.to_string(),
                None => return Err(GitError::RefNotFound(branch.to_string())),
            };
            if !GitCli::ref_exists(&self.root, &base_ref).await {
                return Err(GitError::RefNotFound(base_ref));
            }
            GitCli::add_worktree(&self.root, &path, branch, true, Some(&base_ref)).await?;
        }

        info!(path = %path.display(), %branch, "Worktree created");
        Ok(path)
    }

    /// Remove a worktree and prune stale metadata
    #[instrument(skip(self))]
    pub async fn remove_worktree(&self, path: &Path, force: bool) -> Result<(), GitError> {
        GitCli::remove_worktree(&self.root, path, force).await?;
        if let Err(e) = GitCli::prune_worktrees(&self.root).await {
            warn!("Failed to prune worktrees: {e}");
        }
        Ok(())
    }

    /// Merge `source_branch` into the branch checked out at `target_path`
    #[instrument(skip(self), fields(source_branch, target_path = %target_path.display()))]
    pub async fn merge_into(
        &self,
        target_path: &Path,
        source_branch: &str,
        message: &str,
    ) -> Result<MergeOutcome, GitError> {
        match GitCli::merge_no_ff(target_path, source_branch, message).await {
            Ok(()) => Ok(MergeOutcome::Merged),
            Err(GitError::MergeConflict { branch, target }) => {
                Ok(MergeOutcome::Conflict { source: branch, target })
            }
            Err(e) => Err(e),
        }
    }

    /// Best ref for comparisons: the branch's configured upstream, then the
    /// conventional remote-tracking ref, then the local branch, None when
    /// nothing resolves.
    async fn comparison_ref(&self, branch: &str) -> Option<String> {
        if let Some(upstream) = GitCli::upstream_of(&self.root, branch).await {
            return Some(upstream);
        }
        let remote = format!("origin/{branch}");
        if GitCli::ref_exists(&self.root, &remote).await {
            return Some(remote);
        }
        if GitCli::ref_exists(&self.root, branch).await {
            return Some(branch.to_string());
        }
        None
    }

    /// Recent commits across all local branches within the window, newest
    /// first, deduplicated by hash (lexically-first branch wins).
    #[instrument(skip(self))]
    pub async fn recent_activity(&self, days: u32) -> Result<Vec<CommitRecord>, GitError> {
        let mut branches = GitCli::local_branches(&self.root).await?;
        branches.sort();

        let mut seen = std::collections::HashSet::new();
        let mut records = Vec::new();
        for branch in &branches {
            let commits =
                GitCli::recent_commits(&self.root, branch, days, ACTIVITY_LOG_LIMIT).await?;
            for commit in commits {
                if seen.insert(commit.hash.clone()) {
                    records.push(commit);
                }
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.hash.cmp(&b.hash)));
        Ok(records)
    }

    /// Commits that a mergeback would carry, for display before confirming
    pub async fn pending_commits(
        &self,
        target: &str,
        source: &str,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let source_ref = match self.comparison_ref(source).await {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };
        let target_ref = match self.comparison_ref(target).await {
            Some(r) => r,
            None => return Ok(Vec::new()),
        };
        GitCli::log_between(&self.root, &target_ref, &source_ref).await
    }
}

#[async_trait]
impl BranchGauge for Repository {
    async fn ahead_of(&self, source: &str, target: &str) -> Option<u64> {
        let source_ref = self.comparison_ref(source).await?;
        let target_ref = self.comparison_ref(target).await?;

        match GitCli::ahead_count(&self.root, &target_ref, &source_ref).await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(%source, %target, "Ahead-check failed, treating as inconclusive: {e}");
                None
            }
        }
    }
}

//! Git CLI wrapper for worktree, branch, and history operations.
//!
//! Uses the git CLI directly (rather than libgit2) for mutable operations
//! to ensure compatibility with sparse-checkout, hooks, and other git features.

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::GitError;

/// Field separator for machine-readable log output (ASCII unit separator,
/// which cannot appear in commit subjects or author names).
const LOG_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "%H%x1f%s%x1f%an%x1f%at";

/// Low-level git command wrapper
pub struct GitCli;

impl GitCli {
    /// Execute a git command and return stdout
    async fn run_git(args: &[&str], cwd: &Path) -> Result<String, GitError> {
        debug!(?args, ?cwd, "Running git command");

        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Command {
                command: (*args.first().unwrap_or(&"")).to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Execute a git command, returning Ok(()) on success
    async fn run_git_silent(args: &[&str], cwd: &Path) -> Result<(), GitError> {
        Self::run_git(args, cwd).await?;
        Ok(())
    }

    /// Get the current branch name, or None when HEAD is detached
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn current_branch(path: &Path) -> Result<Option<String>, GitError> {
        let name = Self::run_git(&["rev-parse", "--abbrev-ref", "HEAD"], path).await?;
        if name == "HEAD" {
            Ok(None)
        } else {
            Ok(Some(name))
        }
    }

    /// Get the root of the git repository containing `path`
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn repo_root(path: &Path) -> Result<String, GitError> {
        Self::run_git(&["rev-parse", "--show-toplevel"], path)
            .await
            .map_err(|_| GitError::NotARepository(path.display().to_string()))
    }

    /// Check if the working directory has uncommitted changes
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn is_dirty(path: &Path) -> Result<bool, GitError> {
        let output = Self::run_git(&["status", "--porcelain"], path).await?;
        Ok(!output.is_empty())
    }

    /// Fetch from remote
    #[instrument(skip_all, fields(path = %path.display(), remote))]
    pub async fn fetch(path: &Path, remote: &str) -> Result<(), GitError> {
        Self::run_git_silent(&["fetch", "--prune", remote], path).await
    }

    /// Check whether a ref (branch, remote branch, tag, ...) resolves
    #[instrument(skip_all, fields(path = %path.display(), refname))]
    pub async fn ref_exists(path: &Path, refname: &str) -> bool {
        let probe = format!("{refname}^{{commit}}");
        Self::run_git(&["rev-parse", "--verify", "--quiet", &probe], path)
            .await
            .is_ok()
    }

    /// Get the upstream tracking branch of `branch` (e.g. "origin/main"),
    /// or None when no upstream is configured
    #[instrument(skip_all, fields(path = %path.display(), branch))]
    pub async fn upstream_of(path: &Path, branch: &str) -> Option<String> {
        let spec = format!("{branch}@{{upstream}}");
        Self::run_git(&["rev-parse", "--abbrev-ref", &spec], path)
            .await
            .ok()
    }

    /// Count commits reachable from `source` but not from `target`
    #[instrument(skip_all, fields(path = %path.display(), target, source))]
    pub async fn ahead_count(path: &Path, target: &str, source: &str) -> Result<u64, GitError> {
        let range = format!("{target}..{source}");
        let out = Self::run_git(&["rev-list", "--count", &range], path).await?;
        out.parse::<u64>().map_err(|_| GitError::Command {
            command: "rev-list".to_string(),
            code: 0,
            stderr: format!("unparseable commit count: {out}"),
        })
    }

    /// Count commits on each side of a symmetric range: (behind, ahead)
    /// of `branch` relative to `other`
    #[instrument(skip_all, fields(path = %path.display(), branch, other))]
    pub async fn ahead_behind(
        path: &Path,
        branch: &str,
        other: &str,
    ) -> Result<(u64, u64), GitError> {
        let range = format!("{other}...{branch}");
        let out = Self::run_git(&["rev-list", "--left-right", "--count", &range], path).await?;
        let mut parts = out.split_whitespace();
        let behind = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let ahead = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        Ok((behind, ahead))
    }

    /// Commit log between two refs: commits on `source` missing from `target`
    #[instrument(skip_all, fields(path = %path.display(), target, source))]
    pub async fn log_between(
        path: &Path,
        target: &str,
        source: &str,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let range = format!("{target}..{source}");
        let format = format!("--format={LOG_FORMAT}");
        let out = Self::run_git(&["log", &format, &range], path).await?;
        Ok(parse_log(&out, source))
    }

    /// Recent commits on one branch within the given window
    #[instrument(skip_all, fields(path = %path.display(), branch, days))]
    pub async fn recent_commits(
        path: &Path,
        branch: &str,
        days: u32,
        limit: usize,
    ) -> Result<Vec<CommitRecord>, GitError> {
        let format = format!("--format={LOG_FORMAT}");
        let since = format!("--since={days} days ago");
        let max = format!("--max-count={limit}");
        let out = Self::run_git(&["log", &format, &since, &max, branch], path).await?;
        Ok(parse_log(&out, branch))
    }

    /// List local branch names
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn local_branches(path: &Path) -> Result<Vec<String>, GitError> {
        let out = Self::run_git(
            &["for-each-ref", "--format=%(refname:short)", "refs/heads"],
            path,
        )
        .await?;
        Ok(out.lines().map(str::to_string).collect())
    }

    /// Create a new branch from a base without checking it out
    #[instrument(skip_all, fields(path = %path.display(), branch, base))]
    pub async fn create_branch(path: &Path, branch: &str, base: &str) -> Result<(), GitError> {
        Self::run_git_silent(&["branch", branch, base], path).await
    }

    /// Switch the working tree at `path` to `branch`
    #[instrument(skip_all, fields(path = %path.display(), branch))]
    pub async fn checkout(path: &Path, branch: &str) -> Result<(), GitError> {
        Self::run_git_silent(&["checkout", branch], path).await
    }

    /// Add a worktree
    #[instrument(skip_all, fields(repo_path = %repo_path.display(), worktree_path = %worktree_path.display(), branch))]
    pub async fn add_worktree(
        repo_path: &Path,
        worktree_path: &Path,
        branch: &str,
        create_branch: bool,
        base: Option<&str>,
    ) -> Result<(), GitError> {
        let worktree_str = worktree_path.to_string_lossy();

        if create_branch {
            let base_ref = base.unwrap_or("HEAD");
            Self::run_git_silent(
                &["worktree", "add", "-b", branch, &worktree_str, base_ref],
                repo_path,
            )
            .await
        } else {
            Self::run_git_silent(&["worktree", "add", &worktree_str, branch], repo_path).await
        }
    }

    /// Remove a worktree
    #[instrument(skip_all, fields(repo_path = %repo_path.display(), worktree_path = %worktree_path.display(), force))]
    pub async fn remove_worktree(
        repo_path: &Path,
        worktree_path: &Path,
        force: bool,
    ) -> Result<(), GitError> {
        let worktree_str = worktree_path.to_string_lossy();

        if force {
            Self::run_git_silent(&["worktree", "remove", "--force", &worktree_str], repo_path).await
        } else {
            Self::run_git_silent(&["worktree", "remove", &worktree_str], repo_path).await
        }
    }

    /// Prune stale worktree metadata
    #[instrument(skip_all, fields(repo_path = %repo_path.display()))]
    pub async fn prune_worktrees(repo_path: &Path) -> Result<(), GitError> {
        Self::run_git_silent(&["worktree", "prune"], repo_path).await
    }

    /// List all worktrees attached to the repository
    #[instrument(skip_all, fields(repo_path = %repo_path.display()))]
    pub async fn list_worktrees(repo_path: &Path) -> Result<Vec<WorktreeEntry>, GitError> {
        let output = Self::run_git(&["worktree", "list", "--porcelain"], repo_path).await?;

        let mut entries = Vec::new();
        let mut current: Option<WorktreeEntry> = None;

        for line in output.lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                current = Some(WorktreeEntry {
                    path: path.to_string(),
                    branch: None,
                    head: None,
                    bare: false,
                });
            } else if let Some(head) = line.strip_prefix("HEAD ") {
                if let Some(ref mut entry) = current {
                    entry.head = Some(head.to_string());
                }
            } else if let Some(branch) = line.strip_prefix("branch ") {
                if let Some(ref mut entry) = current {
                    // refs/heads/main -> main
                    let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
                    entry.branch = Some(short.to_string());
                }
            } else if line == "bare" {
                if let Some(ref mut entry) = current {
                    entry.bare = true;
                }
            }
        }

        if let Some(entry) = current {
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Merge `source` into the branch checked out at `path` with an explicit
    /// merge commit. Conflicts are reported as `GitError::MergeConflict` and
    /// the working tree is left mid-merge for manual resolution.
    #[instrument(skip_all, fields(path = %path.display(), source))]
    pub async fn merge_no_ff(path: &Path, source: &str, message: &str) -> Result<(), GitError> {
        debug!(%source, "Running git merge --no-ff");

        let output = Command::new("git")
            .args(["merge", "--no-ff", "-m", message, source])
            .current_dir(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stdout.contains("CONFLICT") || stdout.contains("Automatic merge failed") {
            let target = Self::current_branch(path)
                .await
                .ok()
                .flatten()
                .unwrap_or_else(|| "HEAD".to_string());
            return Err(GitError::MergeConflict {
                branch: source.to_string(),
                target,
            });
        }

        Err(GitError::Command {
            command: "merge".to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: stderr.trim().to_string(),
        })
    }
}

/// One commit parsed from machine-readable log output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    pub subject: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    /// The ref the log was taken from
    pub branch: String,
}

/// Entry from `git worktree list --porcelain`
#[derive(Debug, Clone)]
pub struct WorktreeEntry {
    pub path: String,
    pub branch: Option<String>,
    pub head: Option<String>,
    pub bare: bool,
}

fn parse_log(output: &str, branch: &str) -> Vec<CommitRecord> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(LOG_SEP);
            let hash = fields.next()?.to_string();
            if hash.is_empty() {
                return None;
            }
            let subject = fields.next()?.to_string();
            let author = fields.next()?.to_string();
            let epoch: i64 = fields.next()?.trim().parse().ok()?;
            let timestamp = Utc.timestamp_opt(epoch, 0).single()?;
            Some(CommitRecord {
                hash,
                subject,
                author,
                timestamp,
                branch: branch.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_splits_fields() {
        let line = format!(
            "abc123{s}Fix login timeout{s}Jo Developer{s}1700000000",
            s = LOG_SEP
        );
        let records = parse_log(&line, "hotfix/PROJ-1");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash, "abc123");
        assert_eq!(records[0].subject, "Fix login timeout");
        assert_eq!(records[0].author, "Jo Developer");
        assert_eq!(records[0].branch, "hotfix/PROJ-1");
        assert_eq!(records[0].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parse_log_skips_blank_and_malformed_lines() {
        let text = format!("\nnot-a-record\nabc{s}subject{s}me{s}oops\n", s = LOG_SEP);
        assert!(parse_log(&text, "main").is_empty());
    }

    #[test]
    fn parse_log_keeps_separator_free_subjects_intact() {
        let line = format!(
            "deadbeef{s}Merge branch 'hotfix/PROJ-9' into preview{s}CI Bot{s}1700000001",
            s = LOG_SEP
        );
        let records = parse_log(&line, "preview");
        assert_eq!(
            records[0].subject,
            "Merge branch 'hotfix/PROJ-9' into preview"
        );
    }
}

//! `stagehand init` - scaffold the configuration and state directory.

use anyhow::{bail, Context, Result};
use std::io::Write;

use super::Workspace;
use crate::config::Config;
use crate::git::{GitCli, Repository};
use crate::worktrees::state::STATE_DIR;
use crate::worktrees::{PersistedState, WorktreeConfig, WorktreeSpec};

pub async fn run(tool_config: &Config, force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let repo = Repository::discover(&cwd, &tool_config.paths.worktree_dir).await?;

    let config_path = Workspace::config_path(repo.root());
    if config_path.exists() && !force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            config_path.display()
        );
    }

    let branch = GitCli::current_branch(repo.root())
        .await?
        .unwrap_or_else(|| "main".to_string());

    let config = WorktreeConfig::from_specs(vec![WorktreeSpec {
        name: branch.clone(),
        branch: branch.clone(),
        merge_into: None,
        description: "Mainline development".to_string(),
    }])?;
    config.save(&config_path)?;

    PersistedState::default().save(repo.root())?;
    append_git_excludes(repo.root(), &tool_config.paths.worktree_dir)?;

    println!("Wrote {}", config_path.display());
    println!("Declared worktree '{branch}' as a chain root.");
    println!("Add stages with [worktrees.<name>] tables and merge-into links,");
    println!("then run `stagehand sync` to create them.");
    Ok(())
}

/// Keep the tool's directories out of `git status` without touching the
/// user's .gitignore.
fn append_git_excludes(repo_root: &std::path::Path, worktree_dir: &str) -> Result<()> {
    let exclude_path = repo_root.join(".git").join("info").join("exclude");
    let Some(info_dir) = exclude_path.parent() else {
        return Ok(());
    };
    if !info_dir.exists() {
        // Linked worktree or unusual layout; not worth failing init over.
        return Ok(());
    }

    let existing = std::fs::read_to_string(&exclude_path).unwrap_or_default();
    let mut wanted = vec![format!("{STATE_DIR}/")];
    if !worktree_dir.starts_with("..") && !std::path::Path::new(worktree_dir).is_absolute() {
        wanted.push(format!("{}/", worktree_dir.trim_end_matches('/')));
    }

    let missing: Vec<String> = wanted
        .into_iter()
        .filter(|line| !existing.lines().any(|l| l.trim() == line))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&exclude_path)
        .context("Failed to open .git/info/exclude")?;
    for line in missing {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

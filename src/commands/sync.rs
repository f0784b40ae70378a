//! `stagehand sync` - reconcile disk state with the configuration.
//!
//! Creating a missing worktree is idempotent; pruning orphans and switching
//! branches are destructive and go through the confirmation capability.

use anyhow::{Context, Result};
use tracing::info;

use super::Workspace;
use crate::confirm::Confirmation;
use crate::git::GitCli;
use crate::worktrees::reconcile;

pub async fn run(ws: &Workspace, confirm: &dyn Confirmation, prune: bool) -> Result<()> {
    let status = reconcile::sync_status(&ws.worktrees, &ws.observed);

    if status.in_sync() {
        println!("Nothing to do; all worktrees match the configuration.");
        return Ok(());
    }

    for name in &status.missing {
        let Some(spec) = ws.worktrees.get(name) else {
            continue;
        };
        let path = ws
            .repo
            .ensure_worktree(name, &spec.branch, None)
            .await
            .with_context(|| format!("Failed to create worktree '{name}'"))?;
        println!("created  {name} -> {}", path.display());
    }

    for (name, change) in &status.branch_changes {
        let Some(wt) = ws.observed_by_name(name) else {
            continue;
        };
        let prompt = format!(
            "Switch worktree '{name}' from '{}' to '{}'?",
            change.old, change.new
        );
        if !confirm.confirm(&prompt)? {
            println!("skipped  {name} (left on '{}')", change.old);
            continue;
        }
        GitCli::checkout(&wt.path, &change.new)
            .await
            .with_context(|| format!("Failed to switch '{name}' to '{}'", change.new))?;
        println!("switched {name} -> {}", change.new);
    }

    for name in &status.orphaned {
        if !prune {
            println!("orphaned {name} (use --prune to remove)");
            continue;
        }
        let Some(wt) = ws.observed_by_name(name) else {
            continue;
        };
        let mut prompt = format!("Remove orphaned worktree '{name}' at {}?", wt.path.display());
        if wt.dirty {
            prompt = format!("{prompt} It has UNCOMMITTED changes.");
        }
        if !confirm.confirm(&prompt)? {
            println!("kept     {name}");
            continue;
        }
        ws.repo.remove_worktree(&wt.path, wt.dirty).await?;
        info!(%name, "Pruned orphaned worktree");
        println!("removed  {name}");
    }

    Ok(())
}

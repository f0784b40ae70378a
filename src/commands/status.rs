//! `stagehand status` - declared vs observed worktree state.

use anyhow::Result;

use super::Workspace;
use crate::worktrees::reconcile::{self, SyncStatus};

pub fn run(ws: &Workspace) -> Result<SyncStatus> {
    let status = reconcile::sync_status(&ws.worktrees, &ws.observed);

    if status.in_sync() {
        println!(
            "All {} configured worktree(s) in sync.",
            ws.worktrees.len()
        );
    }

    for name in &status.missing {
        let branch = ws
            .worktrees
            .get(name)
            .map(|s| s.branch.as_str())
            .unwrap_or_default();
        println!("missing   {name}  (branch {branch}) - run `stagehand sync` to create");
    }

    for name in &status.orphaned {
        println!("orphaned  {name}  - on disk but not in {}", crate::worktrees::WorktreeConfig::FILE_NAME);
    }

    for (name, change) in &status.branch_changes {
        println!(
            "branch    {name}  on '{}', configured '{}'",
            change.old, change.new
        );
    }

    for wt in &ws.observed {
        if wt.dirty {
            println!("dirty     {}  has uncommitted changes", wt.name);
        }
    }

    Ok(status)
}

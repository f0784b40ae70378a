//! `stagehand add` - create an ad hoc worktree and record its provenance.

use anyhow::{bail, Result};

use super::Workspace;

pub async fn run(
    ws: &mut Workspace,
    name: &str,
    branch: Option<&str>,
    base: Option<&str>,
) -> Result<()> {
    if ws.observed_by_name(name).is_some() {
        bail!("worktree '{name}' already exists");
    }
    if ws.worktrees.get(name).is_some() {
        bail!("'{name}' is a configured worktree; run `stagehand sync` to create it");
    }

    let branch = branch.unwrap_or(name);

    // Default base: the production end of the deployment chain, falling back
    // to HEAD for repositories with no configured chains.
    let base = match base {
        Some(b) => b.to_string(),
        None => crate::worktrees::planner::find_production_branch(&ws.tree)
            .unwrap_or_else(|| "HEAD".to_string()),
    };

    let path = ws.repo.ensure_worktree(name, branch, Some(&base)).await?;

    ws.state.record_base_branch(name, &base);
    ws.save_state()?;

    println!("Created worktree '{name}' on '{branch}' (from '{base}')");
    println!("  {}", path.display());
    Ok(())
}

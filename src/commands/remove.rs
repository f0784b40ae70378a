//! `stagehand remove` - confirmed removal of a worktree.

use anyhow::{bail, Result};

use super::Workspace;
use crate::confirm::Confirmation;

pub async fn run(ws: &mut Workspace, name: &str, confirm: &dyn Confirmation) -> Result<()> {
    let wt = match ws.observed_by_name(name) {
        Some(wt) => wt.clone(),
        None => bail!("no worktree named '{name}' exists"),
    };

    let mut prompt = format!("Remove worktree '{name}' at {}?", wt.path.display());
    if wt.dirty {
        prompt = format!("{prompt} It has UNCOMMITTED changes.");
    }
    if !confirm.confirm(&prompt)? {
        println!("Keeping '{name}'.");
        return Ok(());
    }

    ws.repo.remove_worktree(&wt.path, wt.dirty).await?;
    ws.state.forget(name);
    ws.save_state()?;

    println!("Removed worktree '{name}'.");
    Ok(())
}

//! `stagehand mergeback` - plan and execute the next pending mergeback.
//!
//! Planning walks the dependency tree (or honors an explicit source/target
//! pair, or falls back to activity detection); execution is separate and
//! confirmed. A conflicted merge is a reported outcome, not a failure: the
//! target worktree is left mid-merge for manual resolution.

use anyhow::{bail, Result};
use chrono::Utc;

use super::Workspace;
use crate::config::Config;
use crate::confirm::Confirmation;
use crate::git::MergeOutcome;
use crate::worktrees::activity;
use crate::worktrees::planner::{self, MergebackPlan};

pub async fn run(
    ws: &mut Workspace,
    tool_config: &Config,
    source: Option<&str>,
    target: Option<&str>,
    confirm: &dyn Confirmation,
) -> Result<()> {
    let plan = match resolve_plan(ws, tool_config, source, target).await? {
        Some(plan) => plan,
        None => {
            println!("No mergeback needed; every branch is level with its merge target.");
            return Ok(());
        }
    };

    let pending = ws
        .repo
        .pending_commits(&plan.target_branch, &plan.source_branch)
        .await
        .unwrap_or_default();

    println!(
        "Mergeback: '{}' ({}) -> '{}' ({})",
        plan.source_branch, plan.source_name, plan.target_branch, plan.target_name
    );
    for commit in pending.iter().take(10) {
        println!("  {}  {}", &commit.hash[..commit.hash.len().min(8)], commit.subject);
    }
    if pending.len() > 10 {
        println!("  ... and {} more", pending.len() - 10);
    }

    if !confirm.confirm("Execute this mergeback?")? {
        println!("Mergeback not executed.");
        return Ok(());
    }

    let outcome = planner::execute_mergeback(&ws.repo, &plan).await?;
    ws.state.touch_mergeback_check(Utc::now());
    ws.save_state()?;

    match outcome {
        MergeOutcome::Merged => {
            println!(
                "Merged '{}' into '{}'.",
                plan.source_branch, plan.target_branch
            );
        }
        MergeOutcome::Conflict { source, target } => {
            println!("Merge of '{source}' into '{target}' stopped on conflicts.");
            println!(
                "Resolve them in {} and commit; nothing was retried.",
                ws.repo.worktree_path(&plan.target_name).display()
            );
        }
    }
    Ok(())
}

async fn resolve_plan(
    ws: &Workspace,
    tool_config: &Config,
    source: Option<&str>,
    target: Option<&str>,
) -> Result<Option<MergebackPlan>> {
    // Explicit pair wins; both names must be configured worktrees.
    if let Some(source) = source {
        let source_spec = match ws.worktrees.get(source) {
            Some(spec) => spec,
            None => bail!("unknown worktree '{source}'"),
        };
        let target_name = match target {
            Some(t) => t.to_string(),
            None => match source_spec.merge_into.clone() {
                Some(t) => t,
                None => bail!("'{source}' has no merge-into target; pass --target"),
            },
        };
        let target_spec = match ws.worktrees.get(&target_name) {
            Some(spec) => spec,
            None => bail!("unknown worktree '{target_name}'"),
        };
        return Ok(Some(MergebackPlan {
            source_name: source_spec.name.clone(),
            source_branch: source_spec.branch.clone(),
            target_name: target_spec.name.clone(),
            target_branch: target_spec.branch.clone(),
        }));
    }

    if let Some(plan) = planner::plan_mergeback(&ws.tree, &ws.repo).await {
        return Ok(Some(plan));
    }

    // Tree walk found nothing pending; see whether recent activity points at
    // an ad hoc worktree (hotfixes created outside the configured chains).
    let records = ws
        .repo
        .recent_activity(tool_config.planner.activity_window_days)
        .await?;
    if let Some(candidate) = activity::best_candidate(&records) {
        return Ok(planner::confirm_candidate(&ws.tree, &ws.state, &candidate, &ws.repo).await);
    }

    Ok(None)
}

//! `stagehand check` - scan recent activity for a mergeback candidate.
//!
//! Read-only apart from the last-check timestamp. Finding nothing is a
//! normal answer, never an error.

use anyhow::Result;
use chrono::Utc;

use super::Workspace;
use crate::config::Config;
use crate::worktrees::activity::{self, ActivityKind};
use crate::worktrees::planner;

pub async fn run(ws: &mut Workspace, tool_config: &Config, days: Option<u32>) -> Result<()> {
    // An explicit --days wins; otherwise size the window to cover the gap
    // since the last check, within the configured cap.
    let configured = tool_config.planner.activity_window_days;
    let window = days.unwrap_or_else(|| match ws.state.last_mergeback_check {
        Some(last) => {
            let gap_days = (Utc::now() - last).num_days().max(1) as u32;
            gap_days.min(configured)
        }
        None => configured,
    });

    let records = ws.repo.recent_activity(window).await?;
    let candidate = activity::best_candidate(&records);

    match candidate {
        None => println!("No hotfix or merge activity in the last {window} day(s)."),
        Some(candidate) => {
            let kind = match candidate.kind {
                ActivityKind::Hotfix => "hotfix",
                ActivityKind::Merge => "merge",
                ActivityKind::Other => "other",
            };
            println!(
                "Latest {kind} activity on '{}' ({} by {}):",
                candidate.branch_name,
                candidate.timestamp.format("%Y-%m-%d %H:%M UTC"),
                candidate.author
            );
            println!("  {}", candidate.message);
            if let Some(key) = &candidate.issue_key {
                println!("  issue: {key}");
            }

            match planner::confirm_candidate(&ws.tree, &ws.state, &candidate, &ws.repo).await {
                Some(plan) => println!(
                    "Suggested mergeback: '{}' -> '{}' (run `stagehand mergeback`)",
                    plan.source_branch, plan.target_branch
                ),
                None => println!("No mergeback needed for it."),
            }
        }
    }

    ws.state.touch_mergeback_check(Utc::now());
    ws.save_state()?;
    Ok(())
}

//! `stagehand hotfix` - branch a hotfix worktree off the production end of
//! the deployment chain.
//!
//! The issue tracker only decorates: when it answers, the branch name gets
//! an issue-summary slug and the issue context is printed; when it does not,
//! the hotfix proceeds undecorated.

use anyhow::{bail, Result};
use tracing::warn;

use super::Workspace;
use crate::api::{IssueDetails, IssueTracker, JiraTracker};
use crate::git::GitCli;
use crate::worktrees::planner;

pub async fn run(ws: &mut Workspace, issue_key: &str) -> Result<()> {
    let production = match planner::find_production_branch(&ws.tree) {
        Some(branch) => branch,
        None => bail!("no worktrees configured; cannot locate the production branch"),
    };

    let issue = lookup_issue(issue_key).await;
    let branch = planner::hotfix_branch_name(issue_key, issue.as_ref().map(|i| i.summary.as_str()));
    let name = issue_key.to_lowercase();

    if ws.observed_by_name(&name).is_some() {
        bail!("hotfix worktree '{name}' already exists");
    }

    // Best effort: base the fix on the freshest production ref available.
    if let Err(e) = GitCli::fetch(ws.repo.root(), "origin").await {
        warn!("Fetch before hotfix failed: {e}");
    }
    let base = if GitCli::ref_exists(ws.repo.root(), &format!("origin/{production}")).await {
        format!("origin/{production}")
    } else {
        production.clone()
    };

    // Branch first, worktree second; a rerun after a partial failure skips
    // whichever step already happened.
    if !GitCli::ref_exists(ws.repo.root(), &branch).await {
        GitCli::create_branch(ws.repo.root(), &branch, &base).await?;
    }
    let path = ws.repo.ensure_worktree(&name, &branch, None).await?;

    ws.state.record_base_branch(&name, &production);
    ws.save_state()?;

    println!("Hotfix worktree '{name}' on '{branch}' (from '{base}')");
    println!("  {}", path.display());
    if let Some(issue) = issue {
        print_issue(&issue);
    }
    Ok(())
}

async fn lookup_issue(key: &str) -> Option<IssueDetails> {
    let tracker = match JiraTracker::from_env() {
        Ok(tracker) => tracker,
        Err(e) => {
            warn!("Issue tracker unavailable: {e}");
            return None;
        }
    };

    match tracker.fetch_issue(key).await {
        Ok(issue) => Some(issue),
        Err(e) if e.is_not_found() => {
            println!("note: {e}; branch name left undecorated");
            None
        }
        Err(e) => {
            warn!("Issue lookup failed: {e}");
            None
        }
    }
}

fn print_issue(issue: &IssueDetails) {
    println!();
    println!("{}: {}", issue.key, issue.summary);
    println!("  status:   {}", issue.status);
    if let Some(priority) = &issue.priority {
        println!("  priority: {priority}");
    }
    if let Some(assignee) = &issue.assignee {
        println!("  assignee: {assignee}");
    }
    if let Some(reporter) = &issue.reporter {
        println!("  reporter: {reporter}");
    }
    if let Some(due) = &issue.due_date {
        println!("  due:      {due}");
    }
    if let Some(epic) = &issue.epic {
        println!("  epic:     {epic}");
    }
    if let Some(comment) = &issue.latest_comment {
        println!("  latest comment: {comment}");
    }
}

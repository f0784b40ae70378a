//! `stagehand list` - the declared deployment chains, annotated with
//! ahead/behind counts along each merge-into edge.

use anyhow::Result;

use super::Workspace;
use crate::git::GitCli;
use crate::worktrees::tree::NodeId;

pub async fn run(ws: &Workspace) -> Result<()> {
    if ws.tree.is_empty() {
        println!("No worktrees configured.");
        return Ok(());
    }

    for &root in ws.tree.roots() {
        print_subtree(ws, root, 0).await;
    }
    Ok(())
}

/// Iterative pre-order walk; recursion over async fns would need boxing for
/// no benefit at these depths.
async fn print_subtree(ws: &Workspace, root: NodeId, base_depth: usize) {
    let mut stack = vec![(root, base_depth)];
    while let Some((id, depth)) = stack.pop() {
        print_node(ws, id, depth).await;
        // Push in reverse so lexically-first children print first.
        for &child in ws.tree.children(id).iter().rev() {
            stack.push((child, depth + 1));
        }
    }
}

async fn print_node(ws: &Workspace, id: NodeId, depth: usize) {
    let node = ws.tree.node(id);
    let indent = "  ".repeat(depth);
    let arrow = if depth == 0 { "" } else { "<- " };

    let on_disk = match ws.observed_by_name(node.name()) {
        Some(wt) if wt.dirty => " [dirty]",
        Some(_) => "",
        None => " [missing]",
    };

    let drift = match ws.tree.parent(id) {
        Some(parent) => {
            let parent_branch = ws.tree.node(parent).branch();
            match GitCli::ahead_behind(ws.repo.root(), node.branch(), parent_branch).await {
                Ok((0, 0)) => String::new(),
                Ok((behind, ahead)) => format!(" ({ahead} ahead, {behind} behind)"),
                // Branches that do not exist yet have nothing to report.
                Err(_) => String::new(),
            }
        }
        None => String::new(),
    };

    let description = node.spec().description.as_str();
    let description = if description.is_empty() {
        String::new()
    } else {
        format!("  - {description}")
    };

    println!(
        "{indent}{arrow}{} (branch {}){drift}{on_disk}{description}",
        node.name(),
        node.branch()
    );
}

//! Mergeback and hotfix planning over the dependency tree.
//!
//! Planning is read-only: it walks the tree and asks the version-control
//! facade directed ahead-questions, producing a suggestion for the user to
//! confirm. Execution is a separate step with observable, re-runnable
//! effects (worktree creation detects existing state; a conflicted merge is
//! surfaced, never retried).

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::activity::RecentActivity;
use super::state::PersistedState;
use super::tree::{DependencyTree, NodeId};
use crate::git::{BranchGauge, GitCli, GitError, MergeOutcome, Repository};

/// Branch names treated as production hints when several roots compete.
const PRODUCTION_NAME_HINTS: &[&str] = &["prod", "production", "master", "main", "release"];

static SLUG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern"));

/// A planned mergeback: which branch merges into which, with the worktree
/// names on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergebackPlan {
    pub source_name: String,
    pub source_branch: String,
    pub target_name: String,
    pub target_branch: String,
}

impl MergebackPlan {
    fn from_edge(tree: &DependencyTree, source: NodeId, target: NodeId) -> Self {
        Self {
            source_name: tree.node(source).name().to_string(),
            source_branch: tree.node(source).branch().to_string(),
            target_name: tree.node(target).name().to_string(),
            target_branch: tree.node(target).branch().to_string(),
        }
    }

    /// Merge commit message for executing this plan
    pub fn merge_message(&self) -> String {
        format!(
            "Merge back '{}' into '{}'",
            self.source_branch, self.target_branch
        )
    }
}

/// The node hotfixes branch from: the production end of the deployment
/// chain. A chain head that merges into another worktree but is targeted by
/// none qualifies directly; in a forest of bare roots the fallback prefers
/// a root whose branch name matches a production naming convention.
pub fn find_production_node(tree: &DependencyTree) -> Option<NodeId> {
    for head in tree.chain_heads() {
        if tree.parent(head).is_some() {
            return Some(head);
        }
    }

    let roots = tree.roots();
    if roots.is_empty() {
        return None;
    }

    roots
        .iter()
        .copied()
        .find(|&root| {
            let branch = tree.node(root).branch().to_lowercase();
            PRODUCTION_NAME_HINTS.contains(&branch.as_str())
        })
        .or_else(|| roots.first().copied())
}

/// Convenience wrapper returning the production branch name.
pub fn find_production_branch(tree: &DependencyTree) -> Option<String> {
    find_production_node(tree).map(|id| tree.node(id).branch().to_string())
}

/// Select the next mergeback the tree needs.
///
/// Starting from the chain heads, each candidate's branch is compared
/// against its parent's; the first (in deterministic tree order) that is
/// ahead yields the plan. When no candidate at the current level is ahead,
/// the walk climbs one level toward the roots: a lower-priority merge may
/// already be satisfied while an upper one is pending. An undetermined
/// ahead-count counts as "not ahead" rather than aborting.
pub async fn plan_mergeback<G: BranchGauge + Sync>(
    tree: &DependencyTree,
    gauge: &G,
) -> Option<MergebackPlan> {
    let mut frontier = tree.chain_heads();

    // Natural bound is tree depth; the explicit cap guards against any
    // construction defect.
    let max_rounds = tree.len() + 1;

    for round in 0..max_rounds {
        if frontier.is_empty() {
            break;
        }

        for &node in &frontier {
            let Some(parent) = tree.parent(node) else {
                continue;
            };
            let source = tree.node(node);
            let target = tree.node(parent);

            match gauge.ahead_of(source.branch(), target.branch()).await {
                Some(count) if count > 0 => {
                    info!(
                        source = source.branch(),
                        target = target.branch(),
                        count,
                        "Mergeback needed"
                    );
                    return Some(MergebackPlan::from_edge(tree, node, parent));
                }
                Some(_) => {
                    debug!(
                        source = source.branch(),
                        target = target.branch(),
                        "Already level"
                    );
                }
                None => {
                    debug!(
                        source = source.branch(),
                        target = target.branch(),
                        round,
                        "Ahead-check inconclusive, treating as not ahead"
                    );
                }
            }
        }

        // Climb: deduplicated parents of the current frontier, in first-seen
        // order, which stays deterministic because the frontier is.
        let mut next = Vec::new();
        for &node in &frontier {
            if let Some(parent) = tree.parent(node) {
                if !next.contains(&parent) {
                    next.push(parent);
                }
            }
        }
        frontier = next;
    }

    None
}

/// Cross-check an activity-derived candidate before proposing it.
///
/// The candidate worktree is mapped onto the tree (or onto its recorded
/// creation-base branch for ad hoc worktrees) and accepted only when its
/// branch is actually ahead of the target, so a stale suggestion never
/// becomes a no-op merge proposal.
pub async fn confirm_candidate<G: BranchGauge + Sync>(
    tree: &DependencyTree,
    state: &PersistedState,
    candidate: &RecentActivity,
    gauge: &G,
) -> Option<MergebackPlan> {
    if let Some(node) = tree.get(&candidate.worktree_name) {
        let parent = tree.parent(node)?;
        let source = tree.node(node);
        let target = tree.node(parent);
        let ahead = gauge.ahead_of(source.branch(), target.branch()).await?;
        if ahead == 0 {
            debug!(
                worktree = candidate.worktree_name,
                "Candidate not ahead of its merge target, dropping"
            );
            return None;
        }
        return Some(MergebackPlan::from_edge(tree, node, parent));
    }

    // Ad hoc worktree: merge back into the branch it was created from.
    let base = state.base_branch(&candidate.worktree_name)?;
    let ahead = gauge.ahead_of(&candidate.branch_name, base).await?;
    if ahead == 0 {
        return None;
    }

    // When a configured worktree owns the base branch, report its name.
    let target_name = (0..tree.len())
        .find(|&id| tree.node(id).branch() == base)
        .map_or_else(|| base.to_string(), |id| tree.node(id).name().to_string());

    Some(MergebackPlan {
        source_name: candidate.worktree_name.clone(),
        source_branch: candidate.branch_name.clone(),
        target_name,
        target_branch: base.to_string(),
    })
}

/// Execute a plan: make sure the target worktree exists, put it on the
/// target branch, merge with an explicit merge commit. Conflicts come back
/// as a distinct outcome and the worktree is left mid-merge for manual
/// resolution.
pub async fn execute_mergeback(
    repo: &Repository,
    plan: &MergebackPlan,
) -> Result<MergeOutcome, GitError> {
    let target_path = repo
        .ensure_worktree(&plan.target_name, &plan.target_branch, None)
        .await?;

    let current = GitCli::current_branch(&target_path).await?;
    if current.as_deref() != Some(plan.target_branch.as_str()) {
        warn!(
            worktree = plan.target_name,
            expected = plan.target_branch,
            "Target worktree on unexpected branch, switching"
        );
        GitCli::checkout(&target_path, &plan.target_branch).await?;
    }

    repo.merge_into(&target_path, &plan.source_branch, &plan.merge_message())
        .await
}

/// Branch name for a hotfix worktree: `hotfix/<KEY>` decorated with a slug
/// of the issue summary when the tracker supplied one.
pub fn hotfix_branch_name(issue_key: &str, summary: Option<&str>) -> String {
    match summary.map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => format!("hotfix/{issue_key}-{slug}"),
        None => format!("hotfix/{issue_key}"),
    }
}

fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = SLUG_STRIP.replace_all(&lowered, "-");
    let trimmed = slug.trim_matches('-');

    // Keep branch names readable; cut at a word boundary where possible.
    const MAX_SLUG: usize = 40;
    if trimmed.len() <= MAX_SLUG {
        return trimmed.to_string();
    }
    let cut = trimmed[..MAX_SLUG]
        .rfind('-')
        .unwrap_or(MAX_SLUG);
    trimmed[..cut].trim_matches('-').to_string()
}

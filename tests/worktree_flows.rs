//! Integration tests for the git facade, reconciliation, and the mergeback
//! planner against real throwaway repositories.
//!
//! Every test builds its own repository in a temp directory, so no
//! environment setup is required and nothing touches the checkout the tests
//! run from.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use stagehand::git::{BranchGauge, GitCli, MergeOutcome, Repository};
use stagehand::worktrees::activity;
use stagehand::worktrees::planner;
use stagehand::worktrees::reconcile;
use stagehand::worktrees::spec::{WorktreeConfig, WorktreeSpec};
use stagehand::worktrees::tree::DependencyTree;
use stagehand::worktrees::PersistedState;

// ─── Repository Fixtures ─────────────────────────────────────────────────────

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test Author")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_file(dir: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-m", message]);
}

/// A repository with the main -> preview -> production deployment chain:
/// three branches, all starting level.
fn chain_repo() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();

    git(&root, &["init"]);
    git(&root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    commit_file(&root, "README.md", "deployment chain demo\n", "Initial commit");
    git(&root, &["branch", "preview"]);
    git(&root, &["branch", "production"]);

    (temp, root)
}

fn chain_config() -> WorktreeConfig {
    let spec = |name: &str, merge_into: Option<&str>| WorktreeSpec {
        name: name.to_string(),
        branch: name.to_string(),
        merge_into: merge_into.map(str::to_string),
        description: String::new(),
    };
    WorktreeConfig::from_specs(vec![
        spec("main", None),
        spec("preview", Some("main")),
        spec("production", Some("preview")),
    ])
    .unwrap()
}

async fn open_repo(root: &Path) -> Repository {
    Repository::discover(root, ".worktrees").await.unwrap()
}

// ─── Facade & Reconciliation ─────────────────────────────────────────────────

#[tokio::test]
async fn observe_reports_missing_then_in_sync_after_creation() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();

    // The primary checkout sits on main and stands in for that stage;
    // preview and production have no worktree yet.
    let observed = repo.observe_worktrees(&config).await.unwrap();
    let status = reconcile::sync_status(&config, &observed);
    assert_eq!(
        status.missing.iter().collect::<Vec<_>>(),
        vec![&"preview".to_string(), &"production".to_string()]
    );
    assert!(!status.in_sync());

    for spec in config.iter() {
        repo.ensure_worktree(&spec.name, &spec.branch, None)
            .await
            .unwrap();
    }

    let observed = repo.observe_worktrees(&config).await.unwrap();
    let status = reconcile::sync_status(&config, &observed);
    assert!(status.in_sync(), "unexpected status: {status:?}");

    let production = observed.iter().find(|wt| wt.name == "production").unwrap();
    assert_eq!(production.current_branch.as_deref(), Some("production"));
    assert_eq!(production.expected_branch.as_deref(), Some("production"));
    assert!(!production.dirty);
}

#[tokio::test]
async fn ensure_worktree_is_idempotent() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;

    let first = repo.ensure_worktree("preview", "preview", None).await.unwrap();
    let second = repo.ensure_worktree("preview", "preview", None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn ensure_worktree_rejects_unknown_branch_without_base() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;

    let err = repo
        .ensure_worktree("fix", "no-such-branch", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no-such-branch"));
}

#[tokio::test]
async fn dirty_worktrees_are_observed_as_dirty() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();

    let path = repo.ensure_worktree("preview", "preview", None).await.unwrap();
    std::fs::write(path.join("scratch.txt"), "uncommitted\n").unwrap();

    let observed = repo.observe_worktrees(&config).await.unwrap();
    let preview = observed.iter().find(|wt| wt.name == "preview").unwrap();
    assert!(preview.dirty);
}

#[tokio::test]
async fn removing_a_worktree_makes_it_missing_again() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();

    let path = repo.ensure_worktree("preview", "preview", None).await.unwrap();
    repo.remove_worktree(&path, false).await.unwrap();

    let observed = repo.observe_worktrees(&config).await.unwrap();
    let status = reconcile::sync_status(&config, &observed);
    assert!(status.missing.contains("preview"));
}

#[tokio::test]
async fn branch_switch_is_observed_as_a_branch_change() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();

    let path = repo.ensure_worktree("preview", "preview", None).await.unwrap();
    git(&path, &["checkout", "-b", "experiment"]);

    let observed = repo.observe_worktrees(&config).await.unwrap();
    let status = reconcile::sync_status(&config, &observed);
    let change = status.branch_changes.get("preview").unwrap();
    assert_eq!(change.old, "experiment");
    assert_eq!(change.new, "preview");
}

// ─── Mergeback Planning & Execution ──────────────────────────────────────────

#[tokio::test]
async fn mergeback_walks_the_chain_level_by_level() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();
    let tree = DependencyTree::build(&config).unwrap();

    // Hotfix lands on production only.
    let prod_path = repo
        .ensure_worktree("production", "production", None)
        .await
        .unwrap();
    commit_file(&prod_path, "fix.txt", "hotfix\n", "Fix outage");

    let plan = planner::plan_mergeback(&tree, &repo).await.unwrap();
    assert_eq!(plan.source_branch, "production");
    assert_eq!(plan.target_branch, "preview");

    let outcome = planner::execute_mergeback(&repo, &plan).await.unwrap();
    assert_eq!(outcome, MergeOutcome::Merged);

    // Production is level now; the same walk finds preview -> main.
    let plan = planner::plan_mergeback(&tree, &repo).await.unwrap();
    assert_eq!(plan.source_branch, "preview");
    assert_eq!(plan.target_branch, "main");

    let outcome = planner::execute_mergeback(&repo, &plan).await.unwrap();
    assert_eq!(outcome, MergeOutcome::Merged);

    assert!(planner::plan_mergeback(&tree, &repo).await.is_none());

    // The fix is reachable from main after both merges.
    let count = GitCli::ahead_count(&root, "main", "production").await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn conflicting_mergeback_surfaces_as_a_conflict_outcome() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();
    let tree = DependencyTree::build(&config).unwrap();

    let prod_path = repo
        .ensure_worktree("production", "production", None)
        .await
        .unwrap();
    commit_file(&prod_path, "config.txt", "timeout = 5\n", "Raise timeout");

    let preview_path = repo
        .ensure_worktree("preview", "preview", None)
        .await
        .unwrap();
    commit_file(&preview_path, "config.txt", "timeout = 30\n", "Tune timeout");

    let plan = planner::plan_mergeback(&tree, &repo).await.unwrap();
    assert_eq!(plan.source_branch, "production");

    let outcome = planner::execute_mergeback(&repo, &plan).await.unwrap();
    assert!(matches!(outcome, MergeOutcome::Conflict { .. }));

    // The worktree is left mid-merge for manual resolution.
    assert!(GitCli::is_dirty(&preview_path).await.unwrap());
}

#[tokio::test]
async fn planner_prefers_remote_refs_in_a_clone() {
    let (_temp, origin_root) = chain_repo();

    // Commit on production in the origin repository.
    git(&origin_root, &["checkout", "production"]);
    commit_file(&origin_root, "fix.txt", "hotfix\n", "Fix outage");
    git(&origin_root, &["checkout", "main"]);

    let clone_temp = TempDir::new().unwrap();
    let clone_root = clone_temp.path().join("clone");
    git(
        clone_temp.path(),
        &[
            "clone",
            origin_root.to_str().unwrap(),
            clone_root.to_str().unwrap(),
        ],
    );

    // The clone has no local preview/production branches; the ahead-check
    // runs entirely on origin/* refs.
    let repo = open_repo(&clone_root).await;
    let tree = DependencyTree::build(&chain_config()).unwrap();

    let plan = planner::plan_mergeback(&tree, &repo).await.unwrap();
    assert_eq!(plan.source_branch, "production");
    assert_eq!(plan.target_branch, "preview");
}

#[tokio::test]
async fn gauge_is_inconclusive_for_unknown_branches() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;

    assert_eq!(repo.ahead_of("no-such", "main").await, None);
    assert_eq!(repo.ahead_of("production", "main").await, Some(0));
}

// ─── Activity Detection ──────────────────────────────────────────────────────

#[tokio::test]
async fn hotfix_activity_is_detected_and_mapped_to_a_mergeback() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;
    let config = chain_config();
    let tree = DependencyTree::build(&config).unwrap();

    // Ad hoc hotfix branch off production, the way the hotfix command
    // creates them.
    let fix_path = repo
        .ensure_worktree("proj-42", "hotfix/PROJ-42-login", Some("production"))
        .await
        .unwrap();
    commit_file(&fix_path, "login.txt", "fixed\n", "Fix login timeout");

    let records = repo.recent_activity(7).await.unwrap();
    let candidate = activity::best_candidate(&records).unwrap();
    assert_eq!(candidate.kind, activity::ActivityKind::Hotfix);
    assert_eq!(candidate.issue_key.as_deref(), Some("PROJ-42"));
    assert_eq!(candidate.worktree_name, "proj-42");

    let mut state = PersistedState::default();
    state.record_base_branch("proj-42", "production");

    let plan = planner::confirm_candidate(&tree, &state, &candidate, &repo)
        .await
        .unwrap();
    assert_eq!(plan.source_branch, "hotfix/PROJ-42-login");
    assert_eq!(plan.target_branch, "production");
    assert_eq!(plan.target_name, "production");
}

#[tokio::test]
async fn quiet_history_yields_no_candidate() {
    let (_temp, root) = chain_repo();
    let repo = open_repo(&root).await;

    let records = repo.recent_activity(7).await.unwrap();
    assert!(activity::best_candidate(&records).is_none());
}

// ─── Persisted State ─────────────────────────────────────────────────────────

#[tokio::test]
async fn state_survives_across_invocations_in_a_repo() {
    let (_temp, root) = chain_repo();

    let mut state = PersistedState::load(&root).unwrap();
    assert_eq!(state, PersistedState::default());

    state.record_base_branch("proj-42", "production");
    state.save(&root).unwrap();

    let reloaded = PersistedState::load(&root).unwrap();
    assert_eq!(reloaded.base_branch("proj-42"), Some("production"));
}

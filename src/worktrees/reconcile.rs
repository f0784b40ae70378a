//! Reconciliation of declared configuration against observed state.
//!
//! `sync_status` is a pure function of its inputs: no git calls, no hidden
//! state. Observed worktrees are captured beforehand by the facade; this
//! module only diffs.

use std::collections::{BTreeMap, BTreeSet};

use super::observe::ObservedWorktree;
use super::spec::WorktreeConfig;

/// A worktree sitting on a different branch than the configuration declares.
/// `new` is what sync would switch the worktree to, not chronological order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchChange {
    pub old: String,
    pub new: String,
}

/// The diff between declared and observed worktrees.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncStatus {
    /// Configured names with no worktree on disk
    pub missing: BTreeSet<String>,
    /// On-disk worktrees absent from the configuration
    pub orphaned: BTreeSet<String>,
    /// Names present in both whose current branch differs from the
    /// configured branch
    pub branch_changes: BTreeMap<String, BranchChange>,
}

impl SyncStatus {
    pub fn in_sync(&self) -> bool {
        self.missing.is_empty() && self.orphaned.is_empty() && self.branch_changes.is_empty()
    }
}

/// Diff the declared configuration against observed worktree state.
pub fn sync_status(config: &WorktreeConfig, observed: &[ObservedWorktree]) -> SyncStatus {
    let observed_by_name: BTreeMap<&str, &ObservedWorktree> = observed
        .iter()
        .map(|wt| (wt.name.as_str(), wt))
        .collect();

    let mut status = SyncStatus::default();

    for spec in config.iter() {
        match observed_by_name.get(spec.name.as_str()) {
            None => {
                status.missing.insert(spec.name.clone());
            }
            Some(wt) => {
                let current = wt.branch_label();
                if current != spec.branch {
                    status.branch_changes.insert(
                        spec.name.clone(),
                        BranchChange {
                            old: current.to_string(),
                            new: spec.branch.clone(),
                        },
                    );
                }
            }
        }
    }

    for wt in observed {
        if config.get(&wt.name).is_none() {
            status.orphaned.insert(wt.name.clone());
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worktrees::spec::WorktreeSpec;
    use std::path::PathBuf;

    fn config(entries: &[(&str, &str, Option<&str>)]) -> WorktreeConfig {
        let specs = entries
            .iter()
            .map(|(name, branch, merge_into)| WorktreeSpec {
                name: (*name).to_string(),
                branch: (*branch).to_string(),
                merge_into: merge_into.map(str::to_string),
                description: String::new(),
            })
            .collect();
        WorktreeConfig::from_specs(specs).unwrap()
    }

    fn observed(name: &str, branch: &str) -> ObservedWorktree {
        ObservedWorktree {
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{name}")),
            current_branch: Some(branch.to_string()),
            expected_branch: None,
            dirty: false,
        }
    }

    #[test]
    fn everything_matching_is_in_sync() {
        let config = config(&[("a", "main", None), ("b", "preview", Some("a"))]);
        let observed = vec![observed("a", "main"), observed("b", "preview")];

        let status = sync_status(&config, &observed);
        assert!(status.in_sync());
    }

    #[test]
    fn configured_but_absent_is_missing() {
        let config = config(&[
            ("a", "main", None),
            ("b", "preview", Some("a")),
            ("c", "production", Some("b")),
        ]);
        let observed = vec![observed("a", "main"), observed("b", "preview")];

        let status = sync_status(&config, &observed);
        assert_eq!(
            status.missing.iter().collect::<Vec<_>>(),
            vec![&"c".to_string()]
        );
        assert!(status.orphaned.is_empty());
        assert!(status.branch_changes.is_empty());
        assert!(!status.in_sync());
    }

    #[test]
    fn on_disk_but_undeclared_is_orphaned() {
        let config = config(&[("a", "main", None)]);
        let observed = vec![observed("a", "main"), observed("stray", "whatever")];

        let status = sync_status(&config, &observed);
        assert!(status.orphaned.contains("stray"));
        assert!(status.missing.is_empty());
    }

    #[test]
    fn branch_mismatch_records_old_and_new() {
        let config = config(&[("a", "main", None)]);
        let observed = vec![observed("a", "develop")];

        let status = sync_status(&config, &observed);
        let change = status.branch_changes.get("a").unwrap();
        assert_eq!(change.old, "develop");
        assert_eq!(change.new, "main");
        assert!(!status.in_sync());
    }

    #[test]
    fn detached_head_counts_as_a_branch_change() {
        let config = config(&[("a", "main", None)]);
        let mut wt = observed("a", "main");
        wt.current_branch = None;

        let status = sync_status(&config, &[wt]);
        assert_eq!(status.branch_changes.get("a").unwrap().old, "(detached)");
    }

    #[test]
    fn identical_inputs_yield_identical_output() {
        let config = config(&[("a", "main", None), ("b", "preview", Some("a"))]);
        let observed = vec![observed("a", "other"), observed("z", "stray")];

        let first = sync_status(&config, &observed);
        let second = sync_status(&config, &observed);
        assert_eq!(first, second);
    }
}

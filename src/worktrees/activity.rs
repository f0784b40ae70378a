//! Activity classification over recent commit history.
//!
//! Scans a window of per-branch commits for hotfix/merge conventions to
//! infer which worktree most plausibly needs a mergeback. Output feeds a
//! human-confirmed suggestion, so absence of matches is a normal result,
//! never an error; only the underlying git query can fail.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::git::CommitRecord;

static HOTFIX_BRANCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(^|/)hotfix[-/_]").expect("hotfix branch pattern"));
static HOTFIX_SUBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bhotfix\b").expect("hotfix subject pattern"));
static MERGE_SUBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^merge\b|\bmergeback\b").expect("merge subject pattern"));
static ISSUE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+-[0-9]+\b").expect("issue key pattern"));

/// How a commit was classified. Hotfix outranks merge when ranking
/// candidates; everything else is noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActivityKind {
    Hotfix,
    Merge,
    Other,
}

/// One mergeback candidate inferred from commit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentActivity {
    pub worktree_name: String,
    pub branch_name: String,
    pub kind: ActivityKind,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub issue_key: Option<String>,
}

fn classify_kind(record: &CommitRecord) -> ActivityKind {
    if HOTFIX_BRANCH.is_match(&record.branch) || HOTFIX_SUBJECT.is_match(&record.subject) {
        ActivityKind::Hotfix
    } else if MERGE_SUBJECT.is_match(&record.subject) {
        ActivityKind::Merge
    } else {
        ActivityKind::Other
    }
}

/// First issue key appearing in the branch name or subject, branch first.
fn extract_issue_key(record: &CommitRecord) -> Option<String> {
    ISSUE_KEY
        .find(&record.branch)
        .or_else(|| ISSUE_KEY.find(&record.subject))
        .map(|m| m.as_str().to_string())
}

/// Worktree name a branch maps onto: the issue key (lowercased, matching
/// the hotfix creation path) when one is present, the sanitized branch name
/// otherwise.
fn worktree_name_for(record: &CommitRecord, issue_key: Option<&str>) -> String {
    match issue_key {
        Some(key) => key.to_lowercase(),
        None => record.branch.replace('/', "-"),
    }
}

/// Keep commits matching hotfix/merge conventions as candidates.
pub fn classify(records: &[CommitRecord]) -> Vec<RecentActivity> {
    records
        .iter()
        .filter_map(|record| {
            let kind = classify_kind(record);
            if kind == ActivityKind::Other {
                return None;
            }
            let issue_key = extract_issue_key(record);
            Some(RecentActivity {
                worktree_name: worktree_name_for(record, issue_key.as_deref()),
                branch_name: record.branch.clone(),
                kind,
                message: record.subject.clone(),
                author: record.author.clone(),
                timestamp: record.timestamp,
                issue_key,
            })
        })
        .collect()
}

/// The single best mergeback candidate: hotfix outranks merge, newer
/// outranks older within a kind, branch name breaks remaining ties.
pub fn best_candidate(records: &[CommitRecord]) -> Option<RecentActivity> {
    let mut candidates = classify(records);
    candidates.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then(b.timestamp.cmp(&a.timestamp))
            .then(a.branch_name.cmp(&b.branch_name))
    });
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn commit(branch: &str, subject: &str, age_hours: i64) -> CommitRecord {
        CommitRecord {
            hash: format!("{branch}-{age_hours}"),
            subject: subject.to_string(),
            author: "Jo Developer".to_string(),
            timestamp: Utc::now() - Duration::hours(age_hours),
            branch: branch.to_string(),
        }
    }

    #[test]
    fn hotfix_branch_classifies_as_hotfix() {
        let records = [commit("hotfix/PROJ-12-login", "Fix login timeout", 1)];
        let candidates = classify(&records);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].kind, ActivityKind::Hotfix);
        assert_eq!(candidates[0].issue_key.as_deref(), Some("PROJ-12"));
        assert_eq!(candidates[0].worktree_name, "proj-12");
    }

    #[test]
    fn merge_subject_classifies_as_merge() {
        let records = [commit("preview", "Merge branch 'production' into preview", 1)];
        let candidates = classify(&records);
        assert_eq!(candidates[0].kind, ActivityKind::Merge);
    }

    #[test]
    fn unrelated_commits_are_dropped() {
        let records = [commit("feature/new-ui", "Add settings page", 1)];
        assert!(classify(&records).is_empty());
        assert!(best_candidate(&records).is_none());
    }

    #[test]
    fn hotfix_and_merge_both_present_selects_hotfix() {
        // Hotfix at T-1h, merge at T-2h: type priority before recency
        let records = [
            commit("preview", "Merge branch 'hotfix/PROJ-7'", 2),
            commit("hotfix/PROJ-7-crash", "PROJ-7 fix crash on boot", 1),
        ];
        let best = best_candidate(&records).unwrap();
        assert_eq!(best.kind, ActivityKind::Hotfix);
        assert_eq!(best.branch_name, "hotfix/PROJ-7-crash");
    }

    #[test]
    fn hotfix_outranks_merge_even_when_older() {
        let records = [
            commit("preview", "Merge branch 'production'", 1),
            commit("hotfix/PROJ-9-leak", "Plug connection leak", 5),
        ];
        let best = best_candidate(&records).unwrap();
        assert_eq!(best.kind, ActivityKind::Hotfix);
    }

    #[test]
    fn newer_wins_within_the_same_kind() {
        let records = [
            commit("hotfix/PROJ-1-old", "old fix", 10),
            commit("hotfix/PROJ-2-new", "new fix", 1),
        ];
        let best = best_candidate(&records).unwrap();
        assert_eq!(best.branch_name, "hotfix/PROJ-2-new");
    }

    #[test]
    fn first_issue_key_wins_when_several_appear() {
        let records = [commit(
            "hotfix/PROJ-3-port",
            "PROJ-4 ported on top of PROJ-5",
            1,
        )];
        let best = best_candidate(&records).unwrap();
        assert_eq!(best.issue_key.as_deref(), Some("PROJ-3"));
    }

    #[test]
    fn branch_without_issue_key_sanitizes_into_a_worktree_name() {
        let records = [commit("hotfix/urgent-rollback", "roll back deploy", 1)];
        let best = best_candidate(&records).unwrap();
        assert_eq!(best.worktree_name, "hotfix-urgent-rollback");
    }
}

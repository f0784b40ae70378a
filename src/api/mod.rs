//! Issue tracker integration.
//!
//! Used only to decorate generated branch names and informational output;
//! tracker failures degrade to undecorated output and never gate the core
//! worktree logic.

pub mod error;
pub mod jira;

pub use error::ApiError;
pub use jira::{IssueDetails, IssueTracker, JiraTracker};

//! The worktree orchestration core.
//!
//! Everything in this module is rebuilt from the repository and the declared
//! configuration on every invocation; the only cross-invocation state is
//! [`state::PersistedState`].

pub mod activity;
pub mod observe;
pub mod planner;
pub mod reconcile;
pub mod spec;
pub mod state;
pub mod tree;

pub use spec::{ConfigError, WorktreeConfig, WorktreeSpec};
pub use state::{PersistedState, StateError};

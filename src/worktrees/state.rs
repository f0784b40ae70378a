//! Persisted provenance state.
//!
//! The only state that survives across invocations: which branch each
//! ad hoc worktree was created from, and when mergeback activity was last
//! checked. Lives at `.stagehand/state.json` inside the repository root.
//!
//! Saves use the write-to-temp-then-rename pattern so a crash mid-write
//! never leaves a half-written file observable by the next load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the tool-private subdirectory at the repository root
pub const STATE_DIR: &str = ".stagehand";
const STATE_FILE: &str = "state.json";

#[derive(Error, Debug)]
pub enum StateError {
    #[error("state file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to access state at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Creation-base branch per ad hoc worktree, recorded by the add and
    /// hotfix paths. Worktrees created outside the tool have no entry.
    #[serde(default)]
    pub base_branches: BTreeMap<String, String>,

    /// When mergeback activity was last scanned
    #[serde(default)]
    pub last_mergeback_check: Option<DateTime<Utc>>,
}

impl PersistedState {
    fn file_path(dir: &Path) -> PathBuf {
        dir.join(STATE_DIR).join(STATE_FILE)
    }

    /// Load state from the tool directory under `dir`.
    ///
    /// An absent file is a normal first run and yields the default state;
    /// a present-but-unreadable file is an error.
    pub fn load(dir: &Path) -> Result<Self, StateError> {
        let path = Self::file_path(dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No state file, starting fresh");
                return Ok(Self::default());
            }
            Err(source) => return Err(StateError::Io { path, source }),
        };

        serde_json::from_str(&text).map_err(|source| StateError::Corrupt { path, source })
    }

    /// Save state atomically under `dir`.
    pub fn save(&self, dir: &Path) -> Result<(), StateError> {
        let path = Self::file_path(dir);
        let io_err = |source| StateError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents = serde_json::to_string_pretty(self).map_err(|source| StateError::Corrupt {
            path: path.clone(),
            source,
        })?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, contents).map_err(io_err)?;
        std::fs::rename(&tmp_path, &path).map_err(io_err)?;
        debug!(path = %path.display(), "State saved");
        Ok(())
    }

    /// Base branch a worktree was created from. Absence is normal for
    /// worktrees not created through the tool's add path.
    pub fn base_branch(&self, name: &str) -> Option<&str> {
        self.base_branches.get(name).map(String::as_str)
    }

    pub fn record_base_branch(&mut self, name: &str, base: &str) {
        self.base_branches
            .insert(name.to_string(), base.to_string());
    }

    pub fn forget(&mut self, name: &str) {
        self.base_branches.remove(name);
    }

    pub fn touch_mergeback_check(&mut self, at: DateTime<Utc>) {
        self.last_mergeback_check = Some(at);
    }
}

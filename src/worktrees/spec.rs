//! The declarative worktree configuration.
//!
//! `worktrees.toml` at the repository root maps worktree names to branch,
//! optional merge-into target, and description:
//!
//! ```toml
//! [worktrees.main]
//! branch = "main"
//! description = "Mainline development"
//!
//! [worktrees.production]
//! branch = "production"
//! merge-into = "main"
//! description = "Live deployment"
//! ```
//!
//! Parsing has no side effects. Entries are kept lexically sorted by name so
//! every downstream traversal is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by configuration parsing and tree construction.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed worktree configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize worktree configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("duplicate worktree name '{0}'")]
    DuplicateName(String),

    #[error("worktree '{0}' has an empty branch")]
    EmptyBranch(String),

    #[error("worktree '{name}' merges into unknown worktree '{target}'")]
    UnknownMergeTarget { name: String, target: String },

    #[error("merge-into relation contains a cycle through '{0}'")]
    MergeCycle(String),
}

/// One declared worktree: a named deployment stage pinned to a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeSpec {
    pub name: String,
    pub branch: String,
    /// Name of the worktree this one's branch merges back into, None for a
    /// chain root.
    pub merge_into: Option<String>,
    pub description: String,
}

/// The full declared configuration, keyed and ordered by worktree name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorktreeConfig {
    specs: BTreeMap<String, WorktreeSpec>,
}

/// On-disk shape of one `[worktrees.<name>]` table.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryDoc {
    branch: String,
    #[serde(rename = "merge-into", skip_serializing_if = "Option::is_none")]
    merge_into: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigDoc {
    #[serde(default)]
    worktrees: BTreeMap<String, EntryDoc>,
}

impl WorktreeConfig {
    /// File name of the configuration document at the repository root
    pub const FILE_NAME: &'static str = "worktrees.toml";

    /// Parse a configuration document.
    ///
    /// Duplicate worktree names are rejected structurally by the TOML parser
    /// (duplicate table keys are a syntax error); dangling merge-into
    /// references and empty branches are rejected here.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let doc: ConfigDoc = toml::from_str(text)?;

        let specs: BTreeMap<String, WorktreeSpec> = doc
            .worktrees
            .into_iter()
            .map(|(name, entry)| {
                let spec = WorktreeSpec {
                    name: name.clone(),
                    branch: entry.branch,
                    merge_into: entry.merge_into,
                    description: entry.description,
                };
                (name, spec)
            })
            .collect();

        let config = Self { specs };
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from specs, rejecting duplicate names.
    pub fn from_specs(specs: Vec<WorktreeSpec>) -> Result<Self, ConfigError> {
        let mut map = BTreeMap::new();
        for spec in specs {
            if map.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateName(spec.name));
            }
            map.insert(spec.name.clone(), spec);
        }
        let config = Self { specs: map };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for spec in self.specs.values() {
            if spec.branch.trim().is_empty() {
                return Err(ConfigError::EmptyBranch(spec.name.clone()));
            }
            if let Some(target) = &spec.merge_into {
                if !self.specs.contains_key(target) {
                    return Err(ConfigError::UnknownMergeTarget {
                        name: spec.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize back to the on-disk document shape.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let doc = ConfigDoc {
            worktrees: self
                .specs
                .values()
                .map(|spec| {
                    (
                        spec.name.clone(),
                        EntryDoc {
                            branch: spec.branch.clone(),
                            merge_into: spec.merge_into.clone(),
                            description: spec.description.clone(),
                        },
                    )
                })
                .collect(),
        };
        Ok(toml::to_string_pretty(&doc)?)
    }

    /// Load and parse the document at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Write the document to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml()?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, name: &str) -> Option<&WorktreeSpec> {
        self.specs.get(name)
    }

    /// Worktree names in lexical order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    /// Specs in lexical name order
    pub fn iter(&self) -> impl Iterator<Item = &WorktreeSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[worktrees.main]
branch = "main"
description = "Mainline development"

[worktrees.preview]
branch = "preview"
merge-into = "main"

[worktrees.production]
branch = "production"
merge-into = "preview"
description = "Live deployment"
"#;

    #[test]
    fn parses_sample_document() {
        let config = WorktreeConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.len(), 3);

        let production = config.get("production").unwrap();
        assert_eq!(production.branch, "production");
        assert_eq!(production.merge_into.as_deref(), Some("preview"));
        assert_eq!(production.description, "Live deployment");

        let main = config.get("main").unwrap();
        assert_eq!(main.merge_into, None);
    }

    #[test]
    fn entries_iterate_in_lexical_order() {
        let config = WorktreeConfig::parse(SAMPLE).unwrap();
        let names: Vec<&str> = config.names().collect();
        assert_eq!(names, vec!["main", "preview", "production"]);
    }

    #[test]
    fn duplicate_table_is_a_parse_error() {
        let text = r#"
[worktrees.main]
branch = "main"

[worktrees.main]
branch = "other"
"#;
        assert!(matches!(
            WorktreeConfig::parse(text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn dangling_merge_target_is_rejected() {
        let text = r#"
[worktrees.production]
branch = "production"
merge-into = "nonexistent"
"#;
        match WorktreeConfig::parse(text) {
            Err(ConfigError::UnknownMergeTarget { name, target }) => {
                assert_eq!(name, "production");
                assert_eq!(target, "nonexistent");
            }
            other => panic!("expected UnknownMergeTarget, got {other:?}"),
        }
    }

    #[test]
    fn empty_branch_is_rejected() {
        let text = r#"
[worktrees.main]
branch = "  "
"#;
        assert!(matches!(
            WorktreeConfig::parse(text),
            Err(ConfigError::EmptyBranch(name)) if name == "main"
        ));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let text = r#"
[worktrees.main]
branch = "main"
colour = "green"
"#;
        assert!(matches!(
            WorktreeConfig::parse(text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_losslessly() {
        let config = WorktreeConfig::parse(SAMPLE).unwrap();
        let reparsed = WorktreeConfig::parse(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, reparsed);
    }

    #[test]
    fn from_specs_rejects_duplicates() {
        let spec = |name: &str| WorktreeSpec {
            name: name.to_string(),
            branch: "main".to_string(),
            merge_into: None,
            description: String::new(),
        };
        let result = WorktreeConfig::from_specs(vec![spec("a"), spec("a")]);
        assert!(matches!(result, Err(ConfigError::DuplicateName(n)) if n == "a"));
    }
}

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::EngineError;

pub const MANIFEST_FILE: &str = "changes.json";

#[derive(Debug, Default, Deserialize)]
struct RawChangeSet {
    #[serde(default)]
    added: Vec<String>,
    #[serde(default)]
    modified: Vec<String>,
    #[serde(default)]
    deleted: Vec<String>,
}

/// The incremental package's list of changes, as installation-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<PathBuf>,
    pub modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeSet {
    /// Read `changes.json` from the root of the staging area.
    ///
    /// # Errors
    /// Returns `ManifestMissing` when the file is absent and `ManifestInvalid`
    /// when it cannot be read or parsed, or names a path outside the
    /// installation.
    pub fn load(staging: &Path) -> Result<Self, EngineError> {
        let path = staging.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(EngineError::ManifestMissing { path });
        }

        let raw = std::fs::read_to_string(&path).map_err(|error| EngineError::ManifestInvalid {
            path: path.clone(),
            details: error.to_string(),
        })?;
        Self::parse(&raw).map_err(|details| EngineError::ManifestInvalid { path, details })
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let raw: RawChangeSet = serde_json::from_str(raw).map_err(|error| error.to_string())?;
        Ok(Self {
            added: relative_paths(raw.added)?,
            modified: relative_paths(raw.modified)?,
            deleted: relative_paths(raw.deleted)?,
        })
    }

    /// Paths whose current content must be captured before anything is
    /// mutated: everything modified or deleted, plus added paths that
    /// already exist under `target`.
    #[must_use]
    pub fn backup_set(&self, target: &Path) -> Vec<PathBuf> {
        let mut seen = BTreeSet::new();
        self.modified
            .iter()
            .chain(&self.deleted)
            .chain(
                self.added
                    .iter()
                    .filter(|path| crate::transfer::entry_exists(&target.join(path))),
            )
            .filter(|path| seen.insert((*path).clone()))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

fn relative_paths(entries: Vec<String>) -> Result<Vec<PathBuf>, String> {
    entries
        .into_iter()
        .map(|entry| {
            let path = PathBuf::from(&entry);
            let escapes = path.components().any(|component| {
                !matches!(component, Component::Normal(_) | Component::CurDir)
            });
            let names_entry = path
                .components()
                .any(|component| matches!(component, Component::Normal(_)));
            if escapes || !names_entry {
                Err(format!("path '{entry}' is not relative to the installation"))
            } else {
                Ok(path)
            }
        })
        .collect()
}

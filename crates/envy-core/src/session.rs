use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths::is_subpath;

/// What to undo for one directory: variables to restore and PATH entries to
/// drop. A `None` restore value means the variable did not exist before.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathUndo {
    #[serde(default, rename = "env")]
    pub env_restore: BTreeMap<String, Option<String>>,
    #[serde(default, rename = "path")]
    pub path_remove: BTreeSet<PathBuf>,
}

impl PathUndo {
    pub fn is_empty(&self) -> bool {
        self.env_restore.is_empty() && self.path_remove.is_empty()
    }

    /// Records the value to restore for `key`, keeping the first one seen.
    pub fn record_env(&mut self, key: &str, previous: Option<String>) {
        self.env_restore.entry(key.to_string()).or_insert(previous);
    }

    pub fn record_path(&mut self, dir: &Path) {
        self.path_remove.insert(dir.to_path_buf());
    }
}

/// The undo ledger carried between invocations through the shell's
/// environment.
///
/// `BTreeMap<PathBuf, _>` orders ancestors before their descendants, which
/// gives shallow-to-deep iteration for free and deep-to-shallow by reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, rename = "path")]
    pub current_path: PathBuf,
    #[serde(default)]
    pub undo: BTreeMap<PathBuf, PathUndo>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a serialized session. An empty string is a fresh session.
    pub fn parse(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(data).context("failed to parse envy session")
    }

    /// Like [`Session::parse`], but a corrupt session is logged and replaced
    /// by an empty one.
    pub fn load(data: &str) -> Self {
        match Self::parse(data) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!("discarding unreadable session: {err:#}");
                Self::new()
            }
        }
    }

    pub fn dump(&self) -> Result<String> {
        serde_json::to_string(self).context("failed to serialize envy session")
    }

    /// Returns the undo record for `dir`, creating it on first use.
    pub fn undo_for(&mut self, dir: &Path) -> &mut PathUndo {
        self.undo.entry(dir.to_path_buf()).or_default()
    }

    /// Removes and returns every record whose directory is no longer an
    /// ancestor of `new_dir`, deepest first.
    pub fn fold_out(&mut self, new_dir: &Path) -> Vec<(PathBuf, PathUndo)> {
        let stale = self
            .undo
            .keys()
            .rev()
            .filter(|dir| !is_subpath(new_dir, dir))
            .cloned()
            .collect::<Vec<_>>();

        stale
            .into_iter()
            .filter_map(|dir| self.undo.remove(&dir).map(|undo| (dir, undo)))
            .collect()
    }

    /// All records, shallow to deep.
    pub fn path_undo_list(&self) -> impl Iterator<Item = (&Path, &PathUndo)> {
        self.undo.iter().map(|(dir, undo)| (dir.as_path(), undo))
    }

    pub fn tracked_dirs(&self) -> Vec<PathBuf> {
        self.undo.keys().cloned().collect()
    }

    pub fn prune_empty(&mut self) {
        self.undo.retain(|_, undo| !undo.is_empty());
    }
}

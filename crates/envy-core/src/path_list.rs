use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// `PATH` as an ordered list, kept in display order. New entries go to the
/// front so the most specific directory wins lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathList {
    original: Vec<PathBuf>,
    entries: Vec<PathBuf>,
    added: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
}

impl PathList {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            original: entries.clone(),
            entries,
            ..Self::default()
        }
    }

    pub fn parse(value: &OsStr) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self::new(std::env::split_paths(value).collect())
    }

    pub fn from_process() -> Self {
        std::env::var_os("PATH")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn has(&self, dir: &Path) -> bool {
        self.entries.iter().any(|entry| entry == dir)
    }

    /// Prepends `dir` unless it is already present.
    pub fn add(&mut self, dir: &Path) -> bool {
        if self.has(dir) {
            return false;
        }
        self.entries.insert(0, dir.to_path_buf());
        if !self.removed.remove(dir) {
            self.added.insert(dir.to_path_buf());
        }
        true
    }

    pub fn remove(&mut self, dir: &Path) -> bool {
        let Some(index) = self.entries.iter().position(|entry| entry == dir) else {
            return false;
        };
        self.entries.remove(index);
        if !self.added.remove(dir) {
            self.removed.insert(dir.to_path_buf());
        }
        true
    }

    pub fn get(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn changed(&self) -> bool {
        self.entries != self.original
    }

    pub fn added(&self) -> &BTreeSet<PathBuf> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<PathBuf> {
        &self.removed
    }

    pub fn join(&self) -> Result<OsString> {
        std::env::join_paths(&self.entries).context("PATH entry contains the list separator")
    }
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use envy_core::{Action, Probe};

use crate::fs_utils::is_dir;

/// Adds `<dir>/<rel>` to PATH when it is a directory.
#[derive(Debug, Clone)]
pub struct BinDirProbe {
    rel_path: PathBuf,
    name: String,
}

impl BinDirProbe {
    pub fn new(rel_path: impl Into<PathBuf>) -> Self {
        let rel_path = rel_path.into();
        let name = format!("bin-dir:{}", rel_path.display());
        Self { rel_path, name }
    }
}

impl Probe for BinDirProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, dir: &Path) -> Result<Vec<Action>> {
        let bin = dir.join(&self.rel_path);
        if !is_dir(&bin)? {
            return Ok(Vec::new());
        }
        Ok(vec![Action::add_path(dir, bin)])
    }
}

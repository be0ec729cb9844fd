use std::path::Path;

use anyhow::Result;
use envy_core::{Action, Probe};

use crate::fs_utils::is_dir;

/// A classic Go workspace root has `bin`, `src` and `pkg` side by side.
#[derive(Debug, Clone, Default)]
pub struct GoWorkspaceProbe;

impl Probe for GoWorkspaceProbe {
    fn name(&self) -> &str {
        "go-workspace"
    }

    fn check(&self, dir: &Path) -> Result<Vec<Action>> {
        for child in ["bin", "src", "pkg"] {
            if !is_dir(&dir.join(child))? {
                return Ok(Vec::new());
            }
        }
        let Some(value) = dir.to_str() else {
            anyhow::bail!("GOPATH candidate is not valid UTF-8: {}", dir.display());
        };
        Ok(vec![Action::set_env(dir, "GOPATH", value)])
    }
}

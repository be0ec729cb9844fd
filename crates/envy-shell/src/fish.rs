use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::{ensure_valid_name, ShellWriter};

#[derive(Debug, Clone, Copy, Default)]
pub struct FishWriter;

impl ShellWriter for FishWriter {
    /// Inside fish single quotes only `\'` and `\\` are escapes.
    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn set_env(&self, out: &mut dyn Write, key: &str, value: &str) -> Result<()> {
        ensure_valid_name(key)?;
        writeln!(out, "set -xg {key} {};", self.quote(value))
            .with_context(|| format!("failed writing set for {key}"))
    }

    fn unset_env(&self, out: &mut dyn Write, key: &str) -> Result<()> {
        ensure_valid_name(key)?;
        writeln!(out, "set -e {key};").with_context(|| format!("failed writing erase for {key}"))
    }

    /// fish keeps PATH as a list, one quoted argument per entry.
    fn path_command(&self, entries: &[PathBuf]) -> Result<Option<String>> {
        if entries.is_empty() {
            tracing::warn!("refusing to set an empty PATH");
            return Ok(None);
        }
        let mut line = String::from("set -xg PATH");
        for entry in entries {
            let entry = entry
                .to_str()
                .ok_or_else(|| anyhow!("PATH entry is not valid UTF-8: {}", entry.display()))?;
            line.push(' ');
            line.push_str(&self.quote(entry));
        }
        line.push(';');
        Ok(Some(line))
    }
}

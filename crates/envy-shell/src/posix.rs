use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::{ensure_valid_name, ShellWriter};

/// bash and zsh.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixWriter;

impl ShellWriter for PosixWriter {
    /// Single quotes cannot be escaped inside single quotes, so each `'`
    /// closes the string, is emitted as `"'"`, and reopens it:
    /// `who's` becomes `'who'"'"'s'`.
    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "'\"'\"'"))
    }

    fn set_env(&self, out: &mut dyn Write, key: &str, value: &str) -> Result<()> {
        ensure_valid_name(key)?;
        writeln!(out, "export {key}={}", self.quote(value))
            .with_context(|| format!("failed writing export for {key}"))
    }

    fn unset_env(&self, out: &mut dyn Write, key: &str) -> Result<()> {
        ensure_valid_name(key)?;
        writeln!(out, "unset {key}").with_context(|| format!("failed writing unset for {key}"))
    }

    fn path_command(&self, entries: &[PathBuf]) -> Result<Option<String>> {
        let joined = std::env::join_paths(entries).context("PATH entry contains the separator")?;
        let joined = joined
            .into_string()
            .map_err(|_| anyhow!("PATH is not valid UTF-8"))?;
        Ok(Some(format!("export PATH={}", self.quote(&joined))))
    }
}

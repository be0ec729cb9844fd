mod fish;
mod hook;
mod posix;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use envy_core::{is_valid_env_name, EnvChange, PathList};

pub use fish::FishWriter;
pub use hook::hook_snippet;
pub use posix::PosixWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
}

impl ShellKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "bash" | "sh" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    /// Guesses the dialect from a `$SHELL` style value such as `/bin/zsh`.
    pub fn detect(shell_env: Option<&str>) -> Option<Self> {
        let shell_value = shell_env?;
        let shell_token = Path::new(shell_value)
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or(shell_value);
        Self::parse(shell_token)
    }

    pub fn writer(self) -> Box<dyn ShellWriter> {
        match self {
            Self::Bash | Self::Zsh => Box::new(PosixWriter),
            Self::Fish => Box::new(FishWriter),
        }
    }
}

/// Spells environment changes as commands for one shell dialect. Each call
/// writes exactly one line.
pub trait ShellWriter {
    fn quote(&self, value: &str) -> String;

    fn set_env(&self, out: &mut dyn Write, key: &str, value: &str) -> Result<()>;

    fn unset_env(&self, out: &mut dyn Write, key: &str) -> Result<()>;

    /// The command that sets PATH to `entries`, or `None` when the dialect
    /// refuses the list. An `Err` means an entry cannot be spelled.
    fn path_command(&self, entries: &[PathBuf]) -> Result<Option<String>>;
}

pub(crate) fn ensure_valid_name(key: &str) -> Result<()> {
    if !is_valid_env_name(key) {
        bail!("refusing to emit invalid variable name '{key}'");
    }
    Ok(())
}

/// Writes every change, then PATH if it changed. Changes with an invalid
/// variable name, and a PATH the dialect cannot spell, are logged and left
/// out. Only write failures are errors. Returns the number of commands
/// written.
pub fn emit_changes(
    writer: &dyn ShellWriter,
    out: &mut dyn Write,
    changes: &[EnvChange],
    path: &PathList,
) -> Result<usize> {
    let mut written = 0;
    for change in changes {
        if !is_valid_env_name(&change.key) {
            tracing::warn!("skipping invalid variable name '{}'", change.key);
            continue;
        }
        match &change.value {
            Some(value) => writer.set_env(out, &change.key, value)?,
            None => writer.unset_env(out, &change.key)?,
        }
        written += 1;
    }

    if path.changed() {
        match writer.path_command(path.get()) {
            Ok(Some(line)) => {
                writeln!(out, "{line}").context("failed writing PATH")?;
                written += 1;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("leaving PATH unchanged: {err:#}"),
        }
    }
    Ok(written)
}

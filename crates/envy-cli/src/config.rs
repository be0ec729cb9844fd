use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::render::{parse_ansi_color, COLOR_ROLES};

pub const CONFIG_ENV: &str = "ENVY_CONFIG";

/// User settings read from `config.toml`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvyConfig {
    /// Directories under which probing is allowed. `~` expands to home.
    pub trusted_paths: Vec<String>,
    /// Treat the home directory as trusted even when it is not listed.
    pub always_load_home: bool,
    /// Colour name per output role (`prefix`, `change`, `restore`).
    pub colors: BTreeMap<String, String>,
}

impl Default for EnvyConfig {
    fn default() -> Self {
        Self {
            trusted_paths: Vec::new(),
            always_load_home: true,
            colors: BTreeMap::new(),
        }
    }
}

impl EnvyConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse envy config")
    }

    /// Reads the config file. A missing file gives the defaults, and so does
    /// an unreadable or malformed one after a warning.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!("failed to read {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };
        match Self::parse(&raw) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("{}: {err:#}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Absolute trusted roots, home first when `always_load_home` is set.
    /// Relative entries are left out (`check` reports them).
    pub fn trusted_roots(&self, home: &Path) -> Vec<PathBuf> {
        let mut roots = Vec::new();
        if self.always_load_home {
            roots.push(home.to_path_buf());
        }
        for entry in &self.trusted_paths {
            let root = expand_home(entry, home);
            if root.is_absolute() && !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots
    }

    /// Problems worth a warning. None of them stop the hook.
    pub fn check(&self, home: &Path) -> Vec<String> {
        let mut warnings = Vec::new();
        for entry in &self.trusted_paths {
            if !expand_home(entry, home).is_absolute() {
                warnings.push(format!("ignoring relative trusted path '{entry}'"));
            }
        }
        if self.trusted_roots(home).is_empty() {
            warnings.push("no trusted paths configured; probing is disabled".to_string());
        }
        for (role, color) in &self.colors {
            if !COLOR_ROLES.contains(&role.as_str()) {
                warnings.push(format!("unknown color role '{role}'"));
            } else if parse_ansi_color(color).is_none() {
                warnings.push(format!("unknown color '{color}' for role '{role}'"));
            }
        }
        warnings
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize envy config")
    }
}

/// `$ENVY_CONFIG` when set, otherwise `~/.config/envy/config.toml`.
pub fn resolve_config_path(home: &Path, override_path: Option<&OsStr>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => home.join(".config").join("envy").join("config.toml"),
    }
}

pub fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    if home.is_empty() {
        bail!("HOME is empty");
    }
    Ok(PathBuf::from(home))
}

fn expand_home(entry: &str, home: &Path) -> PathBuf {
    if entry == "~" {
        return home.to_path_buf();
    }
    match entry.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(entry),
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use envy_core::{is_valid_env_name, Action, Probe, SESSION_VAR};

use crate::fs_utils::is_file;

const DIRECTIVE_PREFIX: &str = "ENVY_";
const RESERVED_KEYS: [&str; 2] = ["PATH", SESSION_VAR];

/// Loads variables from a `.env` style file.
///
/// Keys starting with `ENVY_` are directives rather than variables; see
/// [`directive_actions`].
#[derive(Debug, Clone)]
pub struct DotEnvProbe {
    rel_path: PathBuf,
    name: String,
}

impl DotEnvProbe {
    pub fn new(rel_path: impl Into<PathBuf>) -> Self {
        let rel_path = rel_path.into();
        let name = format!("dotenv:{}", rel_path.display());
        Self { rel_path, name }
    }
}

impl Probe for DotEnvProbe {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, dir: &Path) -> Result<Vec<Action>> {
        let path = dir.join(&self.rel_path);
        if !is_file(&path)? {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let parsed = parse_dotenv(&raw);
        for skipped in &parsed.skipped {
            tracing::warn!(
                "{}:{}: skipping line: {}",
                path.display(),
                skipped.line,
                skipped.reason
            );
        }

        let mut actions = Vec::new();
        for (key, value) in parsed.entries {
            if key.starts_with(DIRECTIVE_PREFIX) {
                actions.extend(directive_actions(dir, &key, &value));
            } else if RESERVED_KEYS.contains(&key.as_str()) {
                tracing::warn!("{}: {key} cannot be set from an env file", path.display());
            } else {
                actions.push(Action::set_env(dir, key, value));
            }
        }
        Ok(actions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDotEnv {
    pub entries: Vec<(String, String)>,
    pub skipped: Vec<SkippedLine>,
}

/// Parses `KEY=VALUE` lines in file order. A bad line is recorded in
/// `skipped` and parsing carries on with the next one.
pub fn parse_dotenv(raw: &str) -> ParsedDotEnv {
    let mut parsed = ParsedDotEnv::default();
    for (index, line) in raw.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(entry)) => parsed.entries.push(entry),
            Ok(None) => {}
            Err(err) => parsed.skipped.push(SkippedLine {
                line: index + 1,
                reason: err.to_string(),
            }),
        }
    }
    parsed
}

fn parse_line(line: &str) -> Result<Option<(String, String)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line
        .strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(line);

    let Some((key, value)) = line.split_once('=') else {
        bail!("expected KEY=VALUE");
    };
    let key = key.trim();
    if !is_valid_env_name(key) {
        bail!("invalid variable name '{key}'");
    }

    let value = value.trim_start();
    let value = match value.chars().next() {
        Some('\'') => parse_single_quoted(&value[1..])?,
        Some('"') => parse_double_quoted(&value[1..])?,
        _ => parse_unquoted(value),
    };
    Ok(Some((key.to_string(), value)))
}

fn parse_single_quoted(rest: &str) -> Result<String> {
    let Some(end) = rest.find('\'') else {
        bail!("unterminated single quote");
    };
    expect_trailing_comment(&rest[end + 1..])?;
    Ok(rest[..end].to_string())
}

fn parse_double_quoted(rest: &str) -> Result<String> {
    let mut value = String::new();
    let mut chars = rest.char_indices();
    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' => {
                expect_trailing_comment(&rest[index + 1..])?;
                return Ok(value);
            }
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            _ => value.push(ch),
        }
    }
    Err(anyhow!("unterminated double quote"))
}

fn parse_unquoted(value: &str) -> String {
    let value = match value.find(" #").or_else(|| value.find("\t#")) {
        Some(index) => &value[..index],
        None => value,
    };
    value.trim_end().to_string()
}

fn expect_trailing_comment(rest: &str) -> Result<()> {
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with('#') {
        return Ok(());
    }
    bail!("unexpected characters after closing quote: '{rest}'")
}

/// Expands an `ENVY_*` directive found in the env file of `dir`.
///
/// - `ENVY_EXTEND_PATH`: list of directories added to PATH, keeping their
///   listed order at the front.
/// - `ENVY_GOROOT`: adds `<root>/bin` to PATH and sets `GOROOT`.
/// - `ENVY_PYTHONROOT`: adds `<root>/bin` to PATH.
///
/// Relative directories resolve against `dir`.
pub fn directive_actions(dir: &Path, key: &str, value: &str) -> Vec<Action> {
    if value.is_empty() {
        tracing::warn!("{key} in {} has an empty value", dir.display());
        return Vec::new();
    }

    match key {
        "ENVY_EXTEND_PATH" => {
            let entries = std::env::split_paths(value)
                .filter(|entry| !entry.as_os_str().is_empty())
                .map(|entry| dir.join(entry))
                .collect::<Vec<_>>();
            // Each addition is prepended, so add the last entry first.
            entries
                .into_iter()
                .rev()
                .map(|entry| Action::add_path(dir, entry))
                .collect()
        }
        "ENVY_GOROOT" => {
            let root = dir.join(value);
            vec![
                Action::add_path(dir, root.join("bin")),
                Action::set_env(dir, "GOROOT", root.to_string_lossy()),
            ]
        }
        "ENVY_PYTHONROOT" => vec![Action::add_path(dir, dir.join(value).join("bin"))],
        _ => {
            tracing::warn!("{key} is not supported in env files");
            Vec::new()
        }
    }
}

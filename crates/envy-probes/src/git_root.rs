use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use envy_core::{Action, Probe};

use crate::fs_utils::{is_dir, metadata_if_exists};

pub const GIT_ROOT_VAR: &str = "_ENVY_GITROOT";
pub const GIT_BRANCH_VAR: &str = "_ENVY_BRANCH";

/// Marks the root of a git checkout and its current branch, for prompts.
#[derive(Debug, Clone, Default)]
pub struct GitRootProbe;

impl Probe for GitRootProbe {
    fn name(&self) -> &str {
        "git-root"
    }

    fn check(&self, dir: &Path) -> Result<Vec<Action>> {
        let dot_git = dir.join(".git");
        let Some(metadata) = metadata_if_exists(&dot_git)? else {
            return Ok(Vec::new());
        };

        let git_dir = if metadata.is_dir() {
            dot_git
        } else if metadata.is_file() {
            // Linked worktrees and submodules point elsewhere.
            let contents = fs::read_to_string(&dot_git)
                .with_context(|| format!("failed to read {}", dot_git.display()))?;
            let Some(target) = resolve_gitdir_link(dir, &contents) else {
                return Ok(Vec::new());
            };
            if !is_dir(&target)? {
                return Ok(Vec::new());
            }
            target
        } else {
            return Ok(Vec::new());
        };

        let mut actions = vec![Action::set_env(dir, GIT_ROOT_VAR, dir.to_string_lossy())];

        let head_path = git_dir.join("HEAD");
        let head = match fs::read_to_string(&head_path) {
            Ok(head) => head,
            Err(err) => {
                tracing::debug!("no readable HEAD at {}: {err}", head_path.display());
                return Ok(actions);
            }
        };
        if let Some(branch) = branch_from_head(&head) {
            actions.push(Action::set_env(dir, GIT_BRANCH_VAR, branch));
        }
        Ok(actions)
    }
}

/// Reads a `gitdir: <path>` link file; relative targets resolve against `dir`.
pub fn resolve_gitdir_link(dir: &Path, contents: &str) -> Option<PathBuf> {
    let first_line = contents.lines().next()?;
    let target = first_line.strip_prefix("gitdir: ")?.trim();
    if target.is_empty() {
        return None;
    }
    Some(dir.join(target))
}

/// Branch name from the contents of `HEAD`: the name under `refs/heads/`,
/// the last segment of any other ref, or an abbreviated hash when detached.
pub fn branch_from_head(head: &str) -> Option<String> {
    let head = head.lines().next()?.trim();
    if let Some(reference) = head.strip_prefix("ref: ") {
        let reference = reference.trim();
        let branch = match reference.strip_prefix("refs/heads/") {
            Some(branch) => branch,
            None => reference.rsplit('/').next()?,
        };
        return (!branch.is_empty()).then(|| branch.to_string());
    }

    if head.is_empty() || !head.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    Some(head.chars().take(7).collect())
}

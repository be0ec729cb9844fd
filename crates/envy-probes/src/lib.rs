mod bin_dir;
mod dotenv;
mod fs_utils;
mod git_root;
mod go_workspace;

pub use bin_dir::BinDirProbe;
pub use dotenv::{directive_actions, parse_dotenv, DotEnvProbe, ParsedDotEnv, SkippedLine};
pub use git_root::{
    branch_from_head, resolve_gitdir_link, GitRootProbe, GIT_BRANCH_VAR, GIT_ROOT_VAR,
};
pub use go_workspace::GoWorkspaceProbe;

use envy_core::Probe;

/// The probe set, in registration order. Built once per process and handed
/// to the dispatcher.
pub fn default_probes() -> Vec<Box<dyn Probe>> {
    vec![
        Box::new(BinDirProbe::new("bin")),
        Box::new(BinDirProbe::new("node_modules/.bin")),
        Box::new(BinDirProbe::new(".venv/bin")),
        Box::new(GoWorkspaceProbe),
        Box::new(DotEnvProbe::new(".env")),
        Box::new(GitRootProbe),
    ]
}

mod config;
mod dispatch;
mod hook_flow;
mod logging;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use envy_shell::ShellKind;

#[derive(Parser, Debug)]
#[command(name = "envy")]
#[command(about = "Directory-scoped environment overlays for your shell", long_about = None)]
struct Cli {
    /// Log every probe action and ledger change to stderr.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print shell commands that bring the environment in line with the
    /// current directory. Run from the prompt hook.
    Hook {
        #[arg(long, value_enum)]
        shell: Option<CliShell>,
    },
    /// Print the snippet that installs the prompt hook.
    Init {
        #[arg(long, value_enum)]
        shell: Option<CliShell>,
    },
    /// Print the effective configuration.
    Config,
    /// Print a completion script.
    Completions {
        #[arg(value_enum)]
        shell: CliShell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CliShell> for ShellKind {
    fn from(value: CliShell) -> Self {
        match value {
            CliShell::Bash => ShellKind::Bash,
            CliShell::Zsh => ShellKind::Zsh,
            CliShell::Fish => ShellKind::Fish,
        }
    }
}

impl From<CliShell> for Shell {
    fn from(value: CliShell) -> Self {
        match value {
            CliShell::Bash => Shell::Bash,
            CliShell::Zsh => Shell::Zsh,
            CliShell::Fish => Shell::Fish,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let envy_debug = std::env::var(logging::DEBUG_ENV).ok();
    logging::init_logging(logging::debug_requested(cli.debug, envy_debug.as_deref()));

    dispatch::run_cli(cli)
}

use std::io::Write;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use envy_core::{OverlayEnv, PathList, SESSION_VAR};
use envy_probes::default_probes;
use envy_shell::{hook_snippet, ShellKind};

use crate::config::{home_dir, resolve_config_path, EnvyConfig, CONFIG_ENV};
use crate::hook_flow::{run_hook, HookInputs};
use crate::render::{current_output_style, render_line, Palette};
use crate::{Cli, CliShell, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let shell_env = std::env::var("SHELL").ok();
    match cli.command {
        Commands::Hook { shell } => run_hook_command(resolve_shell(shell, shell_env.as_deref())),
        Commands::Init { shell } => {
            let shell = resolve_shell(shell, shell_env.as_deref());
            let exe = current_exe_display();
            print!("{}", hook_snippet(shell, &exe));
            Ok(())
        }
        Commands::Config => {
            let home = home_dir()?;
            let path = resolve_config_path(&home, std::env::var_os(CONFIG_ENV).as_deref());
            let config = EnvyConfig::load(&path);
            for warning in config.check(&home) {
                tracing::warn!("{warning}");
            }
            println!("# {}", path.display());
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            write_completions_script(shell, &mut stdout)
        }
    }
}

fn run_hook_command(shell: ShellKind) -> Result<()> {
    let home = home_dir()?;
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let config = EnvyConfig::load(&resolve_config_path(
        &home,
        std::env::var_os(CONFIG_ENV).as_deref(),
    ));
    for warning in config.check(&home) {
        tracing::warn!("{warning}");
    }

    let inputs = HookInputs {
        trusted_roots: config.trusted_roots(&home),
        session_raw: std::env::var(SESSION_VAR).unwrap_or_default(),
        env: OverlayEnv::from_process(),
        path: PathList::from_process(),
        cwd,
        home,
    };
    let probes = default_probes();
    let writer = shell.writer();

    let mut stdout = std::io::stdout().lock();
    let outcome = run_hook(inputs, &probes, writer.as_ref(), &mut stdout)?;
    stdout.flush().context("failed writing shell commands")?;
    tracing::debug!(commands = outcome.commands, "hook finished");

    let style = current_output_style();
    let palette = Palette::from_colors(&config.colors);
    for (role, text) in &outcome.lines {
        eprintln!("{}", render_line(style, &palette, *role, text));
    }
    Ok(())
}

pub(crate) fn resolve_shell(requested: Option<CliShell>, shell_env: Option<&str>) -> ShellKind {
    if let Some(shell) = requested {
        return shell.into();
    }
    ShellKind::detect(shell_env).unwrap_or(ShellKind::Bash)
}

fn current_exe_display() -> String {
    match std::env::current_exe() {
        Ok(path) => path.display().to_string(),
        Err(err) => {
            tracing::warn!("cannot locate the envy binary ({err}); relying on PATH");
            "envy".to_string()
        }
    }
}

pub(crate) fn write_completions_script<W: Write>(shell: CliShell, writer: &mut W) -> Result<()> {
    let mut command = Cli::command();
    let generator: Shell = shell.into();
    let mut generated = Vec::new();
    clap_complete::generate(generator, &mut command, "envy", &mut generated);
    writer
        .write_all(&generated)
        .context("failed writing generated completion script")
}

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use envy_core::{
    AncestorChain, EnvChange, Event, Overlay, OverlayEnv, PathList, Probe, Session, Shorten,
    SESSION_VAR,
};
use envy_shell::{emit_changes, ShellWriter};

use crate::render::{format_change_lines, Role};

/// Everything one hook invocation reads from the process, captured up front.
#[derive(Debug, Clone)]
pub struct HookInputs {
    pub cwd: PathBuf,
    pub home: PathBuf,
    pub session_raw: String,
    pub env: OverlayEnv,
    pub path: PathList,
    pub trusted_roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct HookOutcome {
    pub lines: Vec<(Role, String)>,
    pub commands: usize,
    pub changes: Vec<EnvChange>,
    pub path: Vec<PathBuf>,
    /// The serialized session, when it differs from the incoming one.
    pub session: Option<String>,
}

/// Runs the overlay for `inputs.cwd` and writes the resulting shell commands
/// to `out`. Terminal lines are returned rather than printed.
pub fn run_hook(
    inputs: HookInputs,
    probes: &[Box<dyn Probe>],
    writer: &dyn ShellWriter,
    out: &mut dyn Write,
) -> Result<HookOutcome> {
    let HookInputs {
        cwd,
        home,
        session_raw,
        mut env,
        mut path,
        trusted_roots,
    } = inputs;

    let mut session = Session::load(&session_raw);
    let chain = AncestorChain::new(&cwd, &trusted_roots);
    tracing::debug!(
        cwd = %cwd.display(),
        depth = chain.len(),
        "probing ancestor chain"
    );

    let report = Overlay {
        session: &mut session,
        env: &mut env,
        path: &mut path,
    }
    .run(&cwd, &chain, probes);
    tracing::debug!(actions = report.actions, "probes finished");
    for event in &report.events {
        log_event(event);
    }

    let changes = env.changes();
    let emitted = emit_changes(writer, out, &changes, &path);

    let dumped = match session.dump() {
        Ok(dumped) => Some(dumped),
        Err(err) => {
            tracing::warn!("session not saved: {err:#}");
            None
        }
    };
    let session_out = dumped.filter(|dumped| *dumped != session_raw);
    // Written even when a change failed to write.
    let saved = match &session_out {
        Some(dumped) => writer.set_env(out, SESSION_VAR, dumped).map(|()| 1),
        None => Ok(0),
    };
    let commands = emitted? + saved?;

    let lines = format_change_lines(&changes, &path, &Shorten::new(home, &cwd));
    Ok(HookOutcome {
        lines,
        commands,
        changes,
        path: path.get().to_vec(),
        session: session_out,
    })
}

fn log_event(event: &Event) {
    match event {
        Event::PathAdded(dir) => tracing::debug!("PATH += {}", dir.display()),
        Event::PathRemoved(dir) => tracing::debug!("PATH -= {}", dir.display()),
        Event::EnvSet { key, value } => tracing::debug!("{key} = {value}"),
        Event::EnvRestored { key, value } => match value {
            Some(value) => tracing::debug!("restore {key} = {value}"),
            None => tracing::debug!("restore unset {key}"),
        },
    }
}

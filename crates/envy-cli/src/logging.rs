//! Diagnostics go to stderr through `tracing`, so stdout stays reserved for
//! shell commands.
//!
//! Filter priority, highest first: `ENVY_LOG`, `RUST_LOG`, then `--debug` or
//! a non-empty `envy_debug`, then `warn`.

use std::io::IsTerminal;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ENVY_LOG";
pub const DEBUG_ENV: &str = "envy_debug";

pub fn debug_requested(flag: bool, envy_debug: Option<&str>) -> bool {
    flag || envy_debug.is_some_and(|value| !value.is_empty())
}

pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init_logging(debug: bool) {
    let use_ansi = std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(debug)
        .without_time()
        .compact();

    let _ = tracing_subscriber::registry()
        .with(build_env_filter(debug))
        .with(fmt_layer)
        .try_init();
}

fn build_env_filter(debug: bool) -> EnvFilter {
    // An unparseable ENVY_LOG falls through rather than failing the hook.
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(default_directive(debug))
}

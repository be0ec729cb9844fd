mod action;
mod engine;
mod overlay;
mod path_list;
mod paths;
mod probe;
mod session;

pub use action::{is_valid_env_name, order_actions, Action, Effect};
pub use engine::{Event, Overlay, Report};
pub use overlay::{EnvChange, OverlayEnv};
pub use path_list::PathList;
pub use paths::{is_subpath, is_subpath_of_any, AncestorChain, Shorten};
pub use probe::{dispatch_probes, Probe};
pub use session::{PathUndo, Session};

/// Environment variable carrying the serialized session between prompts.
pub const SESSION_VAR: &str = "_envy_session";

#[cfg(test)]
mod tests;

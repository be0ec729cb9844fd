use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;

use crate::action::{order_actions, Action};
use crate::paths::AncestorChain;

/// Inspects one directory and proposes actions for it.
///
/// Probes only read the filesystem. A missing marker is `Ok(vec![])`; an
/// `Err` is logged by the dispatcher and counts as no action.
pub trait Probe: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, dir: &Path) -> Result<Vec<Action>>;
}

/// Runs every probe against every directory of the chain in parallel and
/// returns the actions ordered shallow to deep.
///
/// `collect` only returns once every unit has finished, so nothing is
/// observed from a partial batch.
pub fn dispatch_probes(chain: &AncestorChain, probes: &[Box<dyn Probe>]) -> Vec<Action> {
    let units = chain
        .deepest_first()
        .flat_map(|dir| probes.iter().map(move |probe| (dir, probe.as_ref())))
        .collect::<Vec<_>>();

    let actions = units
        .into_par_iter()
        .flat_map_iter(|(dir, probe)| run_probe(probe, dir))
        .collect::<Vec<_>>();

    order_actions(actions)
}

fn run_probe(probe: &dyn Probe, dir: &Path) -> Vec<Action> {
    match probe.check(dir) {
        Ok(actions) => actions,
        Err(err) => {
            tracing::warn!(
                probe = probe.name(),
                dir = %dir.display(),
                "probe failed: {err:#}"
            );
            Vec::new()
        }
    }
}

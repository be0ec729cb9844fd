use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::action::{Action, Effect};
use crate::overlay::OverlayEnv;
use crate::path_list::PathList;
use crate::paths::AncestorChain;
use crate::probe::{dispatch_probes, Probe};
use crate::session::Session;

/// Something the invocation did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    PathAdded(PathBuf),
    PathRemoved(PathBuf),
    EnvSet { key: String, value: String },
    EnvRestored { key: String, value: Option<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub events: Vec<Event>,
    pub actions: usize,
}

/// One invocation of the overlay state machine.
///
/// Reverts directories left since the last run, applies this run's probe
/// results, then retires overrides whose probe no longer fires.
pub struct Overlay<'a> {
    pub session: &'a mut Session,
    pub env: &'a mut OverlayEnv,
    pub path: &'a mut PathList,
}

impl Overlay<'_> {
    pub fn run(
        &mut self,
        current: &Path,
        chain: &AncestorChain,
        probes: &[Box<dyn Probe>],
    ) -> Report {
        let mut report = Report::default();

        self.fold_out(current, &mut report);
        self.session.current_path = current.to_path_buf();

        let actions = dispatch_probes(chain, probes);
        report.actions = actions.len();
        let applied = self.apply(&actions, &mut report);

        self.fold_over(&applied, &mut report);
        report
    }

    fn fold_out(&mut self, current: &Path, report: &mut Report) {
        for (dir, undo) in self.session.fold_out(current) {
            tracing::debug!(dir = %dir.display(), "leaving directory");
            for entry in &undo.path_remove {
                if self.path.remove(entry) {
                    report.events.push(Event::PathRemoved(entry.clone()));
                }
            }
            for (key, value) in &undo.env_restore {
                self.restore_env(key, value.as_deref(), report);
            }
        }
    }

    fn apply(&mut self, actions: &[Action], report: &mut Report) -> Applied {
        let mut applied = Applied::default();
        for action in actions {
            tracing::debug!(?action, "applying");
            match &action.effect {
                Effect::AddPath(dir) => {
                    applied.paths.insert(dir.clone());
                    if self.path.add(dir) {
                        self.session.undo_for(&action.source).record_path(dir);
                        report.events.push(Event::PathAdded(dir.clone()));
                    }
                }
                Effect::SetEnv { key, value } => {
                    applied.keys.insert(key.clone());
                    let previous = self.env.get(key).map(str::to_string);
                    if previous.as_deref() == Some(value.as_str()) {
                        continue;
                    }
                    self.env.set(key, value);
                    self.session
                        .undo_for(&action.source)
                        .record_env(key, previous);
                    report.events.push(Event::EnvSet {
                        key: key.clone(),
                        value: value.clone(),
                    });
                }
            }
        }
        applied
    }

    /// Restores ledger entries that no action re-confirmed this run.
    ///
    /// Scans shallow to deep so the shallowest record, which holds the
    /// oldest value, is the one restored; deeper duplicates are dropped.
    fn fold_over(&mut self, applied: &Applied, report: &mut Report) {
        let mut resolved_keys = BTreeSet::new();
        let mut resolved_paths = BTreeSet::new();

        for dir in self.session.tracked_dirs() {
            let undo = self.session.undo_for(&dir);

            let stale_keys = undo
                .env_restore
                .keys()
                .filter(|key| !applied.keys.contains(*key))
                .cloned()
                .collect::<Vec<_>>();
            let stale_paths = undo
                .path_remove
                .iter()
                .filter(|entry| !applied.paths.contains(*entry))
                .cloned()
                .collect::<Vec<_>>();

            let mut restores = Vec::new();
            for key in stale_keys {
                let value = undo.env_restore.remove(&key).flatten();
                if resolved_keys.insert(key.clone()) {
                    restores.push((key, value));
                }
            }
            let mut removals = Vec::new();
            for entry in stale_paths {
                undo.path_remove.remove(&entry);
                if resolved_paths.insert(entry.clone()) {
                    removals.push(entry);
                }
            }

            if !restores.is_empty() || !removals.is_empty() {
                tracing::debug!(dir = %dir.display(), "retiring stale overrides");
            }
            for entry in removals {
                if self.path.remove(&entry) {
                    report.events.push(Event::PathRemoved(entry));
                }
            }
            for (key, value) in restores {
                self.restore_env(&key, value.as_deref(), report);
            }
        }

        self.session.prune_empty();
    }

    fn restore_env(&mut self, key: &str, value: Option<&str>, report: &mut Report) {
        self.env.restore(key, value);
        report.events.push(Event::EnvRestored {
            key: key.to_string(),
            value: value.map(str::to_string),
        });
    }
}

#[derive(Debug, Default)]
struct Applied {
    keys: BTreeSet<String>,
    paths: BTreeSet<PathBuf>,
}

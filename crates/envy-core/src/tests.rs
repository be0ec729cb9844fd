use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::anyhow;

use super::*;

struct FakeProbe {
    actions: Vec<Action>,
}

impl Probe for FakeProbe {
    fn name(&self) -> &str {
        "fake"
    }

    fn check(&self, dir: &Path) -> anyhow::Result<Vec<Action>> {
        Ok(self
            .actions
            .iter()
            .filter(|action| action.source == dir)
            .cloned()
            .collect())
    }
}

struct FailingProbe;

impl Probe for FailingProbe {
    fn name(&self) -> &str {
        "failing"
    }

    fn check(&self, dir: &Path) -> anyhow::Result<Vec<Action>> {
        Err(anyhow!("permission denied: {}", dir.display()))
    }
}

/// Plays the calling shell: keeps the exported variables and evaluates
/// whatever one invocation asks for.
struct FakeShell {
    vars: BTreeMap<String, String>,
    roots: Vec<PathBuf>,
}

struct Outcome {
    report: Report,
    changes: Vec<EnvChange>,
    path_changed: bool,
    session: Session,
}

impl FakeShell {
    fn new(vars: &[(&str, &str)]) -> Self {
        Self {
            vars: vars
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            roots: vec![PathBuf::from("/home/u")],
        }
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    fn invoke(&mut self, cwd: &str, actions: Vec<Action>) -> Outcome {
        self.invoke_with(cwd, vec![Box::new(FakeProbe { actions })])
    }

    fn invoke_with(&mut self, cwd: &str, probes: Vec<Box<dyn Probe>>) -> Outcome {
        let cwd = Path::new(cwd);
        let mut session = Session::load(self.var(SESSION_VAR).unwrap_or(""));
        let mut env = OverlayEnv::from_vars(self.vars.clone());
        let mut path = PathList::parse(OsStr::new(self.var("PATH").unwrap_or("")));
        let chain = AncestorChain::new(cwd, &self.roots);

        let report = Overlay {
            session: &mut session,
            env: &mut env,
            path: &mut path,
        }
        .run(cwd, &chain, &probes);

        let changes = env.changes();
        for change in &changes {
            match &change.value {
                Some(value) => self.vars.insert(change.key.clone(), value.clone()),
                None => self.vars.remove(&change.key),
            };
        }
        let path_changed = path.changed();
        if path_changed {
            let joined = path
                .join()
                .expect("must join PATH")
                .into_string()
                .expect("PATH must be utf-8");
            self.vars.insert("PATH".to_string(), joined);
        }
        self.vars.insert(
            SESSION_VAR.to_string(),
            session.dump().expect("must dump session"),
        );

        Outcome {
            report,
            changes,
            path_changed,
            session,
        }
    }
}

fn set(source: &str, key: &str, value: &str) -> Action {
    Action::set_env(source, key, value)
}

fn bin(source: &str, dir: &str) -> Action {
    Action::add_path(source, dir)
}

#[test]
fn ancestor_chain_stops_at_trusted_root() {
    let roots = vec![PathBuf::from("/home/u")];
    let chain = AncestorChain::new(Path::new("/home/u/src/app"), &roots);

    assert_eq!(
        chain.deepest_first().collect::<Vec<_>>(),
        vec![
            Path::new("/home/u/src/app"),
            Path::new("/home/u/src"),
            Path::new("/home/u"),
        ]
    );
    assert_eq!(
        chain.shallowest_first().next(),
        Some(Path::new("/home/u"))
    );
    assert!(chain.contains(Path::new("/home/u/src")));
    assert!(!chain.contains(Path::new("/home")));
}

#[test]
fn ancestor_chain_is_empty_outside_trusted_roots() {
    let roots = vec![PathBuf::from("/home/u")];
    assert!(AncestorChain::new(Path::new("/tmp/scratch"), &roots).is_empty());
    assert!(AncestorChain::new(Path::new("/home/user2/app"), &roots).is_empty());
    assert!(AncestorChain::new(Path::new("/home/u/app"), &[]).is_empty());
}

#[test]
fn ancestor_chain_uses_any_matching_root() {
    let roots = vec![PathBuf::from("/srv"), PathBuf::from("/home/u/work")];
    let chain = AncestorChain::new(Path::new("/home/u/work/app"), &roots);
    assert_eq!(chain.len(), 2);
}

#[test]
fn is_subpath_is_component_wise() {
    assert!(is_subpath(Path::new("/home/u/app"), Path::new("/home/u")));
    assert!(is_subpath(Path::new("/home/u"), Path::new("/home/u")));
    assert!(!is_subpath(Path::new("/home/user"), Path::new("/home/u")));
}

#[test]
fn env_names_follow_shell_identifier_rules() {
    assert!(is_valid_env_name("GOPATH"));
    assert!(is_valid_env_name("_envy_session"));
    assert!(is_valid_env_name("A1_B2"));
    assert!(!is_valid_env_name(""));
    assert!(!is_valid_env_name("1ABC"));
    assert!(!is_valid_env_name("MY-VAR"));
    assert!(!is_valid_env_name("X;rm -rf ~"));
}

#[test]
fn order_actions_sorts_shallow_first_and_is_stable() {
    let ordered = order_actions(vec![
        set("/home/u/app", "A", "deep-1"),
        set("/home/u", "A", "shallow"),
        set("/home/u/app", "B", "deep-2"),
    ]);

    assert_eq!(
        ordered,
        vec![
            set("/home/u", "A", "shallow"),
            set("/home/u/app", "A", "deep-1"),
            set("/home/u/app", "B", "deep-2"),
        ]
    );
}

#[test]
fn dispatch_collects_from_every_directory_and_skips_failures() {
    let roots = vec![PathBuf::from("/home/u")];
    let chain = AncestorChain::new(Path::new("/home/u/app"), &roots);
    let probes: Vec<Box<dyn Probe>> = vec![
        Box::new(FailingProbe),
        Box::new(FakeProbe {
            actions: vec![
                bin("/home/u/app", "/home/u/app/bin"),
                set("/home/u", "EDITOR", "vi"),
                set("/elsewhere", "IGNORED", "1"),
            ],
        }),
    ];

    let actions = dispatch_probes(&chain, &probes);
    assert_eq!(
        actions,
        vec![
            set("/home/u", "EDITOR", "vi"),
            bin("/home/u/app", "/home/u/app/bin"),
        ]
    );
}

#[test]
fn undo_for_keeps_first_recorded_value() {
    let mut session = Session::new();
    let dir = Path::new("/home/u/app");
    session.undo_for(dir).record_env("X", Some("0".to_string()));
    session.undo_for(dir).record_env("X", Some("1".to_string()));

    assert_eq!(
        session.undo[dir].env_restore.get("X"),
        Some(&Some("0".to_string()))
    );
}

#[test]
fn fold_out_returns_left_directories_deepest_first() {
    let mut session = Session::new();
    session.undo_for(Path::new("/home/u")).record_env("A", None);
    session.undo_for(Path::new("/home/u/a")).record_env("B", None);
    session.undo_for(Path::new("/home/u/a/b")).record_env("C", None);
    session.undo_for(Path::new("/home/u/c")).record_env("D", None);

    let left = session
        .fold_out(Path::new("/home/u/c/d"))
        .into_iter()
        .map(|(dir, _)| dir)
        .collect::<Vec<_>>();

    assert_eq!(
        left,
        vec![PathBuf::from("/home/u/a/b"), PathBuf::from("/home/u/a")]
    );
    assert_eq!(
        session.tracked_dirs(),
        vec![PathBuf::from("/home/u"), PathBuf::from("/home/u/c")]
    );
}

#[test]
fn path_undo_list_is_shallow_to_deep() {
    let mut session = Session::new();
    session.undo_for(Path::new("/home/u/a-b")).record_env("A", None);
    session.undo_for(Path::new("/home/u/a/b")).record_env("B", None);
    session.undo_for(Path::new("/home/u/a")).record_env("C", None);

    let dirs = session
        .path_undo_list()
        .map(|(dir, _)| dir.to_path_buf())
        .collect::<Vec<_>>();
    let a = dirs
        .iter()
        .position(|dir| dir == Path::new("/home/u/a"))
        .expect("must list /home/u/a");
    let ab = dirs
        .iter()
        .position(|dir| dir == Path::new("/home/u/a/b"))
        .expect("must list /home/u/a/b");
    assert!(a < ab);
}

#[test]
fn session_round_trips_through_its_serialized_form() {
    let mut session = Session::new();
    session.current_path = PathBuf::from("/home/u/app");
    let undo = session.undo_for(Path::new("/home/u/app"));
    undo.record_env("GOPATH", Some("/old/go".to_string()));
    undo.record_env("NEW_VAR", None);
    undo.record_env("QUOTED", Some("it's \"fine\"\n".to_string()));
    undo.record_path(Path::new("/home/u/app/bin"));
    session
        .undo_for(Path::new("/home/u"))
        .record_path(Path::new("/home/u/bin"));

    let dumped = session.dump().expect("must dump");
    assert_eq!(Session::parse(&dumped).expect("must parse"), session);
}

#[test]
fn session_load_treats_empty_and_corrupt_input_as_fresh() {
    assert_eq!(Session::load(""), Session::new());
    assert_eq!(Session::load("{not json"), Session::new());
    assert!(Session::parse("{not json").is_err());
    assert_eq!(Session::load("}{"), Session::new());
    assert_eq!(Session::load(r#"{"path":"/home/u","undo":{"/home/u":"#), Session::new());
}

#[test]
fn overlay_changes_list_restorations_first_then_sorted_keys() {
    let mut env = OverlayEnv::from_vars([("KEEP", "same"), ("OLD", "1"), ("GONE", "x")]);
    env.set("ZED", "z");
    env.set("ALPHA", "a");
    env.restore("OLD", Some("0"));
    env.restore("GONE", None);
    env.set("KEEP", "same");

    assert_eq!(
        env.changes(),
        vec![
            EnvChange {
                key: "GONE".to_string(),
                value: None,
                restored: true,
            },
            EnvChange {
                key: "OLD".to_string(),
                value: Some("0".to_string()),
                restored: true,
            },
            EnvChange {
                key: "ALPHA".to_string(),
                value: Some("a".to_string()),
                restored: false,
            },
            EnvChange {
                key: "ZED".to_string(),
                value: Some("z".to_string()),
                restored: false,
            },
        ]
    );
}

#[test]
fn overlay_set_after_restore_is_a_fresh_change() {
    let mut env = OverlayEnv::from_vars([("X", "2")]);
    env.restore("X", Some("0"));
    env.set("X", "1");

    assert_eq!(env.get("X"), Some("1"));
    assert!(!env.changes()[0].restored);
}

#[test]
fn path_list_prepends_once_and_tracks_changes() {
    let mut path = PathList::new(vec![PathBuf::from("/usr/bin"), PathBuf::from("/bin")]);
    assert!(path.add(Path::new("/home/u/bin")));
    assert!(!path.add(Path::new("/home/u/bin")));
    assert!(path.add(Path::new("/home/u/app/bin")));

    assert_eq!(
        path.get(),
        &[
            PathBuf::from("/home/u/app/bin"),
            PathBuf::from("/home/u/bin"),
            PathBuf::from("/usr/bin"),
            PathBuf::from("/bin"),
        ]
    );
    assert!(path.changed());

    assert!(path.remove(Path::new("/home/u/app/bin")));
    assert!(path.remove(Path::new("/home/u/bin")));
    assert!(!path.remove(Path::new("/home/u/bin")));
    assert!(!path.changed());
    assert!(path.added().is_empty());
    assert!(path.removed().is_empty());
}

#[test]
fn empty_path_value_parses_to_empty_list() {
    assert!(PathList::parse(OsStr::new("")).get().is_empty());
}

#[test]
fn deeper_directory_overrides_variable_and_ascent_restores_ancestor_value() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    let actions = vec![set("/home/u/a", "X", "1"), set("/home/u/a/b", "X", "2")];

    shell.invoke("/home/u/a/b", actions.clone());
    assert_eq!(shell.var("X"), Some("2"));

    let outcome = shell.invoke("/home/u/a", actions.clone());
    assert_eq!(shell.var("X"), Some("1"));
    assert_eq!(
        outcome.changes,
        vec![EnvChange {
            key: "X".to_string(),
            value: Some("1".to_string()),
            restored: true,
        }]
    );

    shell.invoke("/home/u", actions);
    assert_eq!(shell.var("X"), Some("0"));
}

#[test]
fn same_bin_dir_from_two_levels_is_added_once() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin")]);
    let shared = "/opt/tools/bin";
    shell.invoke(
        "/home/u/a/b",
        vec![bin("/home/u/a", shared), bin("/home/u/a/b", shared)],
    );

    assert_eq!(shell.var("PATH"), Some("/opt/tools/bin:/usr/bin"));
}

#[test]
fn leaving_a_directory_restores_its_changes_and_keeps_ancestors() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    let actions = vec![
        bin("/home/u/a", "/home/u/a/bin"),
        bin("/home/u/a/b", "/home/u/a/b/bin"),
        set("/home/u/a/b", "X", "2"),
    ];

    shell.invoke("/home/u/a/b", actions.clone());
    assert_eq!(
        shell.var("PATH"),
        Some("/home/u/a/b/bin:/home/u/a/bin:/usr/bin")
    );
    assert_eq!(shell.var("X"), Some("2"));

    let outcome = shell.invoke("/home/u/a", actions);
    assert_eq!(shell.var("PATH"), Some("/home/u/a/bin:/usr/bin"));
    assert_eq!(shell.var("X"), Some("0"));
    assert_eq!(
        outcome.session.tracked_dirs(),
        vec![PathBuf::from("/home/u/a")]
    );
}

#[test]
fn variable_that_did_not_exist_is_unset_on_exit() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin")]);
    let actions = vec![set("/home/u/a", "GOPATH", "/home/u/a")];

    shell.invoke("/home/u/a", actions.clone());
    assert_eq!(shell.var("GOPATH"), Some("/home/u/a"));

    let outcome = shell.invoke("/home/u", actions);
    assert_eq!(shell.var("GOPATH"), None);
    assert_eq!(
        outcome.changes,
        vec![EnvChange {
            key: "GOPATH".to_string(),
            value: None,
            restored: true,
        }]
    );
}

#[test]
fn second_run_in_same_directory_emits_nothing() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    let actions = vec![
        bin("/home/u/a", "/home/u/a/bin"),
        set("/home/u/a", "X", "1"),
        set("/home/u/a/b", "X", "2"),
    ];

    let first = shell.invoke("/home/u/a/b", actions.clone());
    let session_after_first = shell.var(SESSION_VAR).map(str::to_string);
    let second = shell.invoke("/home/u/a/b", actions);

    assert!(!first.changes.is_empty());
    assert!(second.changes.is_empty());
    assert!(!second.path_changed);
    assert_eq!(shell.var(SESSION_VAR).map(str::to_string), session_after_first);
}

#[test]
fn removed_marker_entry_is_retired_while_directory_stays_in_scope() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);

    shell.invoke(
        "/home/u/a",
        vec![set("/home/u/a", "X", "1"), set("/home/u/a", "Y", "y")],
    );
    assert_eq!(shell.var("X"), Some("1"));

    let outcome = shell.invoke("/home/u/a", vec![set("/home/u/a", "Y", "y")]);
    assert_eq!(shell.var("X"), Some("0"));
    assert_eq!(shell.var("Y"), Some("y"));
    assert_eq!(
        outcome.report.events,
        vec![Event::EnvRestored {
            key: "X".to_string(),
            value: Some("0".to_string()),
        }]
    );
}

#[test]
fn retired_bin_dir_is_removed_from_path() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin")]);
    shell.invoke("/home/u/a", vec![bin("/home/u/a", "/home/u/a/bin")]);
    assert_eq!(shell.var("PATH"), Some("/home/u/a/bin:/usr/bin"));

    let outcome = shell.invoke("/home/u/a", Vec::new());
    assert_eq!(shell.var("PATH"), Some("/usr/bin"));
    assert!(outcome.session.undo.is_empty());
}

#[test]
fn stale_key_tracked_at_two_levels_is_restored_once_to_oldest_value() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    shell.invoke(
        "/home/u/a/b",
        vec![set("/home/u/a", "X", "1"), set("/home/u/a/b", "X", "2")],
    );
    assert_eq!(shell.var("X"), Some("2"));

    let outcome = shell.invoke("/home/u/a/b", Vec::new());
    assert_eq!(shell.var("X"), Some("0"));
    let restores = outcome
        .report
        .events
        .iter()
        .filter(|event| matches!(event, Event::EnvRestored { .. }))
        .count();
    assert_eq!(restores, 1);
    assert!(outcome.session.undo.is_empty());
}

#[test]
fn ancestor_override_survives_when_deeper_one_is_retired() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    shell.invoke(
        "/home/u/a/b",
        vec![set("/home/u/a", "X", "1"), set("/home/u/a/b", "X", "2")],
    );

    shell.invoke("/home/u/a/b", vec![set("/home/u/a", "X", "1")]);
    assert_eq!(shell.var("X"), Some("1"));

    shell.invoke("/home/u", vec![set("/home/u/a", "X", "1")]);
    assert_eq!(shell.var("X"), Some("0"));
}

#[test]
fn untrusted_directory_reverts_everything() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), ("X", "0")]);
    let actions = vec![
        bin("/home/u/a", "/home/u/a/bin"),
        set("/home/u/a/b", "X", "2"),
    ];
    shell.invoke("/home/u/a/b", actions.clone());

    let outcome = shell.invoke("/tmp", actions);
    assert_eq!(outcome.report.actions, 0);
    assert_eq!(shell.var("PATH"), Some("/usr/bin"));
    assert_eq!(shell.var("X"), Some("0"));
    assert!(outcome.session.undo.is_empty());
    assert_eq!(outcome.session.current_path, PathBuf::from("/tmp"));
}

#[test]
fn losing_trust_in_current_tree_retires_overrides() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin")]);
    let actions = vec![set("/home/u/a", "X", "1")];
    shell.invoke("/home/u/a", actions.clone());
    assert_eq!(shell.var("X"), Some("1"));

    shell.roots.clear();
    shell.invoke("/home/u/a", actions);
    assert_eq!(shell.var("X"), None);
}

#[test]
fn shallower_directory_reclaims_path_a_deeper_one_folded_out() {
    // `/home/u/a/b` claimed the entry first; once `/home/u/a` proposes it
    // too, leaving `b` removes it and `a` adds it back under its own name.
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin")]);
    let shared = "/opt/shared/bin";
    shell.invoke("/home/u/a/b", vec![bin("/home/u/a/b", shared)]);

    shell.invoke(
        "/home/u/a/b",
        vec![bin("/home/u/a", shared), bin("/home/u/a/b", shared)],
    );
    let outcome = shell.invoke("/home/u/a", vec![bin("/home/u/a", shared)]);

    assert_eq!(shell.var("PATH"), Some("/opt/shared/bin:/usr/bin"));
    assert!(!outcome.path_changed);
    assert_eq!(
        outcome.session.undo[Path::new("/home/u/a")].path_remove,
        [PathBuf::from(shared)].into_iter().collect::<BTreeSet<_>>()
    );
}

#[test]
fn corrupt_session_starts_over_without_failing() {
    let mut shell = FakeShell::new(&[("PATH", "/usr/bin"), (SESSION_VAR, "}{")]);
    let outcome = shell.invoke("/home/u/a", vec![set("/home/u/a", "X", "1")]);

    assert_eq!(shell.var("X"), Some("1"));
    assert_eq!(outcome.session.tracked_dirs(), vec![PathBuf::from("/home/u/a")]);
}

#[test]
fn shorten_prefers_current_directory_over_home() {
    let shorten = Shorten::new("/home/u", "/home/u/app");
    assert_eq!(shorten.path(Path::new("/home/u/app/bin")), "./bin");
    assert_eq!(shorten.path(Path::new("/home/u/app")), ".");
    assert_eq!(shorten.path(Path::new("/home/u/go")), "~/go");
    assert_eq!(shorten.path(Path::new("/usr/bin")), "/usr/bin");
    assert_eq!(shorten.value("main"), "main");
}

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AddPath(PathBuf),
    SetEnv { key: String, value: String },
}

/// A single effect proposed by a probe for one directory.
///
/// A probe that wants several effects returns several actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub source: PathBuf,
    pub effect: Effect,
}

impl Action {
    pub fn add_path(source: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            effect: Effect::AddPath(dir.into()),
        }
    }

    pub fn set_env(
        source: impl Into<PathBuf>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            effect: Effect::SetEnv {
                key: key.into(),
                value: value.into(),
            },
        }
    }
}

/// Orders actions shallow to deep.
///
/// Every ancestor's path is a strict prefix of its descendants', so the
/// length of the source path is a depth proxy. The sort is stable: actions
/// from the same directory keep probe registration order.
pub fn order_actions(mut actions: Vec<Action>) -> Vec<Action> {
    actions.sort_by_key(|action| action.source.as_os_str().len());
    actions
}

/// Shell variable names: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_env_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some(first) = bytes.first() else {
        return false;
    };
    (first.is_ascii_alphabetic() || *first == b'_')
        && bytes[1..]
            .iter()
            .all(|byte| byte.is_ascii_alphanumeric() || *byte == b'_')
}

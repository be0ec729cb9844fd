use std::collections::{BTreeMap, BTreeSet};

/// A variable change to hand to a shell writer. `value == None` unsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvChange {
    pub key: String,
    pub value: Option<String>,
    pub restored: bool,
}

/// In-memory view of the environment for one invocation.
///
/// The real environment is captured once in `base` and never mutated; every
/// write lands in `current`.
#[derive(Debug, Clone, Default)]
pub struct OverlayEnv {
    base: BTreeMap<String, String>,
    current: BTreeMap<String, Option<String>>,
    touched: BTreeSet<String>,
    restored: BTreeSet<String>,
}

impl OverlayEnv {
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            base: vars
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Captures the process environment. Entries that are not valid UTF-8
    /// are left out; envy never writes them.
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match self.current.get(key) {
            Some(value) => value.as_deref(),
            None => self.base.get(key).map(String::as_str),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.current
            .insert(key.to_string(), Some(value.to_string()));
        self.touched.insert(key.to_string());
        self.restored.remove(key);
    }

    pub fn restore(&mut self, key: &str, value: Option<&str>) {
        self.current
            .insert(key.to_string(), value.map(str::to_string));
        self.touched.insert(key.to_string());
        self.restored.insert(key.to_string());
    }

    /// Keys whose final value differs from the real environment:
    /// restorations first, then fresh overrides, each sorted by key.
    pub fn changes(&self) -> Vec<EnvChange> {
        let mut changes = self
            .touched
            .iter()
            .filter(|key| self.get(key) != self.base.get(key.as_str()).map(String::as_str))
            .map(|key| EnvChange {
                key: key.clone(),
                value: self.get(key).map(str::to_string),
                restored: self.restored.contains(key),
            })
            .collect::<Vec<_>>();
        changes.sort_by(|left, right| {
            right
                .restored
                .cmp(&left.restored)
                .then_with(|| left.key.cmp(&right.key))
        });
        changes
    }
}

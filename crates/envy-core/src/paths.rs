use std::path::{Path, PathBuf};

/// Component-wise subpath test: `/home/user` is under `/home` but not
/// under `/home/u`.
pub fn is_subpath(path: &Path, parent: &Path) -> bool {
    path.starts_with(parent)
}

pub fn is_subpath_of_any(path: &Path, parents: &[PathBuf]) -> bool {
    parents.iter().any(|parent| is_subpath(path, parent))
}

/// The directories to probe for one invocation: the current directory and
/// each parent, for as long as they stay under a trusted root.
///
/// Stored deepest-first. An untrusted current directory gives an empty chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorChain {
    dirs: Vec<PathBuf>,
}

impl AncestorChain {
    pub fn new(current: &Path, trusted_roots: &[PathBuf]) -> Self {
        let dirs = current
            .ancestors()
            .take_while(|dir| is_subpath_of_any(dir, trusted_roots))
            .map(Path::to_path_buf)
            .collect();
        Self { dirs }
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.iter().any(|candidate| candidate == dir)
    }

    pub fn deepest_first(&self) -> impl DoubleEndedIterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    pub fn shallowest_first(&self) -> impl DoubleEndedIterator<Item = &Path> {
        self.deepest_first().rev()
    }
}

/// Display helper: paths under the current directory render as `./rest`,
/// paths under home as `~/rest`.
#[derive(Debug, Clone)]
pub struct Shorten {
    pub home: PathBuf,
    pub current: PathBuf,
}

impl Shorten {
    pub fn new(home: impl Into<PathBuf>, current: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            current: current.into(),
        }
    }

    pub fn path(&self, path: &Path) -> String {
        if let Ok(rest) = path.strip_prefix(&self.current) {
            return prefixed(".", rest);
        }
        if let Ok(rest) = path.strip_prefix(&self.home) {
            return prefixed("~", rest);
        }
        path.display().to_string()
    }

    /// Shortens a value only when it looks like an absolute path.
    pub fn value(&self, value: &str) -> String {
        let path = Path::new(value);
        if path.is_absolute() {
            self.path(path)
        } else {
            value.to_string()
        }
    }
}

fn prefixed(marker: &str, rest: &Path) -> String {
    if rest.as_os_str().is_empty() {
        marker.to_string()
    } else {
        format!("{marker}/{}", rest.display())
    }
}

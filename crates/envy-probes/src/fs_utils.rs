use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

/// `stat` that treats a missing entry as `None` rather than an error.
pub(crate) fn metadata_if_exists(path: &Path) -> Result<Option<Metadata>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(err) if is_absent(&err) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to stat {}", path.display())),
    }
}

pub(crate) fn is_dir(path: &Path) -> Result<bool> {
    Ok(metadata_if_exists(path)?.is_some_and(|metadata| metadata.is_dir()))
}

pub(crate) fn is_file(path: &Path) -> Result<bool> {
    Ok(metadata_if_exists(path)?.is_some_and(|metadata| metadata.is_file()))
}

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

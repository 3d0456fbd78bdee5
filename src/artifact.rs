//! Locating the chart file an inquiry produced.

use crate::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Most recently modified regular file directly in `dir` whose mtime is
/// strictly after `since`.
///
/// Ties keep the first file in `read_dir` order. A missing directory yields
/// `None`; other listing errors are returned.
pub fn find_latest_after(dir: &Path, since: SystemTime) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            // Removed between listing and stat
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified()?;
        if modified <= since {
            continue;
        }
        if latest.as_ref().map_or(true, |(best, _)| modified > *best) {
            latest = Some((modified, entry.path()));
        }
    }

    if let Some((_, path)) = &latest {
        debug!("Latest file in {:?}: {:?}", dir, path);
    }
    Ok(latest.map(|(_, path)| path))
}

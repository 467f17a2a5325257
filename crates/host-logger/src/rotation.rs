// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::errors::StorageError;

/// Outcome of a rotation pass.
#[derive(Debug, Default)]
pub struct Rotation {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<StorageError>,
}

/// Delete the oldest files of `dir` until at most `limit` remain.
///
/// Files are ordered by name, which matches creation order for the names
/// produced by [`crate::file_storage::FileStorage`]. Directories are never
/// counted nor removed. A limit of zero disables rotation.
///
/// Failing to delete one file does not stop the pass; the failure is logged
/// and returned in [`Rotation::failed`].
pub fn rotate(dir: &Path, limit: usize) -> Result<Rotation, StorageError> {
    rotate_with(dir, limit, |path: &Path| fs::remove_file(path))
}

fn rotate_with(
    dir: &Path,
    limit: usize,
    mut remove: impl FnMut(&Path) -> io::Result<()>,
) -> Result<Rotation, StorageError> {
    let mut rotation = Rotation::default();
    if limit == 0 {
        return Ok(rotation);
    }

    let list_error = |source: io::Error| StorageError::ListDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_error)? {
        let entry = entry.map_err(list_error)?;
        let is_dir = entry.file_type().map_err(list_error)?.is_dir();
        if !is_dir {
            files.push(entry.path());
        }
    }

    if files.len() <= limit {
        return Ok(rotation);
    }

    files.sort();
    let excess = files.len() - limit;
    for path in files.into_iter().take(excess) {
        match remove(&path) {
            Ok(()) => {
                debug!("Removed old log file {}", path.display());
                rotation.removed.push(path);
            }
            Err(source) => {
                let err = StorageError::Remove { path, source };
                error!("{err}");
                rotation.failed.push(err);
            }
        }
    }

    Ok(rotation)
}

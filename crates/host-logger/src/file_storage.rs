// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::constants::{
    LOG_FILE_PREFIX, LOG_FILE_SEQUENCE_MAX, LOG_FILE_SEQUENCE_WIDTH, LOG_FILE_SUFFIX,
};
use crate::errors::StorageError;
use crate::log_buffer::LogBuffer;
use crate::{log_file, rotation};

/// Persistent storage of buffered host logs: one gzip file per flush in
/// `out_dir`, at most `max_files` of them (0 keeps everything).
#[derive(Debug, Clone)]
pub struct FileStorage {
    out_dir: PathBuf,
    max_files: usize,
}

impl FileStorage {
    #[must_use]
    pub fn new(out_dir: impl Into<PathBuf>, max_files: usize) -> Self {
        FileStorage {
            out_dir: out_dir.into(),
            max_files,
        }
    }

    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write the buffer content to a new file named after the current time.
    ///
    /// Returns the path of the new file, or `None` if the buffer was empty.
    /// The buffer itself is left untouched.
    pub fn save(&self, buffer: &LogBuffer) -> Result<Option<PathBuf>, StorageError> {
        self.save_at(buffer, Local::now())
    }

    pub fn save_at(
        &self,
        buffer: &LogBuffer,
        now: DateTime<Local>,
    ) -> Result<Option<PathBuf>, StorageError> {
        if buffer.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.out_dir).map_err(|source| StorageError::CreateDir {
            path: self.out_dir.clone(),
            source,
        })?;

        let path = self.unused_path(now);
        log_file::save(buffer, &path)?;

        // the new file is complete, failures past this point are only logged
        if let Err(err) = rotation::rotate(&self.out_dir, self.max_files) {
            error!("Log rotation failed: {err}");
        }

        Ok(Some(path))
    }

    // Several flushes within one second get a sequence suffix, numbered past
    // the newest file of that second still present. The fixed width keeps
    // name order equal to creation order; the last sequence is reused.
    fn unused_path(&self, now: DateTime<Local>) -> PathBuf {
        let stem = file_stem(now);
        let last = fs::read_dir(&self.out_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| sequence(&name, &stem))
            .max();

        let name = match last {
            None => format!("{stem}{LOG_FILE_SUFFIX}"),
            Some(seq) => format!(
                "{stem}_{:0width$}{LOG_FILE_SUFFIX}",
                seq.saturating_add(1).min(LOG_FILE_SEQUENCE_MAX),
                width = LOG_FILE_SEQUENCE_WIDTH
            ),
        };
        self.out_dir.join(name)
    }
}

/// `host_YYYYMMDD_HHMMSS`
fn file_stem(now: DateTime<Local>) -> String {
    format!("{LOG_FILE_PREFIX}{}", now.format("%Y%m%d_%H%M%S"))
}

fn sequence(name: &str, stem: &str) -> Option<usize> {
    let rest = name.strip_prefix(stem)?.strip_suffix(LOG_FILE_SUFFIX)?;
    if rest.is_empty() {
        return Some(0);
    }
    rest.strip_prefix('_')?.parse().ok()
}

/// Save the buffer and clear it on success.
///
/// A failed save is logged and keeps the buffer intact, so the next flush
/// retries the same messages.
pub fn flush_buffer(buffer: &mut LogBuffer, storage: &FileStorage) {
    if buffer.is_empty() {
        info!("Ignore flush: buffer is empty");
        return;
    }

    match storage.save(buffer) {
        Ok(Some(path)) => {
            buffer.clear();
            info!("Host logs flushed to {}", path.display());
        }
        Ok(None) => info!("Ignore flush: buffer is empty"),
        Err(err) => error!("Unable to flush host logs: {err}"),
    }
}

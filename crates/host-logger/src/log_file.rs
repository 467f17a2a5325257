// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Gzip compressed log file.
//!
//! A file holds one record per line:
//!
//! ```text
//! [ 12:00:00 ]: >>> Log collection started at 2024-05-01 12:00:00
//! [ 12:00:00 ]: first console line
//! [ 12:00:03 ]: second console line
//! ```
//!
//! Record times are local wall-clock time, the date is carried by the banner
//! record and by the file name. The file is written in place: a failure leaves
//! a truncated file behind.

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::StorageError;
use crate::message::Message;

const BANNER: &str = ">>> Log collection started at ";

pub struct LogFile {
    path: PathBuf,
    encoder: GzEncoder<BufWriter<File>>,
}

impl LogFile {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = File::create(&path).map_err(|source| StorageError::Create {
            path: path.clone(),
            source,
        })?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        Ok(LogFile { path, encoder })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one record.
    pub fn write(&mut self, timestamp: &DateTime<Local>, text: &[u8]) -> Result<(), StorageError> {
        let mut record = Vec::with_capacity(text.len() + 16);
        record.extend_from_slice(timestamp.format("[ %H:%M:%S ]: ").to_string().as_bytes());
        record.extend_from_slice(text);
        record.push(b'\n');

        self.encoder
            .write_all(&record)
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Finish the compressed stream and flush it to disk.
    pub fn close(self) -> Result<(), StorageError> {
        let LogFile { path, encoder } = self;
        encoder
            .finish()
            .and_then(|mut file| file.flush())
            .map_err(|source| StorageError::Close { path, source })
    }
}

/// Write `messages` to a new log file at `path`.
///
/// A banner record stamped with the first message's time comes first. Nothing
/// is created if there are no messages; returns whether a file was written.
pub fn save<'a, I>(messages: I, path: &Path) -> Result<bool, StorageError>
where
    I: IntoIterator<Item = &'a Message>,
{
    let mut messages = messages.into_iter().peekable();
    let Some(started) = messages.peek().map(|m| m.timestamp) else {
        return Ok(false);
    };

    let mut file = LogFile::create(path)?;
    let banner = format!("{BANNER}{}", started.format("%F %T"));
    file.write(&started, banner.as_bytes())?;
    for message in messages {
        file.write(&message.timestamp, message.as_bytes())?;
    }
    file.close()?;

    Ok(true)
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types of the host logger.

use std::io;
use std::path::PathBuf;

/// Invalid configuration, detected once at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value of environment variable {name}: '{value}', expected 'true' or 'false'")]
    InvalidBoolean { name: &'static str, value: String },

    #[error("Invalid value of environment variable {name}: '{value}', expected unsigned numeric value")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid value for mode: '{0}', expected either 'stream' or 'buffer'")]
    InvalidMode(String),

    #[error("Flush policy is set to save the buffer as it fills, but buffer's limits are not defined")]
    FlushFullWithoutLimits,

    #[error("Invalid STREAM_DST: too long ({len} bytes, at most {max} allowed)")]
    StreamDestinationTooLong { len: usize, max: usize },
}

/// Failure of a file system operation on the persisted logs.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unable to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("Unable to create file {}: {source}", path.display())]
    Create { path: PathBuf, source: io::Error },

    #[error("Unable to write file {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Unable to close file {}: {source}", path.display())]
    Close { path: PathBuf, source: io::Error },

    #[error("Unable to list directory {}: {source}", path.display())]
    ListDir { path: PathBuf, source: io::Error },

    #[error("Unable to delete file {}: {source}", path.display())]
    Remove { path: PathBuf, source: io::Error },
}

/// Failure talking to the console or to the stream destination.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Unable to connect to host console {name}: {source}")]
    Connect { name: String, source: io::Error },

    #[error("Unable to read host console: {0}")]
    Read(#[source] io::Error),

    #[error("Host console closed the connection")]
    ConsoleClosed,

    #[error("Unable to create output socket: {0}")]
    Socket(#[source] io::Error),

    #[error("Unable to send to the destination {destination}: {source}")]
    Send { destination: String, source: io::Error },

    #[error("Invalid stream destination '{0}'")]
    InvalidDestination(String),
}

/// Fatal errors of the service; the caller decides how to terminate.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unable to install signal handler: {0}")]
    Signal(#[source] io::Error),
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BUF_MAX_SIZE, DEFAULT_HOST_STATE, DEFAULT_MAX_FILES, DEFAULT_OUT_DIR,
    DEFAULT_STREAM_DESTINATION, UNIX_PATH_MAX,
};
use crate::errors::ConfigError;

/// Operating mode of the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Keep recent lines in memory, persist them to files on flush.
    #[default]
    Buffer,
    /// Forward every line to a datagram socket as soon as it is complete.
    Stream,
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buffer" => Ok(Mode::Buffer),
            "stream" => Ok(Mode::Stream),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Host logger configuration, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Suffix of the console socket name, empty for the default console
    pub socket_id: String,
    pub mode: Mode,
    /// Max number of buffered messages, 0 = unlimited
    pub buf_max_size: usize,
    /// Max age of buffered messages, zero = unlimited
    pub buf_max_time: Duration,
    /// Flush the buffer instead of dropping messages when a limit is hit
    pub buf_flush_full: bool,
    /// Period of the automatic flush timer, zero = disabled
    pub flush_period: Duration,
    /// Object path of the watched host, empty = no state watch
    pub host_state: String,
    pub out_dir: String,
    /// Max number of log files kept in `out_dir`, 0 = unlimited
    pub max_files: usize,
    /// Datagram socket of stream mode, `@name` for an abstract socket
    pub stream_destination: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket_id: String::new(),
            mode: Mode::Buffer,
            buf_max_size: DEFAULT_BUF_MAX_SIZE,
            buf_max_time: Duration::ZERO,
            buf_flush_full: false,
            flush_period: Duration::ZERO,
            host_state: DEFAULT_HOST_STATE.to_string(),
            out_dir: DEFAULT_OUT_DIR.to_string(),
            max_files: DEFAULT_MAX_FILES,
            stream_destination: DEFAULT_STREAM_DESTINATION.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(socket_id) = env_string("SOCKET_ID") {
            config.socket_id = socket_id;
        }
        if let Some(mode) = env_string("MODE") {
            config.mode = mode.parse()?;
        }

        match config.mode {
            Mode::Buffer => {
                if let Some(size) = env_number("BUF_MAXSIZE")? {
                    config.buf_max_size = size;
                }
                if let Some(time) = env_minutes("BUF_MAXTIME")? {
                    config.buf_max_time = time;
                }
                if let Some(flush_full) = env_bool("FLUSH_FULL")? {
                    config.buf_flush_full = flush_full;
                }
                if let Some(period) = env_minutes("FLUSH_PERIOD")? {
                    config.flush_period = period;
                }
                if let Some(host_state) = env_string("HOST_STATE") {
                    config.host_state = host_state;
                }
                if let Some(out_dir) = env_string("OUT_DIR") {
                    config.out_dir = out_dir;
                }
                if let Some(max_files) = env_number("MAX_FILES")? {
                    config.max_files = max_files;
                }
            }
            Mode::Stream => {
                if let Some(destination) = env_string("STREAM_DST") {
                    config.stream_destination = destination;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            Mode::Buffer => {
                if self.buf_flush_full && self.buf_max_size == 0 && self.buf_max_time.is_zero() {
                    return Err(ConfigError::FlushFullWithoutLimits);
                }
            }
            Mode::Stream => {
                // sun_path needs room for the terminator
                let len = self.stream_destination.len();
                if len + 1 > UNIX_PATH_MAX {
                    return Err(ConfigError::StreamDestinationTooLong {
                        len,
                        max: UNIX_PATH_MAX - 1,
                    });
                }
            }
        }
        Ok(())
    }

    /// True if nothing but a signal or shutdown would ever flush the buffer.
    #[must_use]
    pub fn auto_flush_disabled(&self) -> bool {
        self.host_state.is_empty() && !self.buf_flush_full && self.flush_period.is_zero()
    }
}

fn env_string(name: &'static str) -> Option<String> {
    env::var(name).ok()
}

fn env_bool(name: &'static str) -> Result<Option<bool>, ConfigError> {
    env_string(name)
        .map(|value| match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::InvalidBoolean { name, value }),
        })
        .transpose()
}

fn env_number(name: &'static str) -> Result<Option<usize>, ConfigError> {
    env_string(name)
        .map(|value| parse_number(name, value))
        .transpose()
}

fn env_minutes(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    env_string(name)
        .map(|value| {
            let minutes = parse_number(name, value.clone())?;
            (minutes as u64)
                .checked_mul(60)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidNumber { name, value })
        })
        .transpose()
}

// digits only: no sign, no whitespace, no radix prefix
fn parse_number(name: &'static str, value: String) -> Result<usize, ConfigError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidNumber { name, value });
    }
    value
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { name, value })
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Default maximum number of messages kept in the buffer.
pub const DEFAULT_BUF_MAX_SIZE: usize = 3000;

/// Default D-Bus object path of the watched host.
pub const DEFAULT_HOST_STATE: &str = "/xyz/openbmc_project/state/host0";

/// Default directory for the persisted log files.
pub const DEFAULT_OUT_DIR: &str = "/var/lib/obmc/hostlogs";

/// Default number of log files kept by rotation.
pub const DEFAULT_MAX_FILES: usize = 10;

/// Default datagram socket for stream mode (rsyslog console input).
pub const DEFAULT_STREAM_DESTINATION: &str = "/run/rsyslog/console_input";

/// Size of `sockaddr_un::sun_path`, terminator included.
pub const UNIX_PATH_MAX: usize = 108;

/// Abstract socket name of the host console server.
pub const CONSOLE_SOCKET_NAME: &str = "obmc-console";

/// The console server may start after us.
pub const CONSOLE_CONNECT_ATTEMPTS: u32 = 60;
pub const CONSOLE_CONNECT_PAUSE: Duration = Duration::from_secs(1);

// enough for most line-oriented output
pub const READ_BUFFER_SIZE: usize = 128;

/// Console reads taken in before a command is handled.
pub const CONSOLE_DRAIN_READS: usize = 32;

/// Longest datagram sent in stream mode; syslog truncates anything past it.
pub const STREAM_MESSAGE_MAX: usize = 1024;

pub const LOG_FILE_PREFIX: &str = "host_";
pub const LOG_FILE_SUFFIX: &str = ".log.gz";

/// Width of the same-second sequence suffix, `_NNNNNN`.
pub const LOG_FILE_SEQUENCE_WIDTH: usize = 6;
pub const LOG_FILE_SEQUENCE_MAX: usize = 999_999;

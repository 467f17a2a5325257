// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Connection to the host console server.

use std::io;
use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::UnixStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::constants::{
    CONSOLE_CONNECT_ATTEMPTS, CONSOLE_CONNECT_PAUSE, CONSOLE_SOCKET_NAME, READ_BUFFER_SIZE,
};
use crate::errors::TransportError;

/// Abstract socket name of the console, `obmc-console[.<id>]`.
#[must_use]
pub fn socket_name(socket_id: &str) -> String {
    if socket_id.is_empty() {
        CONSOLE_SOCKET_NAME.to_string()
    } else {
        format!("{CONSOLE_SOCKET_NAME}.{socket_id}")
    }
}

/// Connect to the console server.
///
/// The server may not be up yet, so the connection is retried for a while.
/// Cancelling the token aborts the wait.
pub async fn connect(
    socket_id: &str,
    cancel_token: &CancellationToken,
) -> Result<UnixStream, TransportError> {
    let name = socket_name(socket_id);
    let connect_error = |source: io::Error| TransportError::Connect {
        name: name.clone(),
        source,
    };

    let address = abstract_address(&name).map_err(connect_error)?;
    let mut attempt = 1;
    let stream = loop {
        match StdUnixStream::connect_addr(&address) {
            Ok(stream) => break stream,
            Err(e) if attempt < CONSOLE_CONNECT_ATTEMPTS => {
                debug!("Console {name} not available ({e}), attempt {attempt}");
                attempt += 1;
                tokio::select! {
                    _ = sleep(CONSOLE_CONNECT_PAUSE) => {}
                    _ = cancel_token.cancelled() => {
                        return Err(connect_error(io::Error::new(
                            io::ErrorKind::Interrupted,
                            "cancelled",
                        )));
                    }
                }
            }
            Err(e) => return Err(connect_error(e)),
        }
    };

    stream.set_nonblocking(true).map_err(connect_error)?;
    UnixStream::from_std(stream).map_err(connect_error)
}

#[cfg(target_os = "linux")]
fn abstract_address(name: &str) -> io::Result<SocketAddr> {
    use std::os::linux::net::SocketAddrExt;
    SocketAddr::from_abstract_name(name)
}

#[cfg(not(target_os = "linux"))]
fn abstract_address(_name: &str) -> io::Result<SocketAddr> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract sockets are not supported",
    ))
}

/// Reads the console in small chunks.
#[derive(Debug)]
pub struct ConsoleReader<C> {
    console: C,
    buf: [u8; READ_BUFFER_SIZE],
}

impl<C: AsyncRead + Unpin> ConsoleReader<C> {
    pub fn new(console: C) -> Self {
        ConsoleReader {
            console,
            buf: [0; READ_BUFFER_SIZE],
        }
    }

    /// Wait for the next chunk of console output.
    ///
    /// Cancel safe: dropping the future before it completes loses no data.
    pub async fn read(&mut self) -> Result<&[u8], TransportError> {
        loop {
            match self.console.read(&mut self.buf).await {
                Ok(0) => return Err(TransportError::ConsoleClosed),
                Ok(n) => return Ok(&self.buf[..n]),
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    warn!("Console read interrupted: {e}");
                }
                Err(e) => return Err(TransportError::Read(e)),
            }
        }
    }
}

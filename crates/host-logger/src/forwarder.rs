// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stream mode output: every console line becomes one datagram sent to a
//! local UNIX socket, typically the console input of the system log daemon.

use std::os::unix::net::{SocketAddr, UnixDatagram};

use crate::errors::TransportError;

/// Prefix marking an abstract socket name in the destination string.
const ABSTRACT_PREFIX: char = '@';

#[derive(Debug)]
pub struct StreamForwarder {
    socket: UnixDatagram,
    address: SocketAddr,
    destination: String,
}

impl StreamForwarder {
    /// Create an unbound datagram socket sending to `destination`.
    ///
    /// The destination is a file system path, or an abstract socket name when
    /// it starts with `@`. The peer does not need to exist yet.
    pub fn new(destination: &str) -> Result<Self, TransportError> {
        let address = parse_address(destination)?;
        let socket = UnixDatagram::unbound().map_err(TransportError::Socket)?;
        Ok(StreamForwarder {
            socket,
            address,
            destination: destination.to_string(),
        })
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Send one line as a single datagram.
    pub fn send(&self, line: &[u8]) -> Result<(), TransportError> {
        let mut sent = 0;
        loop {
            sent += self
                .socket
                .send_to_addr(&line[sent..], &self.address)
                .map_err(|source| TransportError::Send {
                    destination: self.destination.clone(),
                    source,
                })?;
            if sent >= line.len() {
                return Ok(());
            }
        }
    }
}

fn parse_address(destination: &str) -> Result<SocketAddr, TransportError> {
    let invalid = |_: std::io::Error| TransportError::InvalidDestination(destination.to_string());
    match destination.strip_prefix(ABSTRACT_PREFIX) {
        Some(name) => abstract_address(name).map_err(invalid),
        None if destination.is_empty() => {
            Err(TransportError::InvalidDestination(destination.to_string()))
        }
        None => SocketAddr::from_pathname(destination).map_err(invalid),
    }
}

#[cfg(target_os = "linux")]
fn abstract_address(name: &str) -> std::io::Result<SocketAddr> {
    use std::os::linux::net::SocketAddrExt;
    SocketAddr::from_abstract_name(name)
}

#[cfg(not(target_os = "linux"))]
fn abstract_address(_name: &str) -> std::io::Result<SocketAddr> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "abstract sockets are not supported",
    ))
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host console log collector.
//!
//! The crate turns the byte stream of a host's serial console into discrete
//! log lines and either keeps a bounded window of them in memory, periodically
//! persisted to rotated gzip files, or forwards every line to a local datagram
//! socket as soon as it is complete.
//!
//! ```text
//!   console bytes ──> Segmenter ──┬──> LogBuffer ──flush──> LogFile (.log.gz) ──> rotate
//!                                 └──> StreamForwarder ──> datagram socket
//! ```
//!
//! The engine (`segmenter`, `log_buffer`, `log_file`, `rotation`, `forwarder`)
//! is synchronous and single-writer. The `service` module serializes console
//! reads and flush triggers on top of it.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod console;
pub mod constants;
pub mod errors;
pub mod file_storage;
pub mod forwarder;
pub mod host_state;
pub mod log_buffer;
pub mod log_file;
pub mod message;
pub mod rotation;
pub mod segmenter;
pub mod service;
pub mod sink;

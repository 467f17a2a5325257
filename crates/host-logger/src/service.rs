// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The host logger service.
//!
//! One task owns the console and the sink. Console data, flush requests,
//! host state changes and the flush timer are all handled by that task, so
//! the buffer and the output directory never see two writers.

use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{Config, Mode};
use crate::console::ConsoleReader;
use crate::constants::CONSOLE_DRAIN_READS;
use crate::errors::{ServiceError, TransportError};
use crate::host_state::requires_flush;
use crate::sink::Sink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Save the buffer now.
    Flush,
    /// A watched host property changed.
    HostStateChanged {
        interface: String,
        property: String,
        value: String,
    },
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ServiceHandle {
    tx: mpsc::UnboundedSender<ServiceCommand>,
}

impl ServiceHandle {
    pub fn flush(&self) -> Result<(), mpsc::error::SendError<ServiceCommand>> {
        self.tx.send(ServiceCommand::Flush)
    }

    pub fn host_state_changed(
        &self,
        interface: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), mpsc::error::SendError<ServiceCommand>> {
        self.tx.send(ServiceCommand::HostStateChanged {
            interface: interface.into(),
            property: property.into(),
            value: value.into(),
        })
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<ServiceCommand>> {
        self.tx.send(ServiceCommand::Shutdown)
    }
}

pub struct Service<C> {
    console: ConsoleReader<C>,
    sink: Sink,
    rx: mpsc::UnboundedReceiver<ServiceCommand>,
    flush_period: Option<Duration>,
    watch_host_state: bool,
}

impl<C: AsyncRead + Unpin> Service<C> {
    pub fn new(config: &Config, console: C) -> Result<(Self, ServiceHandle), ServiceError> {
        config.validate()?;
        let sink = Sink::from_config(config)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let buffered = config.mode == Mode::Buffer;
        let flush_period = Some(config.flush_period).filter(|p| buffered && !p.is_zero());

        if buffered && config.auto_flush_disabled() {
            warn!("Automatic flush disabled");
        }
        debug!(
            socket_id = %config.socket_id,
            mode = ?config.mode,
            buf_max_size = config.buf_max_size,
            buf_max_time = ?config.buf_max_time,
            buf_flush_full = config.buf_flush_full,
            flush_period = ?config.flush_period,
            host_state = %config.host_state,
            out_dir = %config.out_dir,
            max_files = config.max_files,
            stream_destination = %config.stream_destination,
            "Initialization complete"
        );

        let service = Self {
            console: ConsoleReader::new(console),
            sink,
            rx,
            flush_period,
            watch_host_state: buffered && !config.host_state.is_empty(),
        };
        let handle = ServiceHandle { tx };

        Ok((service, handle))
    }

    /// Run until shut down or until the console goes away.
    ///
    /// Whatever is left in the buffer is flushed before returning.
    pub async fn run(self) -> Result<(), ServiceError> {
        let Service {
            mut console,
            mut sink,
            mut rx,
            flush_period,
            watch_host_state,
        } = self;

        let mut timer = flush_period.map(|period| {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });

        debug!("Host logger service started");

        let result = loop {
            tokio::select! {
                read = console.read() => match read {
                    Ok(data) => sink.consume(data),
                    Err(TransportError::ConsoleClosed) => {
                        break Err(TransportError::ConsoleClosed.into());
                    }
                    Err(e) => error!("{e}"),
                },

                command = rx.recv() => {
                    drain(&mut console, &mut sink).await;
                    match command {
                        Some(ServiceCommand::Flush) => sink.flush(),
                        Some(ServiceCommand::HostStateChanged { interface, property, value }) => {
                            if watch_host_state && requires_flush(&interface, &property, &value) {
                                info!("Host state changed to {value}, flushing host logs");
                                sink.flush();
                            } else {
                                debug!("Ignore host state change {interface}.{property} = {value}");
                            }
                        }
                        Some(ServiceCommand::Shutdown) | None => break Ok(()),
                    }
                }

                () = tick(&mut timer) => sink.flush(),
            }
        };

        sink.finish();
        debug!("Host logger service stopped");
        result
    }
}

// Take in what the console already delivered, without waiting for more.
// Bounded so that a console that never goes quiet cannot hold a command back.
async fn drain<C: AsyncRead + Unpin>(console: &mut ConsoleReader<C>, sink: &mut Sink) {
    for _ in 0..CONSOLE_DRAIN_READS {
        match timeout(Duration::ZERO, console.read()).await {
            Ok(Ok(data)) => sink.consume(data),
            _ => break,
        }
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::process::ExitCode;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use host_logger::{config::Config, console, errors::ServiceError, service::Service};
use tokio_util::sync::CancellationToken;

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("HOST_LOGGER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or(DEFAULT_LOG_LEVEL.to_string());

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).expect("could not parse HOST_LOGGER_LOG_LEVEL"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), ServiceError> {
    let mut sigusr1 = signal(SignalKind::user_defined1()).map_err(ServiceError::Signal)?;
    let sigterm = signal(SignalKind::terminate()).map_err(ServiceError::Signal)?;
    let sigint = signal(SignalKind::interrupt()).map_err(ServiceError::Signal)?;

    let shutdown_token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(sigterm, sigint, shutdown_token.clone()));

    let console = match console::connect(&config.socket_id, &shutdown_token).await {
        Ok(console) => console,
        Err(_) if shutdown_token.is_cancelled() => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let (service, handle) = Service::new(&config, console)?;
    let service = service.run();
    tokio::pin!(service);

    let mut stopping = false;
    loop {
        tokio::select! {
            result = &mut service => return result,
            _ = sigusr1.recv() => {
                info!("Flush requested by signal");
                if let Err(e) = handle.flush() {
                    error!("Failed to send flush command: {e}");
                }
            }
            () = shutdown_token.cancelled(), if !stopping => {
                stopping = true;
                if let Err(e) = handle.shutdown() {
                    error!("Failed to send shutdown command: {e}");
                }
            }
        }
    }
}

async fn cancel_on_signal(mut sigterm: Signal, mut sigint: Signal, token: CancellationToken) {
    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        _ = sigint.recv() => info!("SIGINT received, shutting down"),
    }
    token.cancel();
}

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;

use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cloudwatch_logs_backend::{
    severity::{LOG_DEBUG, LOG_INFO},
    BackendConfig, BackendService, EngineState, FlushEngine, LogCall,
};

const DEFAULT_PACKAGE: &str = "stdin";

/// Splits an optional `<N>` priority prefix off a line, as written by programs
/// logging to the systemd journal through stderr.
fn split_priority(line: &str) -> (u8, &str) {
    let Some(rest) = line.strip_prefix('<') else {
        return (LOG_INFO, line);
    };
    match rest.split_once('>') {
        Some((digits, message)) if digits.len() == 1 => match digits.parse::<u8>() {
            Ok(severity) if severity <= LOG_DEBUG => (severity, message),
            _ => (LOG_INFO, line),
        },
        _ => (LOG_INFO, line),
    }
}

#[tokio::main]
pub async fn main() {
    let log_level = env::var("CWL_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match BackendConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration, shutting down: {e}");
            return;
        }
    };
    let package = env::var("CWL_PIPE_PACKAGE").unwrap_or_else(|_| DEFAULT_PACKAGE.to_string());

    info!(
        "Shipping stdin to {}/{}",
        config.log_group_name, config.log_stream_name
    );

    let engine = FlushEngine::open(&config).await;
    let (service, handle) = BackendService::new(engine);
    let service_task = tokio::spawn(service.run());

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let (severity, message) = split_priority(&line);
                let call = LogCall::new(message, severity).with_package(package.as_str());
                if let Err(e) = handle.append(call) {
                    error!("Backend service stopped unexpectedly: {e}");
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        }
    }

    match handle.close().await {
        Ok(EngineState::Active) => debug!("Closed, all lines shipped"),
        Ok(EngineState::Disabled) => error!("Closed after a failed write, some lines were dropped"),
        Err(e) => error!("Failed to close backend: {e}"),
    }
    if let Err(e) = service_task.await {
        error!("Backend service task failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudwatch_logs_backend::severity::{LOG_EMERG, LOG_ERR};

    #[test]
    fn test_split_priority() {
        assert_eq!(split_priority("<3>disk full"), (LOG_ERR, "disk full"));
        assert_eq!(split_priority("<0>panic"), (LOG_EMERG, "panic"));
        assert_eq!(split_priority("<7>"), (LOG_DEBUG, ""));
    }

    #[test]
    fn test_split_priority_keeps_unprefixed_lines() {
        assert_eq!(split_priority("plain line"), (LOG_INFO, "plain line"));
        assert_eq!(split_priority("<9>out of range"), (LOG_INFO, "<9>out of range"));
        assert_eq!(split_priority("<html>"), (LOG_INFO, "<html>"));
        assert_eq!(split_priority("<3 unterminated"), (LOG_INFO, "<3 unterminated"));
    }
}

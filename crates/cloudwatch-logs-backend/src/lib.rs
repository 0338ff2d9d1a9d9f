// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffered log backend for AWS CloudWatch Logs.
//!
//! Log calls are formatted into single-line records, grouped into batches that
//! stay under the service's size and count limits, and written in order to one
//! log stream while carrying the stream's sequence token from write to write.
//! The first write that fails turns the backend off for the rest of its life.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod accountant;
pub mod api;
pub mod buffer;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod flusher;
pub mod record;
pub mod service;
pub mod session;
pub mod severity;
mod sigv4;

#[cfg(test)]
mod test_support;

pub use accountant::SizeAccountant;
pub use api::{ApiError, LogStreamApi};
pub use buffer::BatchBuffer;
pub use client::CloudWatchLogsClient;
pub use config::{BackendConfig, FlushPolicy, Profile, RetryStrategy};
pub use error::ConfigError;
pub use flusher::{EngineState, FlushEngine};
pub use record::{LogCall, LogRecord, RecordFormatter};
pub use service::{BackendCommand, BackendHandle, BackendService};
pub use session::{StreamIdentity, StreamSession};
pub use severity::SeverityLabels;

// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flush engine: buffering, batching and the disable-on-failure latch.
//!
//! # Architecture
//!
//! ```text
//!   LogCall
//!      │
//!      v
//!   ┌──────────────┐
//!   │  Formatter   │ (label, package column, timestamp)
//!   └──────┬───────┘
//!          │
//!          v
//!   ┌──────────────┐  full batch
//!   │ BatchBuffer  │ ───────────┐
//!   └──────┬───────┘            │
//!          │ flush / close      │
//!          v                    v
//!   ┌──────────────────────────────┐
//!   │ StreamSession::put_events    │ (sequence token in, next token out)
//!   └──────────────┬───────────────┘
//!                  │ failure after all attempts
//!                  v
//!              Disabled (terminal)
//! ```
//!
//! # States
//!
//! - **Active**: records are buffered and written
//! - **Disabled**: entered on the first write that fails after every configured
//!   attempt; the failed batch is dropped and every later call is a no-op
//!
//! The engine never returns errors to the host: remote failures are logged and
//! turn into the `Disabled` state.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};

use crate::accountant::SizeAccountant;
use crate::api::{InputLogEvent, LogStreamApi, DATA_ALREADY_ACCEPTED};
use crate::buffer::BatchBuffer;
use crate::client::CloudWatchLogsClient;
use crate::config::{BackendConfig, FlushPolicy, RetryStrategy};
use crate::record::{LogCall, LogRecord, RecordFormatter};
use crate::session::StreamSession;
use crate::severity::SeverityLabels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Active,
    Disabled,
}

/// Buffers formatted records and writes them to one CloudWatch Logs stream.
///
/// All methods take `&mut self`: a single owner drives appends and flushes, which
/// keeps batches in order and the sequence token consistent. Hosts with several
/// producers wrap the engine in [`crate::service::BackendService`].
pub struct FlushEngine {
    session: StreamSession,
    buffer: BatchBuffer,
    accountant: SizeAccountant,
    formatter: RecordFormatter,
    policy: FlushPolicy,
    retry_strategy: RetryStrategy,
    state: EngineState,
}

impl FlushEngine {
    /// Opens the engine from configuration.
    ///
    /// Without a profile, or when the HTTP client cannot be built, the engine opens
    /// without a client and never makes a network call.
    pub async fn open(config: &BackendConfig) -> Self {
        let client = config.profile.as_ref().and_then(|profile| {
            match CloudWatchLogsClient::new(profile, config.timeout()) {
                Ok(client) => Some(Arc::new(client) as Arc<dyn LogStreamApi>),
                Err(e) => {
                    error!("CLOUDWATCH | Failed to create client, log shipping disabled: {e}");
                    None
                }
            }
        });
        Self::open_with_client(config, client).await
    }

    /// Opens the engine on top of any implementation of the remote API.
    pub async fn open_with_client(
        config: &BackendConfig,
        client: Option<Arc<dyn LogStreamApi>>,
    ) -> Self {
        let session =
            StreamSession::open(config.identity(), client, config.auto_create_stream).await;

        FlushEngine {
            session,
            buffer: BatchBuffer::default(),
            accountant: config.accountant(),
            formatter: RecordFormatter::new(SeverityLabels::default()),
            policy: config.flush_policy,
            retry_strategy: config.retry_strategy,
            state: EngineState::Active,
        }
    }

    /// Formats and buffers one log call.
    ///
    /// A full buffer is flushed before the record is added. With
    /// [`FlushPolicy::Eager`] the buffer is flushed after every call.
    pub async fn append(&mut self, call: LogCall) {
        if !self.is_writable() {
            return;
        }

        let record = self.formatter.format_call(&call);
        if let Some(full_batch) = self.buffer.append(record, &self.accountant) {
            debug!(
                "CLOUDWATCH | Batch limit reached, flushing {} events",
                full_batch.len()
            );
            self.send(full_batch).await;
        }

        if self.policy == FlushPolicy::Eager {
            self.flush().await;
        }
    }

    /// Writes every buffered record as one batch.
    ///
    /// No-op when disabled, when there is no client or when nothing is buffered.
    pub async fn flush(&mut self) {
        if !self.is_writable() || self.buffer.is_empty() {
            return;
        }
        let batch = self.buffer.drain();
        self.send(batch).await;
    }

    /// Flushes whatever is still buffered below the batching thresholds.
    pub async fn close(&mut self) {
        debug!("CLOUDWATCH | Closing, {} events buffered", self.buffer.len());
        self.flush().await;
    }

    async fn send(&mut self, batch: Vec<LogRecord>) {
        let n_events = batch.len();
        let events: Vec<InputLogEvent> = batch.into_iter().map(InputLogEvent::from).collect();
        let attempts = self.retry_strategy.attempts().max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let time = Instant::now();
            let result = self.session.put_events(events.clone()).await;
            let elapsed = time.elapsed();

            let err = match result {
                Ok(()) => {
                    debug!(
                        "CLOUDWATCH | Flushed {n_events} events in {} ms",
                        elapsed.as_millis()
                    );
                    return;
                }
                Err(err) => err,
            };

            if let Some(expected) = err.expected_sequence_token() {
                self.session.adopt_expected_token(expected);
                if err.code() == Some(DATA_ALREADY_ACCEPTED) {
                    warn!("CLOUDWATCH | Batch of {n_events} events was already accepted");
                    return;
                }
            }

            if attempt >= attempts {
                error!(
                    "CLOUDWATCH | Failed to send {n_events} events after {} ms and {attempt} attempts, disabling log shipping: {err}",
                    elapsed.as_millis()
                );
                self.disable();
                return;
            }

            debug!("CLOUDWATCH | Attempt {attempt} failed, retrying: {err}");
            if let Some(delay) = self.retry_strategy.delay_after(attempt) {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn disable(&mut self) {
        self.state = EngineState::Disabled;
        let dropped = self.buffer.drain().len();
        if dropped > 0 {
            debug!("CLOUDWATCH | Dropped {dropped} buffered events");
        }
    }

    fn is_writable(&self) -> bool {
        self.state == EngineState::Active && self.session.is_enabled()
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    #[must_use]
    pub fn buffered_events(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn session(&self) -> &StreamSession {
        &self.session
    }
}

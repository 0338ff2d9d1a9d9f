// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Stream identity, provisioning and sequence token continuity.
//!
//! # Open Handshake
//!
//! ```text
//!   open
//!     │
//!     ├── no client ──────────────> disabled (every write is a no-op)
//!     │
//!     v
//!   DescribeLogStreams(prefix = stream name, all pages)
//!     │
//!     ├── exact match with token ─> adopt token
//!     ├── exact match, no token ──> fresh stream, no token
//!     └── no match ──> CreateLogStream (if auto-create), errors swallowed
//! ```
//!
//! Discovery and creation failures never disable the session: the next write
//! surfaces the real error.
//!
//! # Token Continuity
//!
//! The token sent with write N+1 is always the `nextSequenceToken` returned by
//! write N. Writes take `&mut self`, so two writes can never race on the token.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{
    ApiError, CreateLogStreamRequest, DescribeLogStreamsRequest, InputLogEvent, LogStreamApi,
    PutLogEventsRequest,
};
use crate::record::LogRecord;

/// Log group and stream the session writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    pub group_name: String,
    pub stream_name: String,
}

impl StreamIdentity {
    #[must_use]
    pub fn new(group_name: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            stream_name: stream_name.into(),
        }
    }
}

/// Owns the remote client, the stream identity and the current sequence token.
pub struct StreamSession {
    identity: StreamIdentity,
    client: Option<Arc<dyn LogStreamApi>>,
    sequence_token: Option<String>,
}

impl StreamSession {
    /// A session without a client. Every write is skipped.
    #[must_use]
    pub fn disabled(identity: StreamIdentity) -> Self {
        Self {
            identity,
            client: None,
            sequence_token: None,
        }
    }

    /// Opens the session: discovers the stream's upload token and creates the
    /// stream when it is missing and `auto_create` is set.
    pub async fn open(
        identity: StreamIdentity,
        client: Option<Arc<dyn LogStreamApi>>,
        auto_create: bool,
    ) -> Self {
        let Some(client) = client else {
            debug!("CLOUDWATCH | No credentials configured, log shipping disabled");
            return Self::disabled(identity);
        };

        let mut session = Self {
            identity,
            client: Some(client),
            sequence_token: None,
        };
        session.prepare(auto_create).await;
        session
    }

    async fn prepare(&mut self, auto_create: bool) {
        let Some(client) = self.client.clone() else {
            return;
        };

        match self.discover(client.as_ref()).await {
            Ok(Some(token)) => {
                debug!(
                    "CLOUDWATCH | Found stream {}/{} with upload token",
                    self.identity.group_name, self.identity.stream_name
                );
                self.sequence_token = token;
            }
            Ok(None) if auto_create => {
                let request = CreateLogStreamRequest {
                    log_group_name: self.identity.group_name.clone(),
                    log_stream_name: self.identity.stream_name.clone(),
                };
                match client.create_log_stream(request).await {
                    Ok(()) => debug!(
                        "CLOUDWATCH | Created stream {}/{}",
                        self.identity.group_name, self.identity.stream_name
                    ),
                    Err(e) => debug!("CLOUDWATCH | Failed to create stream: {e}"),
                }
            }
            Ok(None) => debug!(
                "CLOUDWATCH | Stream {}/{} not found and auto-create is off",
                self.identity.group_name, self.identity.stream_name
            ),
            Err(e) => debug!("CLOUDWATCH | Failed to describe streams: {e}"),
        }
    }

    /// Looks for the configured stream among all streams sharing its name as prefix.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))`: the stream exists, `token` is its upload token if any
    /// - `Ok(None)`: no stream with exactly this name exists
    async fn discover(
        &self,
        client: &dyn LogStreamApi,
    ) -> Result<Option<Option<String>>, ApiError> {
        let mut next_token = None;
        loop {
            let response = client
                .describe_log_streams(DescribeLogStreamsRequest {
                    log_group_name: self.identity.group_name.clone(),
                    log_stream_name_prefix: self.identity.stream_name.clone(),
                    next_token,
                })
                .await?;

            if let Some(stream) = response
                .log_streams
                .into_iter()
                .find(|s| s.log_stream_name == self.identity.stream_name)
            {
                return Ok(Some(stream.upload_sequence_token));
            }

            match response.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(None),
            }
        }
    }

    /// Writes one ordered batch and advances the sequence token.
    ///
    /// Returns `Ok(())` without a network call when the session has no client or
    /// the batch is empty.
    pub async fn put_records(&mut self, records: Vec<LogRecord>) -> Result<(), ApiError> {
        self.put_events(records.into_iter().map(InputLogEvent::from).collect())
            .await
    }

    pub(crate) async fn put_events(
        &mut self,
        log_events: Vec<InputLogEvent>,
    ) -> Result<(), ApiError> {
        let Some(client) = self.client.clone() else {
            return Ok(());
        };
        if log_events.is_empty() {
            return Ok(());
        }

        let n_events = log_events.len();
        let request = PutLogEventsRequest {
            log_group_name: self.identity.group_name.clone(),
            log_stream_name: self.identity.stream_name.clone(),
            log_events,
            sequence_token: self.sequence_token.clone(),
        };
        let response = client.put_log_events(request).await?;

        if let Some(rejected) = &response.rejected_log_events_info {
            warn!("CLOUDWATCH | Service rejected some of {n_events} events: {rejected:?}");
        }
        if response.next_sequence_token.is_some() {
            self.sequence_token = response.next_sequence_token;
        }
        Ok(())
    }

    /// Replaces the token after the service reported the one it expects.
    pub(crate) fn adopt_expected_token(&mut self, token: &str) {
        self.sequence_token = Some(token.to_string());
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    #[must_use]
    pub fn sequence_token(&self) -> Option<&str> {
        self.sequence_token.as_deref()
    }
}

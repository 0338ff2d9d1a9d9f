// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Contract of the remote log-stream service.
//!
//! The three CloudWatch Logs operations the backend relies on are modelled by the
//! [`LogStreamApi`] trait. [`crate::client::CloudWatchLogsClient`] implements it
//! over HTTP; tests substitute a recording fake.
//!
//! Request and response types serialize to the exact JSON field names of the
//! `Logs_20140328` protocol.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::LogRecord;

/// Service error code returned when the supplied sequence token is stale.
pub const INVALID_SEQUENCE_TOKEN: &str = "InvalidSequenceTokenException";
/// Service error code returned when the batch was already accepted.
pub const DATA_ALREADY_ACCEPTED: &str = "DataAlreadyAcceptedException";

/// Error taxonomy of a remote call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-success status.
    #[error("{code} (status {status}): {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        /// Token the service expected, reported on sequence token mismatches.
        expected_sequence_token: Option<String>,
    },
    /// Transport-level issue (DNS, TLS, socket, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Request or response payload could not be (de)serialized.
    #[error("failed to encode or decode payload: {0}")]
    Codec(#[from] serde_json::Error),
    /// Request could not be signed with the configured credentials.
    #[error("failed to sign request: {0}")]
    Signing(String),
    /// The HTTP client could not be built from the profile.
    #[error("failed to build client: {0}")]
    ClientBuild(String),
}

impl ApiError {
    /// Service error code, if the failure came from the service itself.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Token the service reported as expected, on sequence token mismatches.
    #[must_use]
    pub fn expected_sequence_token(&self) -> Option<&str> {
        match self {
            Self::Service {
                code,
                expected_sequence_token,
                ..
            } if code == INVALID_SEQUENCE_TOKEN || code == DATA_ALREADY_ACCEPTED => {
                expected_sequence_token.as_deref()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsRequest {
    pub log_group_name: String,
    pub log_stream_name_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeLogStreamsResponse {
    #[serde(default)]
    pub log_streams: Vec<LogStreamDescription>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// One entry of a `DescribeLogStreams` listing. Unused fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStreamDescription {
    pub log_stream_name: String,
    #[serde(default)]
    pub upload_sequence_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogStreamRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
}

/// A single event inside a `PutLogEvents` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputLogEvent {
    pub message: String,
    pub timestamp: i64,
}

impl From<LogRecord> for InputLogEvent {
    fn from(record: LogRecord) -> Self {
        Self {
            timestamp: record.timestamp_millis(),
            message: record.text().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    pub log_events: Vec<InputLogEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsResponse {
    #[serde(default)]
    pub next_sequence_token: Option<String>,
    #[serde(default)]
    pub rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

/// Indexes of events the service accepted the request for but did not store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLogEventsInfo {
    #[serde(default)]
    pub too_new_log_event_start_index: Option<i64>,
    #[serde(default)]
    pub too_old_log_event_end_index: Option<i64>,
    #[serde(default)]
    pub expired_log_event_end_index: Option<i64>,
}

/// The remote operations the backend needs from a log-stream service.
#[async_trait]
pub trait LogStreamApi: Send + Sync {
    /// Lists one page of streams in a group whose names start with a prefix.
    async fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> Result<DescribeLogStreamsResponse, ApiError>;

    /// Creates a stream in an existing group.
    async fn create_log_stream(&self, request: CreateLogStreamRequest) -> Result<(), ApiError>;

    /// Appends an ordered batch of events to a stream.
    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError>;
}

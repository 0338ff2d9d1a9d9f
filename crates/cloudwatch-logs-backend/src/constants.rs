// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch Logs API limits and protocol constants.
//!
//! The `PutLogEvents` operation enforces per-request limits:
//! - **Batch size**: sum of all event messages plus a fixed per-event overhead
//! - **Batch count**: maximum number of events in one request
//!
//! Defaults mirror the documented service limits. All of them can be
//! overridden through [`crate::config::BackendConfig`].

/// Maximum accounted size of one `PutLogEvents` request in bytes.
///
/// # Value: 1MB (1,048,576 bytes)
///
/// The service counts the UTF-8 length of every message plus
/// [`EVENT_OVERHEAD_BYTES`] per event against this budget.
pub const MAX_BATCH_SIZE_BYTES: usize = 1_024 * 1_024;

/// Maximum number of log events in one `PutLogEvents` request.
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Fixed overhead the service charges for each log event, in bytes.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Column width the package label is padded (or truncated) to in formatted records.
pub const PACKAGE_LABEL_WIDTH: usize = 20;

/// JSON protocol target prefix for CloudWatch Logs operations.
pub(crate) const TARGET_PREFIX: &str = "Logs_20140328";

/// Content type of the AWS JSON 1.1 protocol.
pub(crate) const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Signing name of the CloudWatch Logs service.
pub(crate) const SERVICE_NAME: &str = "logs";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

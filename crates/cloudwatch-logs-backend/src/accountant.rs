// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire-accounted size of log records and batch budget checks.

use crate::buffer::BatchBuffer;
use crate::constants;
use crate::record::LogRecord;

/// Computes the size the remote service charges for a record and decides when
/// a buffer has to be flushed before taking another one.
///
/// # Default Values
///
/// - **Event overhead**: 26 bytes ([`constants::EVENT_OVERHEAD_BYTES`])
/// - **Max batch bytes**: 1MB ([`constants::MAX_BATCH_SIZE_BYTES`])
/// - **Max batch events**: 10,000 ([`constants::MAX_BATCH_EVENTS`])
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeAccountant {
    event_overhead_bytes: usize,
    max_batch_bytes: usize,
    max_batch_events: usize,
}

impl Default for SizeAccountant {
    fn default() -> Self {
        Self {
            event_overhead_bytes: constants::EVENT_OVERHEAD_BYTES,
            max_batch_bytes: constants::MAX_BATCH_SIZE_BYTES,
            max_batch_events: constants::MAX_BATCH_EVENTS,
        }
    }
}

impl SizeAccountant {
    #[must_use]
    pub fn new(
        event_overhead_bytes: usize,
        max_batch_bytes: usize,
        max_batch_events: usize,
    ) -> Self {
        Self {
            event_overhead_bytes,
            max_batch_bytes,
            max_batch_events,
        }
    }

    /// Bytes of the record text plus the fixed per-event overhead.
    #[must_use]
    pub fn record_cost(&self, record: &LogRecord) -> usize {
        record.text().len() + self.event_overhead_bytes
    }

    /// Returns `true` when adding a record of `candidate_cost` would reach the byte
    /// budget, or when the buffer already holds the maximum number of events.
    #[must_use]
    pub fn would_exceed(&self, buffer: &BatchBuffer, candidate_cost: usize) -> bool {
        buffer.occupied_bytes() + candidate_cost >= self.max_batch_bytes
            || buffer.len() >= self.max_batch_events
    }

    #[must_use]
    pub fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }

    #[must_use]
    pub fn max_batch_events(&self) -> usize {
        self.max_batch_events
    }
}

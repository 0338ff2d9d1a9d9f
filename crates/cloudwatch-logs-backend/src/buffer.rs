// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory batch buffer for pending log records.
//!
//! Records are kept in append order until the flush engine drains them into
//! one `PutLogEvents` request. CloudWatch requires events inside a request to be
//! in non-decreasing timestamp order, so the buffer never reorders.
//!
//! # Batching Strategy
//!
//! The buffer is flushed *before* it would cross a limit, never after:
//! 1. **Size limit**: occupied bytes plus the next record reaches the byte budget
//! 2. **Count limit**: the buffer already holds the maximum number of events
//!
//! In both cases [`BatchBuffer::append`] hands the current contents back to the
//! caller for flushing, then starts the next batch with the new record.

use std::collections::VecDeque;

use crate::accountant::SizeAccountant;
use crate::record::LogRecord;

/// Ordered sequence of pending records plus their accounted byte total.
///
/// `occupied_bytes` always equals the sum of [`SizeAccountant::record_cost`] for
/// every buffered record.
#[derive(Debug, Clone, Default)]
pub struct BatchBuffer {
    records: VecDeque<LogRecord>,
    occupied_bytes: usize,
}

impl BatchBuffer {
    /// Adds a record to the buffer.
    ///
    /// # Returns
    ///
    /// - `Some(batch)`: the buffer was full; `batch` holds everything that was
    ///   pending before this record and must be flushed by the caller
    /// - `None`: the record fit into the current batch
    ///
    /// A record that alone exceeds the byte budget still becomes the sole content
    /// of the next batch.
    pub fn append(
        &mut self,
        record: LogRecord,
        accountant: &SizeAccountant,
    ) -> Option<Vec<LogRecord>> {
        let cost = accountant.record_cost(&record);
        let full_batch = if accountant.would_exceed(self, cost) {
            Some(self.drain()).filter(|batch| !batch.is_empty())
        } else {
            None
        };

        self.records.push_back(record);
        self.occupied_bytes += cost;
        full_batch
    }

    /// Takes every buffered record in insertion order and resets the buffer.
    pub fn drain(&mut self) -> Vec<LogRecord> {
        self.occupied_bytes = 0;
        self.records.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn occupied_bytes(&self) -> usize {
        self.occupied_bytes
    }
}

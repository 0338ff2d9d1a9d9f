// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog-style severity levels and their printable labels.

pub const LOG_EMERG: u8 = 0;
pub const LOG_ALERT: u8 = 1;
pub const LOG_CRIT: u8 = 2;
pub const LOG_ERR: u8 = 3;
pub const LOG_WARNING: u8 = 4;
pub const LOG_NOTICE: u8 = 5;
pub const LOG_INFO: u8 = 6;
pub const LOG_DEBUG: u8 = 7;

/// Label used for any level outside `LOG_EMERG..=LOG_DEBUG`.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

const LABELS: [&str; 8] = [
    "EMERGENCY",
    "ALERT",
    "CRITICAL",
    "ERROR",
    "WARNING",
    "NOTICE",
    "INFO",
    "DEBUG",
];

/// Immutable mapping from severity level to label, built once when the
/// backend opens and handed to the record formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityLabels {
    labels: [&'static str; 8],
}

impl Default for SeverityLabels {
    fn default() -> Self {
        Self { labels: LABELS }
    }
}

impl SeverityLabels {
    #[must_use]
    pub fn label(&self, severity: u8) -> &'static str {
        self.labels
            .get(usize::from(severity))
            .copied()
            .unwrap_or(UNKNOWN_LABEL)
    }
}

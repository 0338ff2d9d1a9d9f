// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log calls coming from the host and the records built from them.
//!
//! A [`LogCall`] is what the host logging facade hands to the backend. The
//! [`RecordFormatter`] turns it into a [`LogRecord`], the fixed-shape unit that is
//! buffered and eventually shipped as one CloudWatch log event:
//!
//! ```text
//! ERROR - MyPkg                - Connection refused
//! ```

use chrono::Utc;

use crate::constants::PACKAGE_LABEL_WIDTH;
use crate::severity::SeverityLabels;

/// A single call into the backend from the host logging facade.
///
/// `additional_data`, `class_name` and `method_name` are accepted so facades can
/// forward everything they resolved at the call site. Only the package key is
/// rendered into the record text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogCall {
    pub message: String,
    pub severity: u8,
    pub additional_data: Option<serde_json::Value>,
    pub package_key: Option<String>,
    pub class_name: Option<String>,
    pub method_name: Option<String>,
}

impl LogCall {
    #[must_use]
    pub fn new(message: impl Into<String>, severity: u8) -> Self {
        Self {
            message: message.into(),
            severity,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_package(mut self, package_key: impl Into<String>) -> Self {
        self.package_key = Some(package_key.into());
        self
    }

    #[must_use]
    pub fn with_additional_data(mut self, data: serde_json::Value) -> Self {
        self.additional_data = Some(data);
        self
    }

    #[must_use]
    pub fn with_source(
        mut self,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        self.class_name = Some(class_name.into());
        self.method_name = Some(method_name.into());
        self
    }
}

/// A formatted log line with its capture time. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    text: String,
    timestamp_millis: i64,
}

impl LogRecord {
    #[must_use]
    pub fn new(text: String, timestamp_millis: i64) -> Self {
        Self {
            text,
            timestamp_millis,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }
}

/// Builds [`LogRecord`]s using the severity table captured at open time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormatter {
    labels: SeverityLabels,
}

impl RecordFormatter {
    #[must_use]
    pub fn new(labels: SeverityLabels) -> Self {
        Self { labels }
    }

    /// Formats a record stamped with the current wall clock time.
    #[must_use]
    pub fn format(&self, message: &str, severity: u8, package_key: Option<&str>) -> LogRecord {
        self.format_at(message, severity, package_key, Utc::now().timestamp_millis())
    }

    #[must_use]
    pub fn format_call(&self, call: &LogCall) -> LogRecord {
        self.format(&call.message, call.severity, call.package_key.as_deref())
    }

    pub(crate) fn format_at(
        &self,
        message: &str,
        severity: u8,
        package_key: Option<&str>,
        timestamp_millis: i64,
    ) -> LogRecord {
        let label = self.labels.label(severity);
        let package = package_column(package_key.unwrap_or_default());
        LogRecord::new(format!("{label} - {package} - {message}"), timestamp_millis)
    }
}

/// Left-justifies the package key in a fixed-width column, cutting longer keys.
fn package_column(package_key: &str) -> String {
    let truncated: String = package_key.chars().take(PACKAGE_LABEL_WIDTH).collect();
    format!("{truncated:<width$}", width = PACKAGE_LABEL_WIDTH)
}

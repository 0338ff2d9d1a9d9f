// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while loading or validating the backend configuration
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::InvalidConfig("log group name is empty".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid configuration: log group name is empty"
        );

        let error = ConfigError::InvalidValue {
            name: "CWL_MAX_BATCH_BYTES",
            value: "lots".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for CWL_MAX_BATCH_BYTES: 'lots'"
        );
    }
}

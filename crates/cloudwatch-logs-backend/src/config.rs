// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::accountant::SizeAccountant;
use crate::constants;
use crate::error::ConfigError;
use crate::session::StreamIdentity;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Credentials and location of the CloudWatch Logs endpoint.
///
/// When no profile is configured the backend is disabled and every call is a no-op.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Overrides `https://logs.<region>.amazonaws.com`
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://logs.{}.amazonaws.com", self.region))
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// When buffered records are written to the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushPolicy {
    /// Flush when the batch reaches its byte or count limit, on explicit flush and on close.
    #[default]
    Batched,
    /// Flush after every append. One event per request.
    Eager,
}

impl FromStr for FlushPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "batched" => Ok(Self::Batched),
            "eager" => Ok(Self::Eager),
            _ => Err(ConfigError::InvalidValue {
                name: "CWL_FLUSH_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// How many times a batch is sent before the backend gives up and disables itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    /// Up to `n` attempts, back to back.
    Immediate(u64),
    /// Up to `n` attempts, sleeping `attempt * delay_ms` between them.
    LinearBackoff(u64, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::Immediate(1)
    }
}

impl RetryStrategy {
    #[must_use]
    pub fn attempts(&self) -> u64 {
        match self {
            Self::Immediate(attempts) | Self::LinearBackoff(attempts, _) => *attempts,
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u64) -> Option<Duration> {
        match self {
            Self::Immediate(_) => None,
            Self::LinearBackoff(_, delay_ms) => Some(Duration::from_millis(attempt * delay_ms)),
        }
    }
}

/// Configuration of the CloudWatch Logs backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Credentials profile; `None` disables the backend
    pub profile: Option<Profile>,
    pub log_group_name: String,
    pub log_stream_name: String,
    /// Create the stream when discovery does not find it
    pub auto_create_stream: bool,
    pub flush_policy: FlushPolicy,
    pub max_batch_bytes: usize,
    pub max_batch_events: usize,
    /// Per-event overhead the service adds to every message
    pub event_overhead_bytes: usize,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    pub retry_strategy: RetryStrategy,
    /// Log level of the backend's own diagnostics
    pub log_level: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            profile: None,
            log_group_name: String::new(),
            log_stream_name: String::new(),
            auto_create_stream: true,
            flush_policy: FlushPolicy::default(),
            max_batch_bytes: constants::MAX_BATCH_SIZE_BYTES,
            max_batch_events: constants::MAX_BATCH_EVENTS,
            event_overhead_bytes: constants::EVENT_OVERHEAD_BYTES,
            timeout_secs: constants::DEFAULT_TIMEOUT_SECS,
            retry_strategy: RetryStrategy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl BackendConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from any variable source, `from_env` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let region = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION"));
        let profile = match (
            region,
            lookup("AWS_ACCESS_KEY_ID"),
            lookup("AWS_SECRET_ACCESS_KEY"),
        ) {
            (Some(region), Some(access_key_id), Some(secret_access_key)) => Some(Profile {
                region,
                access_key_id,
                secret_access_key,
                session_token: lookup("AWS_SESSION_TOKEN"),
                endpoint: lookup("CWL_ENDPOINT"),
            }),
            _ => None,
        };

        let auto_create_stream = lookup("CWL_AUTO_CREATE_STREAM")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.auto_create_stream);
        let flush_policy = lookup("CWL_FLUSH_POLICY")
            .map(|val| val.parse::<FlushPolicy>())
            .transpose()?
            .unwrap_or(defaults.flush_policy);

        let attempts = parse_var(&lookup, "CWL_FLUSH_ATTEMPTS")?;
        let backoff_ms = parse_var(&lookup, "CWL_FLUSH_BACKOFF_MS")?;
        let retry_strategy = match (attempts, backoff_ms) {
            (Some(attempts), Some(delay_ms)) => RetryStrategy::LinearBackoff(attempts, delay_ms),
            (Some(attempts), None) => RetryStrategy::Immediate(attempts),
            (None, Some(delay_ms)) => {
                RetryStrategy::LinearBackoff(defaults.retry_strategy.attempts(), delay_ms)
            }
            (None, None) => defaults.retry_strategy,
        };

        let config = Self {
            profile,
            log_group_name: lookup("CWL_LOG_GROUP").unwrap_or_default(),
            log_stream_name: lookup("CWL_LOG_STREAM").unwrap_or_default(),
            auto_create_stream,
            flush_policy,
            max_batch_bytes: parse_var(&lookup, "CWL_MAX_BATCH_BYTES")?
                .unwrap_or(defaults.max_batch_bytes),
            max_batch_events: parse_var(&lookup, "CWL_MAX_BATCH_EVENTS")?
                .unwrap_or(defaults.max_batch_events),
            event_overhead_bytes: parse_var(&lookup, "CWL_EVENT_OVERHEAD_BYTES")?
                .unwrap_or(defaults.event_overhead_bytes),
            timeout_secs: parse_var(&lookup, "CWL_TIMEOUT_SECS")?
                .unwrap_or(defaults.timeout_secs),
            retry_strategy,
            log_level: lookup("CWL_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(profile) = &self.profile {
            if profile.region.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "AWS region cannot be empty".to_string(),
                ));
            }
            if self.log_group_name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "CWL_LOG_GROUP cannot be empty".to_string(),
                ));
            }
            if self.log_stream_name.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "CWL_LOG_STREAM cannot be empty".to_string(),
                ));
            }
        }

        if self.max_batch_events == 0 {
            return Err(ConfigError::InvalidConfig(
                "max batch events must be greater than 0".to_string(),
            ));
        }

        if self.max_batch_bytes <= self.event_overhead_bytes {
            return Err(ConfigError::InvalidConfig(format!(
                "max batch bytes ({}) must be greater than the per-event overhead ({})",
                self.max_batch_bytes, self.event_overhead_bytes
            )));
        }

        if self.retry_strategy.attempts() == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry strategy needs at least one attempt".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    #[must_use]
    pub fn identity(&self) -> StreamIdentity {
        StreamIdentity::new(&self.log_group_name, &self.log_stream_name)
    }

    #[must_use]
    pub fn accountant(&self) -> SizeAccountant {
        SizeAccountant::new(
            self.event_overhead_bytes,
            self.max_batch_bytes,
            self.max_batch_events,
        )
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn credentials() -> Vec<(&'static str, &'static str)> {
        vec![
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("CWL_LOG_GROUP", "app"),
            ("CWL_LOG_STREAM", "web-1"),
        ]
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BackendConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.profile.is_none());
        assert!(config.auto_create_stream);
        assert_eq!(config.flush_policy, FlushPolicy::Batched);
        assert_eq!(config.max_batch_bytes, 1_048_576);
        assert_eq!(config.max_batch_events, 10_000);
        assert_eq!(config.event_overhead_bytes, 26);
    }

    #[test]
    fn test_from_lookup_without_credentials_is_disabled() {
        let config = BackendConfig::from_lookup(lookup_from(&[("CWL_LOG_GROUP", "app")]))
            .expect("config should load");
        assert!(config.profile.is_none());
    }

    #[test]
    fn test_from_lookup_with_credentials() {
        let mut vars = credentials();
        vars.push(("AWS_SESSION_TOKEN", "session"));
        vars.push(("CWL_ENDPOINT", "http://127.0.0.1:4566"));
        vars.push(("CWL_AUTO_CREATE_STREAM", "FALSE"));
        vars.push(("CWL_FLUSH_POLICY", "eager"));
        vars.push(("CWL_MAX_BATCH_EVENTS", "500"));

        let config = BackendConfig::from_lookup(lookup_from(&vars)).expect("config should load");
        let profile = config.profile.clone().expect("profile should be set");

        assert_eq!(profile.region, "eu-west-1");
        assert_eq!(profile.session_token.as_deref(), Some("session"));
        assert_eq!(profile.endpoint_url(), "http://127.0.0.1:4566");
        assert!(!config.auto_create_stream);
        assert_eq!(config.flush_policy, FlushPolicy::Eager);
        assert_eq!(config.max_batch_events, 500);
        assert_eq!(config.identity(), StreamIdentity::new("app", "web-1"));
    }

    #[test]
    fn test_default_region_fallback_and_endpoint() {
        let vars = [
            ("AWS_DEFAULT_REGION", "us-east-2"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("CWL_LOG_GROUP", "app"),
            ("CWL_LOG_STREAM", "web-1"),
        ];
        let config = BackendConfig::from_lookup(lookup_from(&vars)).expect("config should load");
        assert_eq!(
            config.profile.expect("profile").endpoint_url(),
            "https://logs.us-east-2.amazonaws.com"
        );
    }

    #[test]
    fn test_retry_strategy_from_lookup() {
        let mut vars = credentials();
        vars.push(("CWL_FLUSH_ATTEMPTS", "3"));
        let config = BackendConfig::from_lookup(lookup_from(&vars)).expect("config should load");
        assert_eq!(config.retry_strategy, RetryStrategy::Immediate(3));

        vars.push(("CWL_FLUSH_BACKOFF_MS", "250"));
        let config = BackendConfig::from_lookup(lookup_from(&vars)).expect("config should load");
        assert_eq!(config.retry_strategy, RetryStrategy::LinearBackoff(3, 250));
        assert_eq!(
            config.retry_strategy.delay_after(2),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut vars = credentials();
        vars.push(("CWL_MAX_BATCH_BYTES", "lots"));
        let err = BackendConfig::from_lookup(lookup_from(&vars)).expect_err("should fail");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                name: "CWL_MAX_BATCH_BYTES",
                value: "lots".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_flush_policy_is_rejected() {
        let mut vars = credentials();
        vars.push(("CWL_FLUSH_POLICY", "sometimes"));
        assert!(BackendConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_validate_requires_stream_identity_with_profile() {
        let vars = [
            ("AWS_REGION", "eu-west-1"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("CWL_LOG_GROUP", "app"),
        ];
        assert!(BackendConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_validate_batch_limits() {
        let config = BackendConfig {
            max_batch_events: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            max_batch_bytes: 26,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BackendConfig {
            retry_strategy: RetryStrategy::Immediate(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = BackendConfig {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: BackendConfig = serde_json::from_value(serde_json::json!({
            "profile": {
                "region": "eu-central-1",
                "access_key_id": "AKIDEXAMPLE",
                "secret_access_key": "secret"
            },
            "log_group_name": "app",
            "log_stream_name": "worker",
            "flush_policy": "eager",
            "retry_strategy": {"linear_backoff": [4, 100]}
        }))
        .expect("deserialize");

        assert!(config.validate().is_ok());
        assert_eq!(config.flush_policy, FlushPolicy::Eager);
        assert_eq!(config.retry_strategy, RetryStrategy::LinearBackoff(4, 100));
        assert_eq!(config.max_batch_bytes, 1_048_576);
        assert!(config.auto_create_stream);
    }

    #[test]
    fn test_profile_debug_hides_secrets() {
        let profile = Profile {
            region: "eu-west-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "very-secret".to_string(),
            session_token: Some("also-secret".to_string()),
            endpoint: None,
        };
        let debug = format!("{profile:?}");
        assert!(debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
    }
}

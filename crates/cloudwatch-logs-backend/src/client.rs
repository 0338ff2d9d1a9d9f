// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the CloudWatch Logs JSON API.
//!
//! Every operation is a signed `POST` to the service endpoint root:
//!
//! ```text
//! POST / HTTP/1.1
//! Content-Type: application/x-amz-json-1.1
//! X-Amz-Target: Logs_20140328.PutLogEvents
//! Authorization: AWS4-HMAC-SHA256 Credential=...
//!
//! {"logGroupName":"app","logStreamName":"web-1","logEvents":[...]}
//! ```
//!
//! Failures come back as a JSON body carrying the exception type in `__type`.
//! They are mapped to [`ApiError::Service`]; nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{
    ApiError, CreateLogStreamRequest, DescribeLogStreamsRequest, DescribeLogStreamsResponse,
    LogStreamApi, PutLogEventsRequest, PutLogEventsResponse,
};
use crate::config::Profile;
use crate::constants::{CONTENT_TYPE, TARGET_PREFIX};
use crate::sigv4::{SignableRequest, Signer};

/// Body of a failed call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
    #[serde(default)]
    expected_sequence_token: Option<String>,
}

/// Signed HTTP client for one CloudWatch Logs endpoint.
#[derive(Clone)]
pub struct CloudWatchLogsClient {
    client: Client,
    endpoint: Url,
    host: String,
    signer: Signer,
}

impl CloudWatchLogsClient {
    pub fn new(profile: &Profile, timeout: Duration) -> Result<Self, ApiError> {
        let endpoint = Url::parse(&profile.endpoint_url())
            .map_err(|e| ApiError::ClientBuild(format!("invalid endpoint: {e}")))?;
        let host = match (endpoint.host_str(), endpoint.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ApiError::ClientBuild(format!(
                    "endpoint has no host: {endpoint}"
                )))
            }
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            host,
            signer: Signer::new(profile),
        })
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, ApiError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let signed_headers = self.signer.sign(
            &SignableRequest {
                host: &self.host,
                path: self.endpoint.path(),
                target: &target,
                body: &body,
            },
            Utc::now(),
        )?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", &target);
        for (name, value) in signed_headers {
            builder = builder.header(name, value);
        }

        let response = builder.body(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            let payload: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
            return Ok(serde_json::from_slice(payload)?);
        }

        let error: ServiceErrorBody = serde_json::from_slice(&bytes).unwrap_or_default();
        let code = error
            .error_type
            .as_deref()
            .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
            .unwrap_or_else(|| format!("HTTP{}", status.as_u16()));
        debug!("CLOUDWATCH | {operation} failed with {status}: {code}");

        Err(ApiError::Service {
            status: status.as_u16(),
            code,
            message: error.message.unwrap_or_default(),
            expected_sequence_token: error.expected_sequence_token,
        })
    }
}

#[async_trait]
impl LogStreamApi for CloudWatchLogsClient {
    async fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> Result<DescribeLogStreamsResponse, ApiError> {
        self.call("DescribeLogStreams", &request).await
    }

    async fn create_log_stream(&self, request: CreateLogStreamRequest) -> Result<(), ApiError> {
        let _: IgnoredAny = self.call("CreateLogStream", &request).await?;
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        self.call("PutLogEvents", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(endpoint: Option<&str>) -> Profile {
        Profile {
            region: "eu-west-1".to_string(),
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: None,
            endpoint: endpoint.map(ToString::to_string),
        }
    }

    #[test]
    fn test_new_uses_regional_endpoint() {
        let client =
            CloudWatchLogsClient::new(&profile(None), Duration::from_secs(1)).expect("client");
        assert_eq!(client.host, "logs.eu-west-1.amazonaws.com");
        assert_eq!(client.endpoint.path(), "/");
    }

    #[test]
    fn test_new_keeps_explicit_port() {
        let client = CloudWatchLogsClient::new(
            &profile(Some("http://127.0.0.1:4566")),
            Duration::from_secs(1),
        )
        .expect("client");
        assert_eq!(client.host, "127.0.0.1:4566");
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let result = CloudWatchLogsClient::new(&profile(Some("not a url")), Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::ClientBuild(_))));
    }

    #[test]
    fn test_error_body_accepts_both_message_casings() {
        let lower: ServiceErrorBody = serde_json::from_str(
            r#"{"__type":"com.amazonaws.logs#ThrottlingException","message":"slow"}"#,
        )
        .expect("deserialize");
        assert_eq!(lower.message.as_deref(), Some("slow"));

        let upper: ServiceErrorBody =
            serde_json::from_str(r#"{"__type":"ResourceNotFoundException","Message":"gone"}"#)
                .expect("deserialize");
        assert_eq!(upper.message.as_deref(), Some("gone"));
    }
}

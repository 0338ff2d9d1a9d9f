// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory fake of the log-stream service for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{
    ApiError, CreateLogStreamRequest, DescribeLogStreamsRequest, DescribeLogStreamsResponse,
    LogStreamApi, LogStreamDescription, PutLogEventsRequest, PutLogEventsResponse,
};

#[derive(Default)]
struct State {
    describe_pages: VecDeque<DescribeLogStreamsResponse>,
    describe_failure: Option<ApiError>,
    create_failure: Option<ApiError>,
    put_failures: VecDeque<ApiError>,
    fail_every_put: bool,
    describe_requests: Vec<DescribeLogStreamsRequest>,
    create_requests: Vec<CreateLogStreamRequest>,
    put_requests: Vec<PutLogEventsRequest>,
    accepted_puts: usize,
}

/// Records every call and answers from scripted pages and failures.
///
/// Successful writes return `token-1`, `token-2`, ... in order.
#[derive(Clone, Default)]
pub(crate) struct RecordingApi {
    state: Arc<Mutex<State>>,
}

pub(crate) fn service_error(code: &str, expected_sequence_token: Option<&str>) -> ApiError {
    ApiError::Service {
        status: 400,
        code: code.to_string(),
        message: format!("{code} raised by test"),
        expected_sequence_token: expected_sequence_token.map(ToString::to_string),
    }
}

#[allow(clippy::unwrap_used)]
impl RecordingApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clone_dyn(&self) -> Arc<dyn LogStreamApi> {
        Arc::new(self.clone())
    }

    pub(crate) fn push_describe_page(
        &self,
        log_streams: Vec<LogStreamDescription>,
        next_token: Option<&str>,
    ) {
        self.state
            .lock()
            .unwrap()
            .describe_pages
            .push_back(DescribeLogStreamsResponse {
                log_streams,
                next_token: next_token.map(ToString::to_string),
            });
    }

    pub(crate) fn fail_describe(&self, error: ApiError) {
        self.state.lock().unwrap().describe_failure = Some(error);
    }

    pub(crate) fn fail_create(&self, error: ApiError) {
        self.state.lock().unwrap().create_failure = Some(error);
    }

    pub(crate) fn fail_next_put(&self, error: ApiError) {
        self.state.lock().unwrap().put_failures.push_back(error);
    }

    pub(crate) fn fail_every_put(&self) {
        self.state.lock().unwrap().fail_every_put = true;
    }

    pub(crate) fn describe_requests(&self) -> Vec<DescribeLogStreamsRequest> {
        self.state.lock().unwrap().describe_requests.clone()
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_requests.len()
    }

    pub(crate) fn put_requests(&self) -> Vec<PutLogEventsRequest> {
        self.state.lock().unwrap().put_requests.clone()
    }

    /// Messages of every write, one inner vector per request.
    pub(crate) fn put_messages(&self) -> Vec<Vec<String>> {
        self.put_requests()
            .into_iter()
            .map(|r| r.log_events.into_iter().map(|e| e.message).collect())
            .collect()
    }
}

#[allow(clippy::unwrap_used)]
#[async_trait]
impl LogStreamApi for RecordingApi {
    async fn describe_log_streams(
        &self,
        request: DescribeLogStreamsRequest,
    ) -> Result<DescribeLogStreamsResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.describe_requests.push(request);
        if let Some(error) = state.describe_failure.take() {
            return Err(error);
        }
        Ok(state.describe_pages.pop_front().unwrap_or_default())
    }

    async fn create_log_stream(&self, request: CreateLogStreamRequest) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.create_requests.push(request);
        match state.create_failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn put_log_events(
        &self,
        request: PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.put_requests.push(request);
        if state.fail_every_put {
            return Err(service_error("ServiceUnavailableException", None));
        }
        if let Some(error) = state.put_failures.pop_front() {
            return Err(error);
        }
        state.accepted_puts += 1;
        Ok(PutLogEventsResponse {
            next_sequence_token: Some(format!("token-{}", state.accepted_puts)),
            rejected_log_events_info: None,
        })
    }
}

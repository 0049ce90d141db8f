// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Scripted transport for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use super::transport::{ApiRequest, ApiResponse, LineStream, Transport};
use crate::error::{Error, Result};

type ScriptedStream = Result<Vec<Result<String>>>;

/// Replays queued responses in order and records every request
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ApiResponse>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push_back(ApiResponse::new(status, body));
    }

    /// Queue a successful streaming response made of `lines`
    pub fn push_stream(&self, lines: Vec<Result<String>>) {
        self.streams.lock().unwrap().push_back(Ok(lines));
    }

    /// Queue a streaming request that is rejected
    pub fn push_stream_error(&self, error: Error) {
        self.streams.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted response left".to_string()))
    }

    async fn stream_lines(&self, request: &ApiRequest) -> Result<LineStream> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted stream left".to_string()))?;
        Ok(futures::stream::iter(scripted?).boxed())
    }
}

/// List response body with one pod per name
pub fn list_body(resource_version: &str, names: &[&str]) -> String {
    let items: Vec<_> = names
        .iter()
        .map(|name| json!({"metadata": {"name": name, "namespace": "default"}}))
        .collect();
    json!({
        "kind": "PodList",
        "apiVersion": "v1",
        "metadata": {"resourceVersion": resource_version},
        "items": items,
    })
    .to_string()
}

/// One watch line for an object named `name` at `resource_version`
pub fn event_line(event_type: &str, name: &str, resource_version: &str) -> String {
    json!({
        "type": event_type,
        "object": {
            "kind": "Pod",
            "metadata": {"name": name, "resourceVersion": resource_version},
        },
    })
    .to_string()
}

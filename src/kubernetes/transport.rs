// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Transport boundary between the query layer and the HTTP client
//!
//! The query layer only needs two things from a client: a single-shot GET that
//! hands back the status and body, and a streaming GET that hands back the body
//! as lines. Keeping that behind a trait lets queries run against a real
//! cluster ([`super::KubeTransport`]) or a scripted transport in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Core API base used when a kind has no group
pub const DEFAULT_BASE: &str = "/api";

/// API version used when a kind does not name one
pub const DEFAULT_VERSION: &str = "v1";

/// A GET against a versioned, optionally namespaced REST endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Endpoint-relative path, including any query string (e.g. "pods?watch=true")
    pub path: String,
    pub namespace: Option<String>,
    pub base: Option<&'static str>,
    pub version: Option<&'static str>,
}

impl ApiRequest {
    /// Full request URI relative to the cluster address
    ///
    /// `{base}/{version}[/namespaces/{ns}]/{path}`
    pub fn uri(&self) -> String {
        let mut uri = format!(
            "{}/{}",
            self.base.unwrap_or(DEFAULT_BASE).trim_end_matches('/'),
            self.version.unwrap_or(DEFAULT_VERSION)
        );
        if let Some(ns) = &self.namespace {
            uri.push_str("/namespaces/");
            uri.push_str(ns);
        }
        uri.push('/');
        uri.push_str(self.path.trim_start_matches('/'));
        uri
    }
}

/// Status and body of a completed single-shot request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the whole body
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Pass successful responses through, turn anything else into [`Error::Api`]
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(self.into_error())
    }

    /// The response as an [`Error::Api`], regardless of its status
    pub fn into_error(self) -> Error {
        Error::Api {
            status: self.status,
            message: self.error_message(),
        }
    }

    /// Message of a Kubernetes `Status` body, or the raw body otherwise
    fn error_message(&self) -> String {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| self.body.trim().to_string())
    }
}

/// Body of a streaming request, one item per line
pub type LineStream = BoxStream<'static, Result<String>>;

/// HTTP client used by queries and watches
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET and return the response whatever its status.
    ///
    /// Errors are reserved for requests that produced no response at all.
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse>;

    /// Issue a streaming GET and return the body as lines.
    ///
    /// A non-success status is an [`Error::Api`].
    async fn stream_lines(&self, request: &ApiRequest) -> Result<LineStream>;
}

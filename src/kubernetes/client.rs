// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! [`Transport`] backed by a `kube::Client`
//!
//! Cluster address, credentials and TLS all come from kubeconfig. This module
//! only turns [`ApiRequest`]s into raw HTTP requests and maps the results back.

use std::time::{Duration, Instant};

use anyhow::{Context, Result as AnyResult, anyhow};
use async_trait::async_trait;
use futures::{AsyncBufReadExt, StreamExt, TryStreamExt};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::{debug, info, trace};

use super::transport::{ApiRequest, ApiResponse, LineStream, Transport};
use crate::error::{Error, Result};

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a single read from the API server
///
/// Watches sit idle between events, so this is much longer than a list would
/// need. A quiet watch that hits it is reconnected from its bookmark.
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Kubernetes API transport for one kubeconfig context
#[derive(Clone)]
pub struct KubeTransport {
    client: Client,
    context: String,
    default_namespace: String,
}

impl KubeTransport {
    /// Connect using `context`, or the kubeconfig's current context
    pub async fn connect(context: Option<&str>) -> AnyResult<Self> {
        let kubeconfig = Kubeconfig::read().context("Failed to read kubeconfig")?;

        let context_name = context
            .map(String::from)
            .or_else(|| kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No context specified and no current context in kubeconfig"))?;

        if !kubeconfig.contexts.iter().any(|c| c.name == context_name) {
            return Err(anyhow!("Context '{}' not found in kubeconfig", context_name));
        }

        let start = Instant::now();
        let mut config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: Some(context_name.clone()),
                ..Default::default()
            },
        )
        .await
        .with_context(|| format!("Failed to load kubeconfig for context '{}'", context_name))?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);
        let default_namespace = config.default_namespace.clone();

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create client for context '{}'", context_name))?;

        info!(
            context = %context_name,
            namespace = %default_namespace,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Connected to cluster"
        );

        Ok(Self {
            client,
            context: context_name,
            default_namespace,
        })
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, context: impl Into<String>) -> Self {
        let default_namespace = client.default_namespace().to_string();
        Self {
            client,
            context: context.into(),
            default_namespace,
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Namespace configured for the context in kubeconfig
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    fn http_request(request: &ApiRequest) -> Result<http::Request<Vec<u8>>> {
        http::Request::get(request.uri())
            .body(Vec::new())
            .map_err(|e| Error::Transport(format!("invalid request {}: {}", request.uri(), e)))
    }
}

/// Map a client error; API rejections keep their status code
fn map_kube_error(err: kube::Error) -> Error {
    match err {
        kube::Error::Api(response) => Error::Api {
            status: response.code,
            message: response.message,
        },
        other => Error::Transport(other.to_string()),
    }
}

async fn read_body(body: Body) -> Result<String> {
    let bytes = BodyExt::collect(body)
        .await
        .map_err(|e| Error::Transport(format!("failed to read response body: {}", e)))?
        .to_bytes();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl Transport for KubeTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let http_request = Self::http_request(request)?;
        trace!(context = %self.context, uri = %request.uri(), "GET");

        let response = self
            .client
            .send(http_request.map(Body::from))
            .await
            .map_err(map_kube_error)?;
        let status = response.status().as_u16();
        let body = read_body(response.into_body()).await?;

        if !(200..300).contains(&status) {
            debug!(
                context = %self.context,
                uri = %request.uri(),
                status = status,
                "API returned an error status"
            );
        }
        Ok(ApiResponse::new(status, body))
    }

    async fn stream_lines(&self, request: &ApiRequest) -> Result<LineStream> {
        let http_request = Self::http_request(request)?;
        trace!(context = %self.context, uri = %request.uri(), "GET (stream)");

        let response = self
            .client
            .send(http_request.map(Body::from))
            .await
            .map_err(map_kube_error)?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = read_body(response.into_body()).await?;
            return Err(ApiResponse::new(status, body).into_error());
        }

        let lines = BodyExt::into_data_stream(response.into_body())
            .map_err(std::io::Error::other)
            .into_async_read()
            .lines()
            .map_err(|e| Error::Transport(format!("watch stream read failed: {}", e)));
        Ok(lines.boxed())
    }
}

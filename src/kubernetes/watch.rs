// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Long-lived, auto-resuming watch streams
//!
//! A [`Watch`] turns a query into an unbounded stream of change events. The
//! stream is driven by a two-state machine:
//!
//! - **Connecting**: issue `?watch=true[&resourceVersion=<bookmark>]`.
//!   A rejection before any event was ever received ends the stream with
//!   that error. After the first event, rejections are retried with backoff.
//! - **Streaming**: decode one JSON event per line, advance the bookmark from
//!   the object's `metadata.resourceVersion`, yield the event. When the server
//!   closes the body or the connection drops, go back to Connecting.
//!
//! The bookmark makes every reconnect resume right after the last observed
//! event, with the same namespace and selectors. Dropping the stream is
//! the only way to stop it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::builder::QueryBuilder;
use super::resources::ApiObject;
use super::transport::{LineStream, Transport};
use crate::error::Result;

/// Default delay before the first retry; doubles with each consecutive failure
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Default upper bound for the retry delay
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Status code of an ERROR event whose bookmark has been compacted away
const GONE: i64 = 410;

/// Where a new watch starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Since {
    /// Let the server pick (current state followed by changes)
    #[default]
    Server,
    /// Right after the state returned by the query's list response
    Now,
    /// After an explicit resource version
    Version(String),
}

/// Change type of a watch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Added,
    Modified,
    Deleted,
    Error,
    Bookmark,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "ADDED",
            EventType::Modified => "MODIFIED",
            EventType::Deleted => "DELETED",
            EventType::Error => "ERROR",
            EventType::Bookmark => "BOOKMARK",
        }
    }
}

/// One change delivered by a watch
#[derive(Debug, Clone, PartialEq)]
pub struct WatchEvent<K> {
    pub event_type: EventType,
    pub object: K,
}

/// Wire shape of one line of a watch response
#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: EventType,
    object: Value,
}

/// Reconnect delay policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl Backoff {
    /// Reconnect immediately, always
    pub fn none() -> Self {
        Self {
            initial: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before the next attempt after `failures` consecutive failures
    pub fn delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failures - 1);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Stream of watch events; `Err` items are terminal
pub type WatchStream<K> = BoxStream<'static, Result<WatchEvent<K>>>;

/// A watch over the kind, namespace and selectors of a query
pub struct Watch<K> {
    transport: Arc<dyn Transport>,
    builder: QueryBuilder,
    resource_version: Option<String>,
    backoff: Backoff,
    _kind: PhantomData<fn() -> K>,
}

impl<K> fmt::Debug for Watch<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watch")
            .field("builder", &self.builder)
            .field("resource_version", &self.resource_version)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl<K: ApiObject> Watch<K> {
    pub fn new(
        transport: Arc<dyn Transport>,
        builder: QueryBuilder,
        resource_version: Option<String>,
    ) -> Self {
        Self {
            transport,
            builder,
            resource_version,
            backoff: Backoff::default(),
            _kind: PhantomData,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// Current bookmark
    pub fn resource_version(&self) -> Option<&str> {
        self.resource_version.as_deref()
    }

    /// Watch path for the current bookmark, e.g. `pods?watch=true&resourceVersion=5`
    pub fn build_request_path(&self) -> Result<String> {
        let mut params = vec![("watch", "true".to_string())];
        if let Some(version) = &self.resource_version {
            params.push(("resourceVersion", version.clone()));
        }
        self.builder.build_api_path(params)
    }

    /// Start watching; nothing is sent until the stream is first polled
    pub fn into_stream(self) -> WatchStream<K> {
        let machine = WatchLoop {
            watch: self,
            state: State::Connecting,
            received_any: false,
            received_this_connection: 0,
            failures: 0,
            attempts: 0,
        };
        stream::unfold(machine, |mut machine| async move {
            machine.next_event().await.map(|item| (item, machine))
        })
        .boxed()
    }
}

enum State {
    Connecting,
    Streaming(LineStream),
    Finished,
}

struct WatchLoop<K> {
    watch: Watch<K>,
    state: State,
    /// Whether any event was ever delivered by this watch
    received_any: bool,
    received_this_connection: usize,
    /// Consecutive failed or empty connections
    failures: u32,
    attempts: u64,
}

impl<K: ApiObject> WatchLoop<K> {
    async fn next_event(&mut self) -> Option<Result<WatchEvent<K>>> {
        loop {
            match std::mem::replace(&mut self.state, State::Finished) {
                State::Finished => return None,
                State::Connecting => match self.connect().await {
                    Ok(lines) => {
                        self.received_this_connection = 0;
                        self.state = State::Streaming(lines);
                    }
                    Err(e) if self.received_any => {
                        warn!(
                            endpoint = %self.watch.builder.kind().endpoint,
                            attempt = self.attempts,
                            error = %e,
                            "Watch reconnect failed, retrying"
                        );
                        self.failures += 1;
                        self.state = State::Connecting;
                    }
                    Err(e) => return Some(Err(e)),
                },
                State::Streaming(mut lines) => match lines.next().await {
                    Some(Ok(line)) => {
                        if line.trim().is_empty() {
                            self.state = State::Streaming(lines);
                            continue;
                        }
                        let event = match self.decode(&line) {
                            Ok(event) => event,
                            Err(e) => return Some(Err(e)),
                        };
                        self.received_any = true;
                        self.received_this_connection += 1;
                        self.failures = 0;
                        self.state = State::Streaming(lines);
                        return Some(Ok(event));
                    }
                    Some(Err(e)) => {
                        warn!(
                            endpoint = %self.watch.builder.kind().endpoint,
                            resource_version = ?self.watch.resource_version,
                            error = %e,
                            "Watch stream interrupted, reconnecting"
                        );
                        self.failures += 1;
                        self.state = State::Connecting;
                    }
                    None => {
                        debug!(
                            endpoint = %self.watch.builder.kind().endpoint,
                            resource_version = ?self.watch.resource_version,
                            events = self.received_this_connection,
                            "Watch stream closed by server, reconnecting"
                        );
                        if self.received_this_connection == 0 {
                            self.failures += 1;
                        }
                        self.state = State::Connecting;
                    }
                },
            }
        }
    }

    async fn connect(&mut self) -> Result<LineStream> {
        let delay = self.watch.backoff.delay(self.failures);
        if !delay.is_zero() {
            debug!(
                delay_ms = delay.as_millis() as u64,
                failures = self.failures,
                "Backing off before reconnect"
            );
            tokio::time::sleep(delay).await;
        }

        let request = self
            .watch
            .builder
            .request(self.watch.build_request_path()?);
        self.attempts += 1;
        if self.attempts == 1 {
            info!(endpoint = %self.watch.builder.kind().endpoint, uri = %request.uri(), "Starting watch");
        } else {
            info!(
                endpoint = %self.watch.builder.kind().endpoint,
                attempt = self.attempts,
                uri = %request.uri(),
                "Reconnecting watch"
            );
        }
        self.watch.transport.stream_lines(&request).await
    }

    fn decode(&mut self, line: &str) -> Result<WatchEvent<K>> {
        let raw: RawEvent = serde_json::from_str(line)?;

        if let Some(version) = raw
            .object
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
        {
            self.watch.resource_version = Some(version.to_string());
        }

        if raw.event_type == EventType::Error
            && raw.object.get("code").and_then(Value::as_i64) == Some(GONE)
        {
            warn!(
                endpoint = %self.watch.builder.kind().endpoint,
                resource_version = ?self.watch.resource_version,
                "Watch bookmark expired, next reconnect starts from the server's current state"
            );
            self.watch.resource_version = None;
        }

        Ok(WatchEvent {
            event_type: raw.event_type,
            object: K::wrap(raw.object),
        })
    }
}

// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Query and watch Kubernetes resources
//!
//! A [`Query`] pairs a resource kind with a namespace scope and optional label
//! and field [`Selector`]s, fetches the matching objects lazily and memoizes
//! them. [`Query::watch`] turns the same query into a reconnecting event
//! stream.
//!
//! ```no_run
//! # async fn demo() -> kubeq::Result<()> {
//! use std::sync::Arc;
//! use kubeq::kubernetes::resources::Pod;
//! use kubeq::{Filter, KubeTransport, Query, Selector};
//!
//! let transport = Arc::new(KubeTransport::connect(None).await.map_err(|e| {
//!     kubeq::Error::Transport(e.to_string())
//! })?);
//! let pods = Query::<Pod>::new(transport).filter(
//!     Filter::new()
//!         .namespace("prod")
//!         .selector(Selector::new().with("app", "web").with("tier__in", ["a", "b"])),
//! );
//! for pod in pods.objects().await? {
//!     println!("{:?}", kubeq::ApiObject::name(pod));
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod kubernetes;

pub use error::{Error, Result};
pub use kubernetes::{
    ApiObject, Backoff, DynamicObject, EventType, Filter, KubeTransport, Lookup, Query,
    QueryBuilder, ResourceKind, Scope, Selector, Since, Transport, TypedObject, Watch,
    WatchEvent,
};

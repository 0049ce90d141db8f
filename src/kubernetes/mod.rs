// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod builder;
mod client;
mod field_selectors;
mod query;
pub mod resources;
mod selector;
mod transport;
mod watch;

#[cfg(test)]
mod testing;

pub use builder::{Filter, QueryBuilder, Scope};
pub use client::KubeTransport;
pub use field_selectors::{FIELD_SELECTOR_REGISTRY, FieldSelectorRegistry};
pub use query::{Lookup, ObjectIter, Query};
pub use resources::{ApiObject, DynamicObject, ResourceKind, TypedObject};
pub use selector::{Selector, SelectorOp, SelectorValue};
pub use transport::{ApiRequest, ApiResponse, LineStream, Transport};
pub use watch::{Backoff, EventType, Since, Watch, WatchEvent, WatchStream};

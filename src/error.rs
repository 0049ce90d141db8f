// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for query and watch operations
//!
//! Callers need to tell "nothing matched" apart from "filter too broad" and from
//! transport failures, so each outcome gets its own variant instead of an
//! opaque `anyhow::Error`.

use thiserror::Error;

/// Errors produced by the query layer
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed selector expression (bad operator token, malformed key)
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Name lookup returned 404, or a single-object query matched nothing
    #[error("{0}")]
    ObjectDoesNotExist(String),

    /// Name lookup of a namespaced kind without a concrete namespace
    #[error("fetching {0} by name needs a namespace, not all namespaces")]
    NamespaceRequired(String),

    /// A single-object query matched more than one object
    #[error("get() matched {count} objects; narrow the query with filter()")]
    AmbiguousResult { count: usize },

    /// The API server answered with a non-success status
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response (connection, TLS, I/O)
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body or watch line was not the expected JSON
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A watch was requested "from now" but the list response carried no version
    #[error("list response for {0} has no metadata.resourceVersion")]
    MissingResourceVersion(String),
}

/// Result alias using the query layer error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status code, if the error came from an API response
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for lookups that found nothing (404 or zero matches)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ObjectDoesNotExist(_))
    }
}

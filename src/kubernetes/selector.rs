// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Label and field selector compilation
//!
//! A selector is either a raw string passed through verbatim, or a list of
//! `field[__operator]` keys mapped to values. The structured form compiles to
//! the wire syntax the API server expects in `labelSelector`/`fieldSelector`:
//!
//! | key          | value        | compiled            |
//! |--------------|--------------|---------------------|
//! | `app`        | `nginx`      | `app=nginx`         |
//! | `app__neq`   | `nginx`      | `app != nginx`      |
//! | `tier__in`   | `[a, b]`     | `tier in (a,b)`     |
//! | `tier__notin`| `[a, b]`     | `tier notin (a,b)`  |
//!
//! No escaping happens here. URL encoding is done when the request path is built.

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{Error, Result};

/// Separator between the field name and the operator in a selector key
const OPERATOR_SEPARATOR: &str = "__";

/// Comparison operator of a structured selector clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorOp {
    /// `field=value` (default when the key has no operator suffix)
    Eq,
    /// `field != value`
    Neq,
    /// `field in (v1,v2)`
    In,
    /// `field notin (v1,v2)`
    NotIn,
}

impl FromStr for SelectorOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(SelectorOp::Eq),
            "neq" => Ok(SelectorOp::Neq),
            "in" => Ok(SelectorOp::In),
            "notin" => Ok(SelectorOp::NotIn),
            other => Err(Error::InvalidSelector(format!(
                "{} is not a valid comparison operator",
                other
            ))),
        }
    }
}

/// Right-hand side of a structured selector clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorValue {
    One(String),
    Many(Vec<String>),
}

impl SelectorValue {
    fn joined(&self) -> String {
        match self {
            SelectorValue::One(v) => v.clone(),
            SelectorValue::Many(values) => values.join(","),
        }
    }
}

impl From<&str> for SelectorValue {
    fn from(value: &str) -> Self {
        SelectorValue::One(value.to_string())
    }
}

impl From<String> for SelectorValue {
    fn from(value: String) -> Self {
        SelectorValue::One(value)
    }
}

impl<T: Into<String>> From<Vec<T>> for SelectorValue {
    fn from(values: Vec<T>) -> Self {
        SelectorValue::Many(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<String>, const N: usize> From<[T; N]> for SelectorValue {
    fn from(values: [T; N]) -> Self {
        SelectorValue::Many(values.into_iter().map(Into::into).collect())
    }
}

/// A label or field selector expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Caller-authored selector string, sent as-is
    Raw(String),
    /// `field[__operator]` → value clauses, in declaration order
    Map(Vec<(String, SelectorValue)>),
}

impl Default for Selector {
    fn default() -> Self {
        Selector::Map(Vec::new())
    }
}

impl Selector {
    /// Empty structured selector; add clauses with [`Selector::with`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(selector: impl Into<String>) -> Self {
        Selector::Raw(selector.into())
    }

    /// Append a `key → value` clause. Turns a raw selector into a structured one.
    pub fn with(self, key: impl Into<String>, value: impl Into<SelectorValue>) -> Self {
        let mut clauses = match self {
            Selector::Map(clauses) => clauses,
            Selector::Raw(_) => Vec::new(),
        };
        clauses.push((key.into(), value.into()));
        Selector::Map(clauses)
    }

    /// Field names referenced by a structured selector (empty for raw ones)
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Selector::Raw(_) => Vec::new(),
            Selector::Map(clauses) => clauses
                .iter()
                .map(|(key, _)| key.split(OPERATOR_SEPARATOR).next().unwrap_or(key))
                .collect(),
        }
    }

    /// Compile to the API wire syntax
    pub fn compile(&self) -> Result<String> {
        let clauses = match self {
            Selector::Raw(raw) => return Ok(raw.clone()),
            Selector::Map(clauses) => clauses,
        };

        let mut rendered = Vec::with_capacity(clauses.len());
        for (key, value) in clauses {
            let (label, op) = split_key(key)?;
            rendered.push(render_clause(label, op, value)?);
        }

        let compiled = rendered.join(",");
        trace!(selector = %compiled, "Compiled selector");
        Ok(compiled)
    }
}

/// Split `field__op` into its parts; a bare field means `eq`
fn split_key(key: &str) -> Result<(&str, SelectorOp)> {
    let bits: Vec<&str> = key.split(OPERATOR_SEPARATOR).collect();
    match bits.as_slice() {
        [label] => Ok((*label, SelectorOp::Eq)),
        [label, op] => Ok((*label, op.parse()?)),
        _ => Err(Error::InvalidSelector(format!(
            "too many {} in selector key '{}'",
            OPERATOR_SEPARATOR, key
        ))),
    }
}

fn render_clause(label: &str, op: SelectorOp, value: &SelectorValue) -> Result<String> {
    match (op, value) {
        (SelectorOp::Eq, SelectorValue::One(v)) => Ok(format!("{}={}", label, v)),
        (SelectorOp::Neq, SelectorValue::One(v)) => Ok(format!("{} != {}", label, v)),
        (SelectorOp::Eq | SelectorOp::Neq, SelectorValue::Many(_)) => Err(
            Error::InvalidSelector(format!("'{}' expects a single value, got a list", label)),
        ),
        (SelectorOp::In, v) => Ok(format!("{} in ({})", label, v.joined())),
        (SelectorOp::NotIn, v) => Ok(format!("{} notin ({})", label, v.joined())),
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::Raw(raw.to_string())
    }
}

impl From<String> for Selector {
    fn from(raw: String) -> Self {
        Selector::Raw(raw)
    }
}

impl<K, V> FromIterator<(K, V)> for Selector
where
    K: Into<String>,
    V: Into<SelectorValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Selector::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Selector
where
    K: Into<String>,
    V: Into<SelectorValue>,
{
    fn from(clauses: [(K, V); N]) -> Self {
        clauses.into_iter().collect()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compile() {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "{:?}", self),
        }
    }
}

// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering of objects, watch events and resource kinds

mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use serde_json::{Value, json};

use crate::cli::OutputFormat;
use kubeq::kubernetes::{ApiObject, ResourceKind, WatchEvent};

/// Column headers for listed objects
const NAMESPACE_COLUMN: &str = "NAMESPACE";
const OBJECT_COLUMNS: &[&str] = &["NAME", "RESOURCE VERSION", "CREATED"];

/// Rows and column headers ready for a formatter
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    /// Tabulate objects of `kind`; cluster-scoped kinds get no NAMESPACE column
    pub fn from_objects<K: ApiObject>(kind: &ResourceKind, objects: &[K]) -> Self {
        Self {
            columns: object_columns(kind),
            rows: objects.iter().map(|obj| object_row(kind, obj)).collect(),
        }
    }

    /// Tabulate the built-in kinds for `kubeq resources`
    pub fn from_kinds(kinds: &[ResourceKind]) -> Self {
        let columns = ["NAME", "SHORTNAMES", "APIVERSION", "NAMESPACED", "KIND"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = kinds
            .iter()
            .map(|kind| {
                vec![
                    kind.endpoint.to_string(),
                    kind.aliases.join(","),
                    kind.api_version(),
                    kind.namespaced.to_string(),
                    kind.kind.to_string(),
                ]
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column header
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let map = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned().map(Value::String))
                    .collect();
                Value::Object(map)
            })
            .collect()
    }

    pub fn format(&self, format: &OutputFormat, no_headers: bool) -> String {
        match format {
            OutputFormat::Table => TableFormatter::format(self, no_headers),
            OutputFormat::Json => JsonFormatter::format(&Value::Array(self.to_json_rows())),
            OutputFormat::Yaml => YamlFormatter::format(&Value::Array(self.to_json_rows())),
        }
    }
}

fn object_columns(kind: &ResourceKind) -> Vec<String> {
    let mut columns = Vec::with_capacity(OBJECT_COLUMNS.len() + 1);
    if kind.namespaced {
        columns.push(NAMESPACE_COLUMN.to_string());
    }
    columns.extend(OBJECT_COLUMNS.iter().map(|c| c.to_string()));
    columns
}

fn object_row<K: ApiObject>(kind: &ResourceKind, obj: &K) -> Vec<String> {
    let mut row = Vec::with_capacity(OBJECT_COLUMNS.len() + 1);
    if kind.namespaced {
        row.push(obj.namespace().unwrap_or_default().to_string());
    }
    row.push(obj.name().unwrap_or_default().to_string());
    row.push(obj.resource_version().unwrap_or_default().to_string());
    row.push(obj.creation_timestamp().unwrap_or_default().to_string());
    row
}

/// Render a list of objects
///
/// JSON and YAML emit a `List` document of the raw objects, the way the API
/// server itself would.
pub fn format_objects<K: ApiObject>(
    kind: &ResourceKind,
    objects: &[K],
    format: &OutputFormat,
    no_headers: bool,
) -> String {
    match format {
        OutputFormat::Table => QueryResult::from_objects(kind, objects).format(format, no_headers),
        OutputFormat::Json => JsonFormatter::format(&list_document(objects)),
        OutputFormat::Yaml => YamlFormatter::format(&list_document(objects)),
    }
}

/// Render a single object fetched by name
pub fn format_object<K: ApiObject>(
    kind: &ResourceKind,
    object: &K,
    format: &OutputFormat,
    no_headers: bool,
) -> String {
    match format {
        OutputFormat::Table => {
            QueryResult::from_objects(kind, std::slice::from_ref(object)).format(format, no_headers)
        }
        OutputFormat::Json => JsonFormatter::format(object.raw()),
        OutputFormat::Yaml => YamlFormatter::format(object.raw()),
    }
}

fn list_document<K: ApiObject>(objects: &[K]) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "List",
        "items": objects.iter().map(|o| o.raw().clone()).collect::<Vec<_>>(),
    })
}

/// Render one watch event
///
/// Tables get one line per event (with a header before the first one unless
/// `header` is false), JSON gets one compact document per line and YAML one
/// `---` separated document per event.
pub fn format_event<K: ApiObject>(
    kind: &ResourceKind,
    event: &WatchEvent<K>,
    format: &OutputFormat,
    header: bool,
) -> String {
    match format {
        OutputFormat::Table => {
            let mut columns = vec!["EVENT".to_string()];
            columns.extend(object_columns(kind));
            let mut row = vec![event.event_type.as_str().to_string()];
            row.extend(object_row(kind, &event.object));
            TableFormatter::format_line(&columns, &row, header)
        }
        OutputFormat::Json => JsonFormatter::format_compact(&event_document(event)),
        OutputFormat::Yaml => format!("---\n{}", YamlFormatter::format(&event_document(event))),
    }
}

fn event_document<K: ApiObject>(event: &WatchEvent<K>) -> Value {
    json!({
        "type": event.event_type.as_str(),
        "object": event.object.raw(),
    })
}

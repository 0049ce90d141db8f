// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::borrow::Cow;

use comfy_table::{
    Table,
    presets::{ASCII_BORDERS_ONLY_CONDENSED, NOTHING},
};

use super::QueryResult;

/// Maximum width of a single cell (long names, generated labels)
const MAX_COLUMN_WIDTH: usize = 63;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

fn cells(row: &[String]) -> Vec<Cow<'_, str>> {
    row.iter()
        .map(|val| truncate_value(val, MAX_COLUMN_WIDTH))
        .collect()
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(result: &QueryResult, no_headers: bool) -> String {
        if result.is_empty() {
            return "No resources found.".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        if !no_headers {
            table.set_header(&result.columns);
        }

        for row in &result.rows {
            table.add_row(cells(row));
        }

        let output = table.to_string();
        format!("{}\n({} rows)", output, result.row_count())
    }

    /// A borderless single row, optionally preceded by the header
    ///
    /// Used for streamed output where the full row set is never known.
    pub fn format_line(columns: &[String], row: &[String], header: bool) -> String {
        let mut table = Table::new();
        table.load_preset(NOTHING);

        if header {
            table.set_header(columns);
        }
        table.add_row(cells(row));
        table.to_string()
    }
}

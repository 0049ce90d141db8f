// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde_json::Value;

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(value: &Value) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
    }

    /// Single-line form, one document per watch event
    pub fn format_compact(value: &Value) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
    }
}

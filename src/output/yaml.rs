// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use serde_json::Value;

pub struct YamlFormatter;

impl YamlFormatter {
    pub fn format(value: &Value) -> String {
        serde_yaml::to_string(value).unwrap_or_else(|_| "null\n".to_string())
    }
}

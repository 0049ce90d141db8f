// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod args;

pub use args::{Args, Command, OutputFormat, Target};

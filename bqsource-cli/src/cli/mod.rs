// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for bqsource
//!
//! Runs query batches from a file against a configured data source, and
//! exposes the health check and the effective settings.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_health, handle_query, handle_settings};

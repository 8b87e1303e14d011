// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Single-query execution
//!
//! This module takes one host query, runs it against the warehouse, and
//! reshapes the rows into parallel time/value columns.

pub mod error;
pub mod executor;
pub mod request;
pub mod result;
pub mod state;

pub use error::QueryError;
pub use executor::QueryExecutor;
pub use request::{DataQuery, QueryFormat, QueryModel, TimeRange};
pub use result::{Field, FieldValues, Frame, FrameMeta, TimeSeries};
pub use state::QueryState;

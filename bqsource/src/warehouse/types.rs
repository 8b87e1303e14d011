// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Warehouse types and error handling
//!
//! This module defines the types, enums, and error handling shared by all
//! warehouse backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Warehouse backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseType {
    /// Google BigQuery over its REST API
    #[default]
    BigQuery,

    /// Scripted in-memory warehouse
    /// Best for: Unit testing, demos, local development
    Memory,
}

impl std::str::FromStr for WarehouseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bigquery" => Ok(WarehouseType::BigQuery),
            "memory" => Ok(WarehouseType::Memory),
            _ => Err(format!(
                "Unknown warehouse type: {}. Valid options: bigquery, memory",
                s
            )),
        }
    }
}

impl fmt::Display for WarehouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarehouseType::BigQuery => "bigquery",
            WarehouseType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by warehouse backends
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// The request never produced an HTTP response (DNS, TLS, reset, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error envelope
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    /// A response body could not be understood
    #[error("decode error: {0}")]
    Decode(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Backend was configured in a way it cannot run with
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for warehouse operations
pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Query job submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Raw SQL text, submitted verbatim
    pub query: String,
    /// Execution location; must match the location of the referenced datasets
    pub location: Option<String>,
}

impl JobRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }
}

/// Failure reported by the warehouse for a job that reached a terminal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub reason: String,
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {} (at {})", self.reason, self.message, location),
            None => write!(f, "{}: {}", self.reason, self.message),
        }
    }
}

impl std::error::Error for JobFailure {}

/// Terminal status of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: String,
    pub error: Option<JobFailure>,
}

impl JobStatus {
    pub fn succeeded(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            error: None,
        }
    }

    pub fn failed(job_id: impl Into<String>, failure: JobFailure) -> Self {
        Self {
            job_id: job_id.into(),
            error: Some(failure),
        }
    }

    /// Job-level error, if the job failed
    pub fn err(&self) -> Option<&JobFailure> {
        self.error.as_ref()
    }
}

/// One result row: the `time` and `metric` columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarehouseRow {
    pub time: DateTime<Utc>,
    /// INT64, NUMERIC and FLOAT64 columns all land here; integers beyond
    /// 2^53 round to the nearest representable value
    pub metric: f64,
}

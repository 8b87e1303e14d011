// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query requests
//!
//! A [`DataQuery`] is what the host sends for one panel: an identifier and an
//! opaque JSON payload. The payload stays raw bytes until the executor parses
//! it into a [`QueryModel`], so one malformed payload only fails its own query.

use super::error::QueryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Dashboard time range of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// One query of a batch, as received from the host
///
/// The host metadata is informational; the SQL in the payload is run as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataQuery {
    /// Identifier, unique within a batch
    pub ref_id: String,
    pub query_type: String,
    pub max_data_points: i64,
    pub interval: Duration,
    pub time_range: Option<TimeRange>,
    /// Configuration payload (JSON document)
    pub json: Vec<u8>,
}

impl DataQuery {
    pub fn new(ref_id: impl Into<String>, json: impl Into<Vec<u8>>) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_type: String::new(),
            max_data_points: 0,
            interval: Duration::ZERO,
            time_range: None,
            json: json.into(),
        }
    }

    pub fn with_time_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeRange { from, to });
        self
    }

    /// Build a query from a host query object
    ///
    /// Identifier and host metadata come from the `refId`, `queryType`,
    /// `maxDataPoints`, `intervalMs` and `timeRange` keys; the whole object
    /// becomes the payload.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let time_range = value
            .get("timeRange")
            .and_then(|v| TimeRange::deserialize(v).ok());

        Self {
            ref_id: text("refId"),
            query_type: text("queryType"),
            max_data_points: value
                .get("maxDataPoints")
                .and_then(|v| v.as_i64())
                .unwrap_or_default(),
            interval: Duration::from_millis(
                value
                    .get("intervalMs")
                    .and_then(|v| v.as_u64())
                    .unwrap_or_default(),
            ),
            time_range,
            json: value.to_string().into_bytes(),
        }
    }

    /// Parse the payload into a validated [`QueryModel`]
    pub fn parse_model(&self) -> Result<QueryModel, QueryError> {
        let model: QueryModel = serde_json::from_slice(&self.json)?;
        model.validate()?;
        Ok(model)
    }
}

/// Output-format hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFormat {
    #[default]
    TimeSeries,
    Table,
}

impl QueryFormat {
    /// Visualisation the host should prefer for this format
    pub fn preferred_visualisation(&self) -> &'static str {
        match self {
            QueryFormat::TimeSeries => "graph",
            QueryFormat::Table => "table",
        }
    }
}

/// Typed query configuration
///
/// `rawSql` and `project` are required. The grouping, ordering and
/// partitioning hints are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    /// Output format as sent; see [`QueryModel::format`]
    #[serde(default, deserialize_with = "null_as_empty")]
    pub format: String,
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub metric_column: String,
    #[serde(default)]
    pub order_by_col: String,
    #[serde(default)]
    pub order_by_sort: String,
    #[serde(default)]
    pub partitioned: bool,
    #[serde(default)]
    pub partitioned_field: String,
    /// Project the query runs in (and is billed to)
    pub project: String,
    #[serde(default)]
    pub raw_query: bool,
    /// SQL text submitted verbatim
    pub raw_sql: String,
    #[serde(default)]
    pub ref_id: String,
    #[serde(default)]
    pub sharded: bool,
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub time_column: String,
    #[serde(default)]
    pub time_column_type: String,
    /// Execution location; must match the referenced datasets
    #[serde(default)]
    pub location: Option<String>,
}

impl QueryModel {
    /// Effective output format
    ///
    /// Anything other than `table` (empty, absent or unrecognized) is a time series.
    pub fn format(&self) -> QueryFormat {
        self.known_format().unwrap_or_default()
    }

    /// The format named by the payload, if it is one this data source renders
    pub fn known_format(&self) -> Option<QueryFormat> {
        match self.format.trim() {
            "time_series" => Some(QueryFormat::TimeSeries),
            "table" => Some(QueryFormat::Table),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), QueryError> {
        if self.raw_sql.trim().is_empty() {
            return Err(QueryError::Parse("rawSql must not be empty".to_string()));
        }
        if self.project.trim().is_empty() {
            return Err(QueryError::Parse("project must not be empty".to_string()));
        }
        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

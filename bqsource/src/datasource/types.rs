// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Host-facing request and response types

use crate::coordinator::BatchResponse;
use crate::exec::{DataQuery, Frame, QueryError, TimeSeries};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Settings of one configured data-source instance, as held by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInstanceSettings {
    pub uid: String,
    #[serde(default)]
    pub name: String,
    /// Bumped by the host whenever the settings change
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub json_data: serde_json::Value,
}

impl DataSourceInstanceSettings {
    pub fn new(uid: impl Into<String>, json_data: serde_json::Value) -> Self {
        Self {
            uid: uid.into(),
            name: String::new(),
            updated: Utc::now(),
            json_data,
        }
    }
}

/// Context the host attaches to every call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginContext {
    pub org_id: i64,
    pub datasource_instance_settings: Option<DataSourceInstanceSettings>,
}

impl PluginContext {
    pub fn for_instance(settings: DataSourceInstanceSettings) -> Self {
        Self {
            org_id: 0,
            datasource_instance_settings: Some(settings),
        }
    }
}

/// A batch of queries from the host
#[derive(Debug, Clone)]
pub struct QueryDataRequest {
    pub plugin_context: PluginContext,
    pub queries: Vec<DataQuery>,
}

impl QueryDataRequest {
    pub fn new(plugin_context: PluginContext, queries: Vec<DataQuery>) -> Self {
        Self {
            plugin_context,
            queries,
        }
    }
}

/// Result for one query, in the host's shape
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DataResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl From<Result<TimeSeries, QueryError>> for DataResponse {
    fn from(result: Result<TimeSeries, QueryError>) -> Self {
        match result {
            Ok(series) => DataResponse {
                frames: vec![series.to_frame()],
                error: None,
            },
            Err(e) => DataResponse::error(e.to_string()),
        }
    }
}

/// Responses for a whole batch, keyed by query identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDataResponse {
    pub results: BTreeMap<String, DataResponse>,
}

impl QueryDataResponse {
    /// Convert a coordinator batch
    ///
    /// With `report_timeouts` set, each timed-out query gets an error entry
    /// naming the budget the batch actually ran under; otherwise it is left out.
    pub fn from_batch(batch: BatchResponse, report_timeouts: bool) -> Self {
        let budget = batch.budget();
        let (responses, timed_out) = batch.into_parts();
        let mut results: BTreeMap<String, DataResponse> = responses
            .into_iter()
            .map(|(ref_id, result)| (ref_id, DataResponse::from(result)))
            .collect();

        if report_timeouts {
            for ref_id in timed_out {
                results.insert(ref_id, DataResponse::error(timeout_message(budget)));
            }
        }
        Self { results }
    }

    pub fn get(&self, ref_id: &str) -> Option<&DataResponse> {
        self.results.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn timeout_message(budget: Duration) -> String {
    if budget.subsec_millis() == 0 {
        format!("query timed out after {}s", budget.as_secs())
    } else {
        format!("query timed out after {:.1}s", budget.as_secs_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckHealthResult {
    pub status: HealthStatus,
    pub message: String,
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-source configuration
//!
//! Settings arrive from the host as a JSON document attached to the
//! data-source instance. They can also be loaded from a JSON file for the CLI.

use crate::warehouse::{MemoryFixture, WarehouseType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default deadline shared by every query of one batch
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Default BigQuery REST endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for one data-source instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceSettings {
    /// Warehouse backend to run queries against
    #[serde(default)]
    pub warehouse: WarehouseType,

    /// Deadline for a whole batch, not per query
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Emit an explicit error for queries cut off by the deadline
    #[serde(default = "default_true")]
    pub report_timeouts: bool,

    #[serde(default)]
    pub bigquery: BigQueryConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

/// BigQuery REST backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BigQueryConfig {
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// Pre-issued OAuth bearer token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Interval between job status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Rows requested per result page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Timeout for a single HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// In-memory backend settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    #[serde(default)]
    pub fixtures: Vec<MemoryFixture>,
}

fn default_query_timeout_secs() -> u64 {
    DEFAULT_QUERY_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_page_size() -> u32 {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for DatasourceSettings {
    fn default() -> Self {
        Self {
            warehouse: WarehouseType::default(),
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            report_timeouts: true,
            bigquery: BigQueryConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for BigQueryConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            access_token: None,
            poll_interval_ms: default_poll_interval_ms(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DatasourceSettings {
    /// Parse settings from the host's JSON settings document
    ///
    /// An empty document (`null` or `{}`) yields the defaults.
    pub fn from_json_data(json_data: &serde_json::Value) -> Result<Self, ConfigError> {
        let settings = if json_data.is_null() {
            Self::default()
        } else {
            Self::deserialize(json_data)?
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value constraints serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "queryTimeoutSecs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.bigquery.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "bigquery.pollIntervalMs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.bigquery.page_size == 0 {
            return Err(ConfigError::Invalid {
                field: "bigquery.pageSize",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.bigquery.api_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "bigquery.apiEndpoint",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl BigQueryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_document_uses_defaults() {
        let settings = DatasourceSettings::from_json_data(&serde_json::json!({})).unwrap();
        assert_eq!(settings, DatasourceSettings::default());
        assert_eq!(settings.query_timeout(), Duration::from_secs(60));
        assert!(settings.report_timeouts);

        let settings = DatasourceSettings::from_json_data(&serde_json::Value::Null).unwrap();
        assert_eq!(settings.warehouse, WarehouseType::BigQuery);
    }

    #[test]
    fn test_camel_case_keys() {
        let settings = DatasourceSettings::from_json_data(&serde_json::json!({
            "warehouse": "memory",
            "queryTimeoutSecs": 5,
            "reportTimeouts": false,
            "bigquery": {"pollIntervalMs": 250, "accessToken": "tok"}
        }))
        .unwrap();

        assert_eq!(settings.warehouse, WarehouseType::Memory);
        assert_eq!(settings.query_timeout_secs, 5);
        assert!(!settings.report_timeouts);
        assert_eq!(settings.bigquery.poll_interval(), Duration::from_millis(250));
        assert_eq!(settings.bigquery.access_token.as_deref(), Some("tok"));
        assert_eq!(settings.bigquery.api_endpoint, DEFAULT_API_ENDPOINT);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = DatasourceSettings::from_json_data(&serde_json::json!({"queryTimeoutSecs": 0}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "queryTimeoutSecs", .. }));
    }

    #[test]
    fn test_unknown_warehouse_is_a_parse_error() {
        let err = DatasourceSettings::from_json_data(&serde_json::json!({"warehouse": "oracle"}))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"warehouse": "memory", "memory": {{"fixtures": [{{"sql": "SELECT 1"}}]}}}}"#
        )
        .unwrap();

        let settings = DatasourceSettings::load(file.path()).unwrap();
        assert_eq!(settings.memory.fixtures.len(), 1);
        assert_eq!(settings.memory.fixtures[0].sql, "SELECT 1");
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = DatasourceSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}

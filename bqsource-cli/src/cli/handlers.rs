// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for bqsource

use colored::Colorize;
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use bqsource::datasource::HealthStatus;
use bqsource::{
    BigQueryDatasource, ConfigError, DataQuery, DataSourceInstanceSettings, DatasourceSettings,
    PluginContext, QueryDataRequest,
};

/// Instance uid used for the single data source the CLI configures
const CLI_INSTANCE_UID: &str = "cli";

/// Handle the query command
///
/// Every query of the batch file runs concurrently under one deadline; the
/// response is printed once the whole batch is done.
pub fn handle_query(
    batch: PathBuf,
    settings: Option<PathBuf>,
    format: OutputFormat,
    timeout: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let mut settings = load_settings(settings.as_deref())?;
    if let Some(secs) = timeout {
        settings.query_timeout_secs = secs;
        settings.validate()?;
    }

    let queries = load_batch(&batch)?;
    if queries.is_empty() {
        println!("{}", "Batch file contains no queries".yellow());
        return Ok(());
    }
    log::info!("Running {} queries from {}", queries.len(), batch.display());

    let request = QueryDataRequest::new(plugin_context(&settings)?, queries);
    let datasource = BigQueryDatasource::new();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    // Errors go back to main, which reports them once
    let response = runtime.block_on(datasource.query_data(request))?;
    println!("{}", ResultFormatter::format(&response, format));
    Ok(())
}

/// Handle the health command
pub fn handle_health(settings: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let settings = load_settings(settings.as_deref())?;
    let context = plugin_context(&settings)?;
    let datasource = BigQueryDatasource::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(datasource.check_health(&context));
    match result.status {
        HealthStatus::Ok => println!("{}", format!("✅ {}", result.message).green()),
        HealthStatus::Error => println!("{}", format!("❌ {}", result.message).red()),
    }
    Ok(())
}

/// Handle the settings command
pub fn handle_settings(settings: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let mut settings = load_settings(settings.as_deref())?;
    if settings.bigquery.access_token.is_some() {
        settings.bigquery.access_token = Some("********".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<DatasourceSettings, ConfigError> {
    match path {
        Some(path) => DatasourceSettings::load(path),
        None => Ok(DatasourceSettings::default()),
    }
}

fn plugin_context(settings: &DatasourceSettings) -> Result<PluginContext, serde_json::Error> {
    let json_data = serde_json::to_value(settings)?;
    Ok(PluginContext::for_instance(DataSourceInstanceSettings::new(
        CLI_INSTANCE_UID,
        json_data,
    )))
}

/// Read a batch file into queries
///
/// Queries without a `refId` are named A, B, C... by position.
pub(crate) fn load_batch(path: &Path) -> Result<Vec<DataQuery>, Box<dyn Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read batch file {}: {}", path.display(), e))?;
    let document: Value = serde_json::from_str(&contents)?;

    let entries = match &document {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("queries") {
            Some(Value::Array(items)) => items,
            _ => return Err("batch object has no \"queries\" array".into()),
        },
        _ => return Err("batch must be an array of queries or an object with \"queries\"".into()),
    };

    Ok(entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let mut query = DataQuery::from_value(entry);
            if query.ref_id.is_empty() {
                query.ref_id = positional_ref_id(index);
            }
            query
        })
        .collect())
}

fn positional_ref_id(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => format!("Q{}", index + 1),
    }
}

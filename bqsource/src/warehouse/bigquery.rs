// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! BigQuery REST warehouse implementation
//!
//! Talks to the BigQuery v2 REST API directly:
//! - `jobs.insert` to submit a query job
//! - `jobs.get` polled until the job is `DONE`
//! - `jobs.getQueryResults` paged to read the rows
//!
//! Credentials are not acquired here; the configured bearer token is sent as is.

use super::traits::{RowReader, Warehouse, WarehouseJob, WarehouseSession};
use super::types::{
    JobFailure, JobRequest, JobStatus, WarehouseError, WarehouseResult, WarehouseRow,
    WarehouseType,
};
use crate::config::BigQueryConfig;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

const TIME_COLUMN: &str = "time";
const METRIC_COLUMN: &str = "metric";

/// BigQuery warehouse backed by the REST API
pub struct BigQueryWarehouse {
    client: reqwest::Client,
    config: BigQueryConfig,
}

impl BigQueryWarehouse {
    pub fn new(config: BigQueryConfig) -> WarehouseResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| WarehouseError::Configuration(format!("http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn warehouse_type(&self) -> WarehouseType {
        WarehouseType::BigQuery
    }

    async fn connect(&self, project: &str) -> WarehouseResult<Box<dyn WarehouseSession>> {
        if project.trim().is_empty() {
            return Err(WarehouseError::Configuration(
                "project id is required".to_string(),
            ));
        }

        Ok(Box::new(BigQuerySession {
            api: Api {
                client: self.client.clone(),
                endpoint: self.config.api_endpoint.trim_end_matches('/').to_string(),
                token: self.config.access_token.clone(),
                project: project.to_string(),
            },
            poll_interval: self.config.poll_interval(),
            page_size: self.config.page_size,
        }))
    }
}

/// Authenticated request helper for one project
#[derive(Clone)]
struct Api {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    project: String,
}

impl Api {
    fn jobs_url(&self) -> String {
        format!("{}/projects/{}/jobs", self.endpoint, self.project)
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/{}", self.jobs_url(), job_id)
    }

    fn results_url(&self, job_id: &str) -> String {
        format!(
            "{}/projects/{}/queries/{}",
            self.endpoint, self.project, job_id
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> WarehouseResult<T> {
        let response = self
            .authorize(self.client.get(url).query(query))
            .send()
            .await
            .map_err(|e| WarehouseError::Transport(e.to_string()))?;
        decode_response(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> WarehouseResult<T> {
        let response = self
            .authorize(self.client.post(url).json(body))
            .send()
            .await
            .map_err(|e| WarehouseError::Transport(e.to_string()))?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: reqwest::Response) -> WarehouseResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WarehouseError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(api_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| WarehouseError::Decode(e.to_string()))
}

fn api_error(status: u16, body: &str) -> WarehouseError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => WarehouseError::Api {
            code: envelope.error.code.unwrap_or(status),
            message: envelope.error.message,
        },
        Err(_) => WarehouseError::Api {
            code: status,
            message: body.trim().to_string(),
        },
    }
}

struct BigQuerySession {
    api: Api,
    poll_interval: Duration,
    page_size: u32,
}

#[async_trait]
impl WarehouseSession for BigQuerySession {
    fn project(&self) -> &str {
        &self.api.project
    }

    async fn submit(&self, request: &JobRequest) -> WarehouseResult<Box<dyn WarehouseJob>> {
        let body = InsertJob {
            configuration: JobConfiguration {
                query: QueryConfiguration {
                    query: &request.query,
                    use_legacy_sql: false,
                },
            },
            job_reference: NewJobReference {
                project_id: &self.api.project,
                location: request.location.as_deref(),
            },
        };

        let job: JobResource = self.api.post(&self.api.jobs_url(), &body).await?;
        log::debug!(
            "Submitted BigQuery job {} in project {}",
            job.job_reference.job_id,
            self.api.project
        );

        Ok(Box::new(BigQueryJob {
            api: self.api.clone(),
            job_id: job.job_reference.job_id,
            location: job.job_reference.location.or_else(|| request.location.clone()),
            poll_interval: self.poll_interval,
            page_size: self.page_size,
        }))
    }

    async fn close(self: Box<Self>) -> WarehouseResult<()> {
        // Connections belong to the shared client pool; nothing to tear down per session
        Ok(())
    }
}

struct BigQueryJob {
    api: Api,
    job_id: String,
    location: Option<String>,
    poll_interval: Duration,
    page_size: u32,
}

impl BigQueryJob {
    fn location_param(&self) -> Vec<(&'static str, String)> {
        self.location
            .iter()
            .map(|l| ("location", l.clone()))
            .collect()
    }
}

#[async_trait]
impl WarehouseJob for BigQueryJob {
    fn id(&self) -> &str {
        &self.job_id
    }

    async fn wait(&mut self) -> WarehouseResult<JobStatus> {
        let url = self.api.job_url(&self.job_id);
        let params = self.location_param();

        loop {
            let job: JobResource = self.api.get(&url, &params).await?;
            let status = job.status.unwrap_or_default();
            if status.state == "DONE" {
                return Ok(match status.error_result {
                    Some(error) => JobStatus::failed(self.job_id.clone(), error.into()),
                    None => JobStatus::succeeded(self.job_id.clone()),
                });
            }
            log::trace!("BigQuery job {} is {}", self.job_id, status.state);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn read(&mut self) -> WarehouseResult<Box<dyn RowReader>> {
        let mut reader = BigQueryRowReader {
            api: self.api.clone(),
            url: self.api.results_url(&self.job_id),
            location: self.location.clone(),
            page_size: self.page_size,
            buffer: VecDeque::new(),
            page_token: None,
            exhausted: false,
        };
        reader.fetch_page().await?;
        Ok(Box::new(reader))
    }
}

struct BigQueryRowReader {
    api: Api,
    url: String,
    location: Option<String>,
    page_size: u32,
    buffer: VecDeque<WarehouseRow>,
    page_token: Option<String>,
    exhausted: bool,
}

impl BigQueryRowReader {
    async fn fetch_page(&mut self) -> WarehouseResult<()> {
        let mut params = vec![("maxResults", self.page_size.to_string())];
        if let Some(location) = &self.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = &self.page_token {
            params.push(("pageToken", token.clone()));
        }

        let page: QueryResultsPage = self.api.get(&self.url, &params).await?;
        if page.job_complete == Some(false) {
            return Err(WarehouseError::Decode(
                "results requested before the job completed".to_string(),
            ));
        }

        self.buffer.extend(decode_page(&page)?);
        self.page_token = page.page_token.filter(|t| !t.is_empty());
        self.exhausted = self.page_token.is_none();
        Ok(())
    }
}

#[async_trait]
impl RowReader for BigQueryRowReader {
    async fn next_row(&mut self) -> WarehouseResult<Option<WarehouseRow>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }
}

/// Decode one results page into rows, locating columns by schema name
fn decode_page(page: &QueryResultsPage) -> WarehouseResult<Vec<WarehouseRow>> {
    let rows = match &page.rows {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Ok(Vec::new()),
    };
    let schema = page
        .schema
        .as_ref()
        .ok_or_else(|| WarehouseError::Decode("result page has rows but no schema".to_string()))?;

    let column = |name: &str| {
        schema
            .fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WarehouseError::Decode(format!("result has no `{}` column", name)))
    };
    let time_idx = column(TIME_COLUMN)?;
    let metric_idx = column(METRIC_COLUMN)?;

    rows.iter()
        .map(|row| {
            let cell = |idx: usize, name: &str| {
                row.f
                    .get(idx)
                    .and_then(|c| c.v.as_str())
                    .ok_or_else(|| WarehouseError::Decode(format!("NULL in column `{}`", name)))
            };
            let time = parse_timestamp(cell(time_idx, TIME_COLUMN)?)?;
            let raw_metric = cell(metric_idx, METRIC_COLUMN)?;
            let metric = raw_metric.parse::<f64>().map_err(|_| {
                WarehouseError::Decode(format!("`{}` is not numeric: {}", METRIC_COLUMN, raw_metric))
            })?;
            Ok(WarehouseRow { time, metric })
        })
        .collect()
}

/// Parse a TIMESTAMP (epoch seconds as a float string) or DATETIME cell
fn parse_timestamp(value: &str) -> WarehouseResult<DateTime<Utc>> {
    if let Ok(seconds) = value.parse::<f64>() {
        if !seconds.is_finite() {
            return Err(WarehouseError::Decode(format!("timestamp is not finite: {}", value)));
        }
        let micros = (seconds * 1_000_000.0).round() as i64;
        return DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| WarehouseError::Decode(format!("timestamp out of range: {}", value)));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| WarehouseError::Decode(format!("unrecognized timestamp: {}", value)))
}

// Wire types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertJob<'a> {
    configuration: JobConfiguration<'a>,
    job_reference: NewJobReference<'a>,
}

#[derive(Serialize)]
struct JobConfiguration<'a> {
    query: QueryConfiguration<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryConfiguration<'a> {
    query: &'a str,
    use_legacy_sql: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewJobReference<'a> {
    project_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatusResource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct JobStatusResource {
    #[serde(default)]
    state: String,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    location: Option<String>,
}

impl From<ErrorProto> for JobFailure {
    fn from(error: ErrorProto) -> Self {
        JobFailure {
            reason: error.reason.unwrap_or_else(|| "unknown".to_string()),
            message: error.message.unwrap_or_default(),
            location: error.location,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultsPage {
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Option<Vec<TableRow>>,
    #[serde(default)]
    page_token: Option<String>,
    #[serde(default)]
    job_complete: Option<bool>,
}

#[derive(Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Deserialize)]
struct FieldSchema {
    name: String,
}

#[derive(Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Deserialize)]
struct TableCell {
    #[serde(default)]
    v: serde_json::Value,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

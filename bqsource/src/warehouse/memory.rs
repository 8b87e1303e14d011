// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory warehouse implementation for testing
//!
//! Queries are answered from fixtures keyed by their exact SQL text. A query
//! with no fixture fails at the job level, the way an invalid query does in
//! BigQuery.

use super::traits::{RowReader, Warehouse, WarehouseJob, WarehouseSession};
use super::types::{
    JobFailure, JobRequest, JobStatus, WarehouseError, WarehouseResult, WarehouseRow,
    WarehouseType,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Scripted answer for one query text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryFixture {
    /// Exact SQL text this fixture answers
    pub sql: String,

    /// Rows, returned in this order
    #[serde(default)]
    pub rows: Vec<WarehouseRow>,

    /// Time the job takes to reach a terminal state
    #[serde(default)]
    pub delay_ms: u64,

    /// Reject the query at submission
    #[serde(default)]
    pub submit_error: Option<String>,

    /// Run the job, then report this failure
    #[serde(default)]
    pub job_error: Option<String>,

    /// Fail the reader after the last row instead of ending cleanly
    #[serde(default)]
    pub read_error: Option<String>,
}

impl MemoryFixture {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn rows(mut self, rows: Vec<WarehouseRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn submit_error(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    pub fn job_error(mut self, message: impl Into<String>) -> Self {
        self.job_error = Some(message.into());
        self
    }

    pub fn read_error(mut self, message: impl Into<String>) -> Self {
        self.read_error = Some(message.into());
        self
    }
}

/// Holds jobs before completion until opened
///
/// Opening is permanent: jobs that reach the gate afterwards pass straight
/// through.
#[derive(Debug, Clone)]
pub struct Gate {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
            waiting: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Release every current and future waiter
    pub fn open(&self) {
        self.permits.close();
    }

    pub fn is_open(&self) -> bool {
        self.permits.is_closed()
    }

    /// Number of jobs currently blocked on this gate
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    async fn pass(&self) {
        self.waiting.fetch_add(1, Ordering::SeqCst);
        let _waiting = WaitingGuard(&self.waiting);
        // Acquire only fails once the semaphore is closed, which is the release signal
        let _ = self.permits.acquire().await;
    }
}

/// Leaves the waiting count on drop, so a cancelled waiter is uncounted too
struct WaitingGuard<'a>(&'a AtomicUsize);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// A recorded job submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub project: String,
    pub query: String,
    pub location: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryStats {
    sessions_opened: AtomicUsize,
    sessions_open: AtomicUsize,
    jobs_submitted: AtomicUsize,
    disposals: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

#[derive(Clone)]
struct Script {
    fixture: MemoryFixture,
    gate: Option<Gate>,
}

/// In-memory warehouse for testing
pub struct MemoryWarehouse {
    scripts: Arc<RwLock<HashMap<String, Script>>>,
    connect_errors: RwLock<HashMap<String, String>>,
    stats: Arc<MemoryStats>,
}

impl MemoryWarehouse {
    /// Create an empty memory warehouse
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            connect_errors: RwLock::new(HashMap::new()),
            stats: Arc::new(MemoryStats::default()),
        }
    }

    /// Create a memory warehouse answering the given fixtures
    pub fn from_fixtures(fixtures: impl IntoIterator<Item = MemoryFixture>) -> Self {
        let warehouse = Self::new();
        for fixture in fixtures {
            warehouse.add_fixture(fixture);
        }
        warehouse
    }

    /// Add or replace the fixture for its SQL text
    pub fn add_fixture(&self, fixture: MemoryFixture) {
        let mut scripts = self.scripts.write();
        let gate = scripts.get(&fixture.sql).and_then(|s| s.gate.clone());
        scripts.insert(fixture.sql.clone(), Script { fixture, gate });
    }

    pub fn with_fixture(self, fixture: MemoryFixture) -> Self {
        self.add_fixture(fixture);
        self
    }

    /// Shorthand for a fixture that only returns rows
    pub fn with_rows(self, sql: impl Into<String>, rows: Vec<WarehouseRow>) -> Self {
        self.with_fixture(MemoryFixture::new(sql).rows(rows))
    }

    /// Hold jobs for `sql` at `gate` before they complete
    pub fn with_gate(self, sql: impl Into<String>, gate: Gate) -> Self {
        let sql = sql.into();
        {
            let mut scripts = self.scripts.write();
            let script = scripts.entry(sql.clone()).or_insert_with(|| Script {
                fixture: MemoryFixture::new(sql),
                gate: None,
            });
            script.gate = Some(gate);
        }
        self
    }

    /// Refuse sessions for `project`
    pub fn with_connect_error(self, project: impl Into<String>, message: impl Into<String>) -> Self {
        self.connect_errors
            .write()
            .insert(project.into(), message.into());
        self
    }

    /// Total sessions ever opened
    pub fn sessions_opened(&self) -> usize {
        self.stats.sessions_opened.load(Ordering::SeqCst)
    }

    /// Sessions opened and not yet closed or dropped
    pub fn open_sessions(&self) -> usize {
        self.stats.sessions_open.load(Ordering::SeqCst)
    }

    pub fn jobs_submitted(&self) -> usize {
        self.stats.jobs_submitted.load(Ordering::SeqCst)
    }

    /// Times this warehouse was disposed by its owner
    pub fn disposals(&self) -> usize {
        self.stats.disposals.load(Ordering::SeqCst)
    }

    /// Every submission, in submission order
    pub fn submissions(&self) -> Vec<Submission> {
        self.stats.submissions.lock().clone()
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    fn warehouse_type(&self) -> WarehouseType {
        WarehouseType::Memory
    }

    async fn connect(&self, project: &str) -> WarehouseResult<Box<dyn WarehouseSession>> {
        if let Some(message) = self.connect_errors.read().get(project) {
            return Err(WarehouseError::Transport(message.clone()));
        }

        self.stats.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.stats.sessions_open.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MemorySession {
            project: project.to_string(),
            scripts: self.scripts.clone(),
            stats: self.stats.clone(),
        }))
    }

    fn dispose(&self) {
        self.stats.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemorySession {
    project: String,
    scripts: Arc<RwLock<HashMap<String, Script>>>,
    stats: Arc<MemoryStats>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.stats.sessions_open.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WarehouseSession for MemorySession {
    fn project(&self) -> &str {
        &self.project
    }

    async fn submit(&self, request: &JobRequest) -> WarehouseResult<Box<dyn WarehouseJob>> {
        self.stats.jobs_submitted.fetch_add(1, Ordering::SeqCst);
        self.stats.submissions.lock().push(Submission {
            project: self.project.clone(),
            query: request.query.clone(),
            location: request.location.clone(),
        });

        let script = self.scripts.read().get(&request.query).cloned();
        if let Some(message) = script.as_ref().and_then(|s| s.fixture.submit_error.clone()) {
            return Err(WarehouseError::Api {
                code: 400,
                message,
            });
        }

        Ok(Box::new(MemoryJob {
            id: format!("job_{}", Uuid::new_v4().simple()),
            query: request.query.clone(),
            script,
        }))
    }

    async fn close(self: Box<Self>) -> WarehouseResult<()> {
        // Drop releases the session
        Ok(())
    }
}

struct MemoryJob {
    id: String,
    query: String,
    script: Option<Script>,
}

#[async_trait]
impl WarehouseJob for MemoryJob {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait(&mut self) -> WarehouseResult<JobStatus> {
        let script = match &self.script {
            Some(script) => script,
            None => {
                return Ok(JobStatus::failed(
                    self.id.clone(),
                    JobFailure {
                        reason: "invalidQuery".to_string(),
                        message: format!("Unrecognized name in query: {}", self.query),
                        location: None,
                    },
                ))
            }
        };

        if let Some(gate) = &script.gate {
            gate.pass().await;
        }
        if script.fixture.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(script.fixture.delay_ms)).await;
        }

        match &script.fixture.job_error {
            Some(message) => Ok(JobStatus::failed(
                self.id.clone(),
                JobFailure {
                    reason: "invalidQuery".to_string(),
                    message: message.clone(),
                    location: None,
                },
            )),
            None => Ok(JobStatus::succeeded(self.id.clone())),
        }
    }

    async fn read(&mut self) -> WarehouseResult<Box<dyn RowReader>> {
        let (rows, read_error) = match &self.script {
            Some(script) => (
                script.fixture.rows.clone(),
                script.fixture.read_error.clone(),
            ),
            None => return Err(WarehouseError::NotFound(format!("job {}", self.id))),
        };

        Ok(Box::new(MemoryRowReader {
            rows: rows.into_iter(),
            read_error,
        }))
    }
}

struct MemoryRowReader {
    rows: std::vec::IntoIter<WarehouseRow>,
    read_error: Option<String>,
}

#[async_trait]
impl RowReader for MemoryRowReader {
    async fn next_row(&mut self) -> WarehouseResult<Option<WarehouseRow>> {
        if let Some(row) = self.rows.next() {
            return Ok(Some(row));
        }
        match self.read_error.take() {
            Some(message) => Err(WarehouseError::Transport(message)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(secs: i64, metric: f64) -> WarehouseRow {
        WarehouseRow {
            time: Utc.timestamp_opt(secs, 0).unwrap(),
            metric,
        }
    }

    #[tokio::test]
    async fn test_rows_come_back_in_fixture_order() {
        let warehouse =
            MemoryWarehouse::new().with_rows("SELECT x", vec![row(30, 1.0), row(10, 2.0)]);

        let session = warehouse.connect("proj").await.unwrap();
        let mut job = session.submit(&JobRequest::new("SELECT x")).await.unwrap();
        assert!(job.wait().await.unwrap().err().is_none());

        let mut reader = job.read().await.unwrap();
        assert_eq!(reader.next_row().await.unwrap(), Some(row(30, 1.0)));
        assert_eq!(reader.next_row().await.unwrap(), Some(row(10, 2.0)));
        assert_eq!(reader.next_row().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_query_fails_at_job_level() {
        let warehouse = MemoryWarehouse::new();
        let session = warehouse.connect("proj").await.unwrap();
        let mut job = session.submit(&JobRequest::new("SELEC 1")).await.unwrap();

        let status = job.wait().await.unwrap();
        assert_eq!(status.err().map(|f| f.reason.as_str()), Some("invalidQuery"));
    }

    #[tokio::test]
    async fn test_sessions_are_released_on_close_and_drop() {
        let warehouse = MemoryWarehouse::new();

        let first = warehouse.connect("a").await.unwrap();
        let second = warehouse.connect("b").await.unwrap();
        assert_eq!(warehouse.open_sessions(), 2);

        first.close().await.unwrap();
        drop(second);
        assert_eq!(warehouse.open_sessions(), 0);
        assert_eq!(warehouse.sessions_opened(), 2);
    }

    #[tokio::test]
    async fn test_gate_blocks_until_opened() {
        let gate = Gate::new();
        let warehouse = Arc::new(MemoryWarehouse::new().with_gate("SELECT g", gate.clone()));

        let handle = {
            let warehouse = warehouse.clone();
            tokio::spawn(async move {
                let session = warehouse.connect("proj").await.unwrap();
                let mut job = session.submit(&JobRequest::new("SELECT g")).await.unwrap();
                job.wait().await.unwrap()
            })
        };

        while gate.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_finished());

        gate.open();
        let status = handle.await.unwrap();
        assert!(status.err().is_none());
        assert_eq!(gate.waiting(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_the_gate() {
        let gate = Gate::new();
        let warehouse = Arc::new(MemoryWarehouse::new().with_gate("SELECT g", gate.clone()));

        let handle = {
            let warehouse = warehouse.clone();
            tokio::spawn(async move {
                let session = warehouse.connect("proj").await.unwrap();
                let mut job = session.submit(&JobRequest::new("SELECT g")).await.unwrap();
                job.wait().await.unwrap()
            })
        };

        while gate.waiting() == 0 {
            tokio::task::yield_now().await;
        }
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert_eq!(gate.waiting(), 0);
        assert!(!gate.is_open());
        assert_eq!(warehouse.open_sessions(), 0);
    }

    #[test]
    fn test_fixture_deserializes_from_settings_json() {
        let fixture: MemoryFixture = serde_json::from_str(
            r#"{
                "sql": "SELECT time, metric FROM t",
                "rows": [{"time": "2024-01-01T00:00:00Z", "metric": 5}],
                "delayMs": 20
            }"#,
        )
        .unwrap();

        assert_eq!(fixture.rows.len(), 1);
        assert_eq!(fixture.rows[0].metric, 5.0);
        assert_eq!(fixture.delay_ms, 20);
        assert!(fixture.job_error.is_none());
    }
}

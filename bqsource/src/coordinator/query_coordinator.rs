// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - concurrent fan-out of one batch
//!
//! Every query of a batch runs as its own task, all under one deadline that
//! is derived once for the whole batch. Results are published into a shared
//! map under a mutex; a result that arrives after the deadline is dropped.
//! The coordinator waits for the tasks, bounded by the same deadline, and
//! returns a snapshot that no task can touch afterwards.

use super::batch::BatchResponse;
use crate::exec::{DataQuery, QueryError, QueryExecutor, TimeSeries};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

/// Deadline applied to a whole batch
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Response map shared by the tasks of one batch
#[derive(Default)]
struct SharedResponses {
    results: HashMap<String, Result<TimeSeries, QueryError>>,
    /// Set once the batch has returned; later publishes are discarded
    closed: bool,
}

impl SharedResponses {
    fn publish(&mut self, ref_id: String, result: Result<TimeSeries, QueryError>) {
        if self.closed {
            log::warn!("Query {} finished after its batch returned, dropping result", ref_id);
            return;
        }
        self.results.insert(ref_id, result);
    }

    fn close(&mut self) -> HashMap<String, Result<TimeSeries, QueryError>> {
        self.closed = true;
        std::mem::take(&mut self.results)
    }
}

/// Query Coordinator - runs a batch of independent queries concurrently
///
/// There is no concurrency limit: batches are one query per panel, so every
/// query gets a task immediately. Errors stay inside their query's entry;
/// executing a batch never fails as a whole.
pub struct QueryCoordinator {
    executor: Arc<QueryExecutor>,
    batch_timeout: Duration,
}

impl QueryCoordinator {
    /// Create a coordinator with the default 60 second batch deadline
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self {
            executor,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    pub fn batch_timeout(&self) -> Duration {
        self.batch_timeout
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    /// Execute a batch under a fresh deadline
    pub async fn execute(&self, queries: Vec<DataQuery>) -> BatchResponse {
        self.execute_within(None, queries).await
    }

    /// Execute a batch under the caller's deadline, tightened to the batch timeout
    ///
    /// Returns no later than the derived deadline plus scheduling overhead,
    /// however many queries are still outstanding.
    pub async fn execute_within(
        &self,
        parent_deadline: Option<Instant>,
        queries: Vec<DataQuery>,
    ) -> BatchResponse {
        let start = Instant::now();
        let mut deadline = start + self.batch_timeout;
        if let Some(parent) = parent_deadline {
            deadline = deadline.min(parent);
        }
        let budget = deadline.saturating_duration_since(start);

        let shared = Arc::new(Mutex::new(SharedResponses::default()));
        let mut seen = HashSet::with_capacity(queries.len());
        let mut tasks: Vec<(String, JoinHandle<()>)> = Vec::with_capacity(queries.len());

        log::debug!("Dispatching batch of {} queries", queries.len());
        for query in queries {
            if !seen.insert(query.ref_id.clone()) {
                log::warn!("Duplicate query id {} in batch; last result wins", query.ref_id);
            }
            let ref_id = query.ref_id.clone();
            let executor = Arc::clone(&self.executor);
            let shared = Arc::clone(&shared);

            let handle = tokio::spawn(async move {
                let result = match timeout_at(deadline, executor.run(&query)).await {
                    Ok(result) => result,
                    Err(_) => {
                        log::warn!("Query {} hit the batch deadline, dropping", query.ref_id);
                        return;
                    }
                };
                if Instant::now() >= deadline {
                    log::warn!("Query {} finished past the batch deadline, dropping", query.ref_id);
                    return;
                }
                shared.lock().publish(query.ref_id, result);
            });
            tasks.push((ref_id, handle));
        }

        let joined = timeout_at(deadline, async {
            for (ref_id, handle) in tasks.iter_mut() {
                if let Err(e) = handle.await {
                    log::error!("Query task {} failed: {}", ref_id, e);
                    shared
                        .lock()
                        .publish(ref_id.clone(), Err(QueryError::TaskFailed(e.to_string())));
                }
            }
        })
        .await;

        if joined.is_err() {
            log::warn!("Batch deadline of {:?} reached, abandoning outstanding queries", budget);
            for (_, handle) in &tasks {
                handle.abort();
            }
        }

        let results = shared.lock().close();
        let mut dispatched = Vec::with_capacity(seen.len());
        for (ref_id, _) in tasks {
            if !dispatched.contains(&ref_id) {
                dispatched.push(ref_id);
            }
        }
        BatchResponse::new(dispatched, results, budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{Gate, MemoryFixture, MemoryWarehouse};

    fn coordinator(warehouse: MemoryWarehouse) -> QueryCoordinator {
        QueryCoordinator::new(Arc::new(QueryExecutor::new(Arc::new(warehouse))))
    }

    fn query(ref_id: &str, sql: &str) -> DataQuery {
        DataQuery::new(
            ref_id,
            serde_json::json!({"project": "p", "rawSql": sql}).to_string(),
        )
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let response = coordinator(MemoryWarehouse::new()).execute(Vec::new()).await;
        assert!(response.is_empty());
        assert!(response.timed_out().is_empty());
    }

    #[tokio::test]
    async fn test_default_timeout_is_sixty_seconds() {
        let coordinator = coordinator(MemoryWarehouse::new());
        assert_eq!(coordinator.batch_timeout(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_deadline_tightens_batch_deadline() {
        let warehouse =
            MemoryWarehouse::new().with_fixture(MemoryFixture::new("SELECT slow").delay(Duration::from_secs(10)));
        let coordinator = coordinator(warehouse);

        let start = Instant::now();
        let response = coordinator
            .execute_within(
                Some(start + Duration::from_secs(5)),
                vec![query("A", "SELECT slow")],
            )
            .await;

        assert!(response.is_empty());
        assert_eq!(response.timed_out(), &["A".to_string()]);
        assert_eq!(response.budget(), Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gated_query_times_out_and_is_dropped() {
        let gate = Gate::new();
        let warehouse = MemoryWarehouse::new()
            .with_gate("SELECT held", gate.clone())
            .with_rows("SELECT quick", vec![]);
        let coordinator = coordinator(warehouse).with_batch_timeout(Duration::from_secs(2));

        let response = coordinator
            .execute(vec![query("held", "SELECT held"), query("quick", "SELECT quick")])
            .await;

        assert!(response.contains("quick"));
        assert!(!response.contains("held"));
        assert_eq!(response.timed_out(), &["held".to_string()]);

        // Opening the gate later cannot change the returned snapshot
        gate.open();
        tokio::task::yield_now().await;
        assert_eq!(response.len(), 1);
    }

    #[test]
    fn test_late_publish_is_discarded() {
        let mut shared = SharedResponses::default();
        shared.publish("A".to_string(), Ok(TimeSeries::new()));
        let results = shared.close();
        shared.publish("B".to_string(), Ok(TimeSeries::new()));

        assert_eq!(results.len(), 1);
        assert!(shared.results.is_empty());
    }
}

//! Batch fixture for coordinator-level tests

use bqsource::warehouse::{MemoryWarehouse, Warehouse, WarehouseRow};
use bqsource::{BatchResponse, DataQuery, QueryCoordinator, QueryExecutor};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Coordinator over a scripted in-memory warehouse
pub struct BatchFixture {
    warehouse: Arc<MemoryWarehouse>,
    coordinator: Arc<QueryCoordinator>,
}

impl BatchFixture {
    /// Create a fixture with the default 60 second deadline
    pub fn new(warehouse: MemoryWarehouse) -> Self {
        super::init_test_logging();
        let warehouse = Arc::new(warehouse);
        let executor = Arc::new(QueryExecutor::new(warehouse.clone() as Arc<dyn Warehouse>));
        Self {
            warehouse,
            coordinator: Arc::new(QueryCoordinator::new(executor)),
        }
    }

    /// Create a fixture with a custom deadline
    pub fn with_timeout(warehouse: MemoryWarehouse, timeout: Duration) -> Self {
        super::init_test_logging();
        let warehouse = Arc::new(warehouse);
        let executor = Arc::new(QueryExecutor::new(warehouse.clone() as Arc<dyn Warehouse>));
        Self {
            warehouse,
            coordinator: Arc::new(QueryCoordinator::new(executor).with_batch_timeout(timeout)),
        }
    }

    pub fn warehouse(&self) -> &MemoryWarehouse {
        &self.warehouse
    }

    pub fn coordinator(&self) -> Arc<QueryCoordinator> {
        self.coordinator.clone()
    }

    pub async fn run(&self, queries: Vec<DataQuery>) -> BatchResponse {
        self.coordinator.execute(queries).await
    }
}

/// Query payload for `sql` in project `test-project`
pub fn query(ref_id: &str, sql: &str) -> DataQuery {
    query_in(ref_id, "test-project", sql)
}

pub fn query_in(ref_id: &str, project: &str, sql: &str) -> DataQuery {
    DataQuery::new(
        ref_id,
        serde_json::json!({
            "refId": ref_id,
            "format": "time_series",
            "project": project,
            "rawSql": sql,
        })
        .to_string(),
    )
}

/// Row at `secs` past the epoch
pub fn row(secs: i64, metric: f64) -> WarehouseRow {
    WarehouseRow {
        time: Utc.timestamp_opt(secs, 0).unwrap(),
        metric,
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! BigQuery data source entry points

use super::error::DatasourceError;
use super::instance::InstanceManager;
use super::types::{CheckHealthResult, HealthStatus, PluginContext, QueryDataRequest, QueryDataResponse};
use tokio::time::Instant;

/// Message returned by every health check
pub const HEALTH_OK_MESSAGE: &str = "Data source is working";

/// The data source the host talks to
///
/// Holds one instance per configured data source. A call resolves its
/// instance from the request's context, then hands the batch to that
/// instance's coordinator.
pub struct BigQueryDatasource {
    instances: InstanceManager,
}

impl BigQueryDatasource {
    pub fn new() -> Self {
        Self::with_instance_manager(InstanceManager::new())
    }

    pub fn with_instance_manager(instances: InstanceManager) -> Self {
        Self { instances }
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    /// Run a batch of queries
    ///
    /// Only instance resolution can fail the call. Query failures and
    /// timeouts are reported per query in the response.
    pub async fn query_data(
        &self,
        request: QueryDataRequest,
    ) -> Result<QueryDataResponse, DatasourceError> {
        self.query_data_within(None, request).await
    }

    /// Run a batch of queries, finishing no later than `deadline`
    pub async fn query_data_within(
        &self,
        deadline: Option<Instant>,
        request: QueryDataRequest,
    ) -> Result<QueryDataResponse, DatasourceError> {
        let settings = request
            .plugin_context
            .datasource_instance_settings
            .as_ref()
            .ok_or(DatasourceError::MissingInstanceSettings)?;
        let instance = self.instances.get(settings)?;

        log::debug!(
            "Data source {}: running batch of {} queries",
            instance.uid(),
            request.queries.len()
        );
        let batch = instance
            .coordinator()
            .execute_within(deadline, request.queries)
            .await;
        if !batch.timed_out().is_empty() {
            log::warn!(
                "Data source {}: {} queries timed out",
                instance.uid(),
                batch.timed_out().len()
            );
        }

        Ok(QueryDataResponse::from_batch(batch, instance.reports_timeouts()))
    }

    /// Report health
    ///
    /// Always succeeds without contacting the warehouse.
    pub async fn check_health(&self, _context: &PluginContext) -> CheckHealthResult {
        CheckHealthResult {
            status: HealthStatus::Ok,
            message: HEALTH_OK_MESSAGE.to_string(),
        }
    }
}

impl Default for BigQueryDatasource {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BigQueryDatasource {
    fn drop(&mut self) {
        self.instances.dispose_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::DataSourceInstanceSettings;
    use crate::exec::DataQuery;
    use crate::warehouse::{MemoryWarehouse, Warehouse};
    use serde_json::json;
    use std::sync::Arc;

    fn datasource(warehouse: Arc<MemoryWarehouse>) -> BigQueryDatasource {
        BigQueryDatasource::with_instance_manager(InstanceManager::with_factory(move |_| {
            Ok(warehouse.clone() as Arc<dyn Warehouse>)
        }))
    }

    #[tokio::test]
    async fn test_missing_instance_settings() {
        let datasource = datasource(Arc::new(MemoryWarehouse::new()));
        let request = QueryDataRequest::new(PluginContext::default(), Vec::new());

        let err = datasource.query_data(request).await.unwrap_err();
        assert!(matches!(err, DatasourceError::MissingInstanceSettings));
    }

    #[tokio::test]
    async fn test_health_is_always_ok() {
        let datasource = datasource(Arc::new(MemoryWarehouse::new()));
        let result = datasource.check_health(&PluginContext::default()).await;

        assert_eq!(result.status, HealthStatus::Ok);
        assert_eq!(result.message, "Data source is working");
    }

    #[tokio::test]
    async fn test_failed_query_does_not_fail_the_call() {
        let warehouse = Arc::new(MemoryWarehouse::new().with_rows("SELECT ok", vec![]));
        let datasource = datasource(warehouse);
        let context = PluginContext::for_instance(DataSourceInstanceSettings::new("ds", json!({})));

        let request = QueryDataRequest::new(
            context,
            vec![
                DataQuery::new("A", r#"{"project": "p", "rawSql": "SELECT ok"}"#),
                DataQuery::new("B", "not json"),
            ],
        );
        let response = datasource.query_data(request).await.unwrap();

        assert!(!response.get("A").unwrap().is_error());
        assert!(response.get("B").unwrap().is_error());
    }

    #[test]
    fn test_drop_disposes_instances() {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let datasource = datasource(warehouse.clone());
        datasource
            .instances()
            .get(&DataSourceInstanceSettings::new("ds", json!({})))
            .unwrap();

        drop(datasource);
        assert_eq!(warehouse.disposals(), 1);
    }
}

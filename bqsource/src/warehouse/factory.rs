// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Warehouse factory
//!
//! Builds the warehouse backend named by a data-source configuration. The
//! result is shared by every query the data-source instance runs.

use super::memory::MemoryWarehouse;
use super::traits::Warehouse;
use super::types::{WarehouseResult, WarehouseType};
use crate::config::DatasourceSettings;
use std::sync::Arc;

/// Factory function to create a warehouse based on configuration
///
/// # Examples
/// ```ignore
/// use bqsource::warehouse::create_warehouse;
///
/// let warehouse = create_warehouse(&settings)?;
/// let session = warehouse.connect("my-project").await?;
/// ```
pub fn create_warehouse(settings: &DatasourceSettings) -> WarehouseResult<Arc<dyn Warehouse>> {
    match settings.warehouse {
        #[cfg(feature = "bigquery")]
        WarehouseType::BigQuery => {
            use super::bigquery::BigQueryWarehouse;
            let warehouse = BigQueryWarehouse::new(settings.bigquery.clone())?;
            Ok(Arc::new(warehouse) as Arc<dyn Warehouse>)
        }
        #[cfg(not(feature = "bigquery"))]
        WarehouseType::BigQuery => Err(super::types::WarehouseError::Configuration(
            "BigQuery backend not compiled in (enable the `bigquery` feature)".to_string(),
        )),
        WarehouseType::Memory => {
            let warehouse = MemoryWarehouse::from_fixtures(settings.memory.fixtures.clone());
            Ok(Arc::new(warehouse) as Arc<dyn Warehouse>)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::MemoryFixture;

    #[test]
    fn test_create_memory_warehouse() {
        let mut settings = DatasourceSettings::default();
        settings.warehouse = WarehouseType::Memory;
        settings.memory.fixtures.push(MemoryFixture::new("SELECT 1"));

        let warehouse = create_warehouse(&settings).unwrap();
        assert_eq!(warehouse.warehouse_type(), WarehouseType::Memory);
    }

    #[cfg(feature = "bigquery")]
    #[test]
    fn test_create_bigquery_warehouse() {
        let warehouse = create_warehouse(&DatasourceSettings::default()).unwrap();
        assert_eq!(warehouse.warehouse_type(), WarehouseType::BigQuery);
    }
}

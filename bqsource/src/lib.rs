// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! bqsource - BigQuery time-series data source
//!
//! bqsource lets a visualization host run a batch of analytical queries
//! against BigQuery and get back tabular time-series results, one per panel.
//!
//! # Features
//!
//! - **Concurrent Fan-Out**: Every query in a batch runs as its own task under
//!   one shared deadline
//! - **Per-Query Outcomes**: Failures and timeouts are reported per query and
//!   never abort the rest of the batch
//! - **Pluggable Warehouses**: BigQuery over REST, or a scripted in-memory
//!   warehouse for tests and local runs
//! - **Host Integration**: Instance management keyed by data-source settings,
//!   health checks, and a host-friendly response shape
//!
//! # Usage
//!
//! ```no_run
//! use bqsource::{DataQuery, QueryCoordinator, QueryExecutor};
//! use bqsource::warehouse::MemoryWarehouse;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let warehouse = Arc::new(MemoryWarehouse::new());
//! let executor = Arc::new(QueryExecutor::new(warehouse));
//! let coordinator = QueryCoordinator::new(executor);
//!
//! let query = DataQuery::new("A", r#"{"rawSql": "SELECT 1", "project": "p"}"#);
//! let response = coordinator.execute(vec![query]).await;
//! println!("{} completed", response.len());
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod datasource;
pub mod exec;
pub mod warehouse;

pub use config::{ConfigError, DatasourceSettings};
pub use coordinator::{BatchResponse, QueryCoordinator, QueryOutcome, DEFAULT_BATCH_TIMEOUT};
pub use datasource::{
    BigQueryDatasource, DataResponse, DataSourceInstanceSettings, DatasourceError, InstanceManager,
    PluginContext, QueryDataRequest, QueryDataResponse,
};
pub use exec::{DataQuery, QueryError, QueryExecutor, QueryModel, QueryState, TimeSeries};

/// bqsource version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// bqsource crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

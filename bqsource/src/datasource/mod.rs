// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Host integration
//!
//! Everything the visualization host calls: batch queries, health checks and
//! the per-instance lifecycle behind them.

pub mod error;
pub mod instance;
pub mod service;
pub mod types;

pub use error::DatasourceError;
pub use instance::{DatasourceInstance, InstanceManager, WarehouseFactory};
pub use service::{BigQueryDatasource, HEALTH_OK_MESSAGE};
pub use types::{
    CheckHealthResult, DataResponse, DataSourceInstanceSettings, HealthStatus, PluginContext,
    QueryDataRequest, QueryDataResponse,
};

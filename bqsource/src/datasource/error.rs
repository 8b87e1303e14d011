// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-source errors

use crate::config::ConfigError;
use crate::warehouse::WarehouseError;
use thiserror::Error;

/// Errors that fail a whole host call, as opposed to a single query
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("request carries no data source instance settings")]
    MissingInstanceSettings,

    #[error("invalid data source settings: {0}")]
    Settings(#[from] ConfigError),

    #[error("couldn't create warehouse: {0}")]
    Warehouse(#[from] WarehouseError),
}

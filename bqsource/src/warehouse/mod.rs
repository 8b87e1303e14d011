// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Warehouse client seam
//!
//! Trait-based abstraction over the managed query service, so the executor
//! never depends on a concrete client library.
//!
//! # Architecture
//!
//! ```text
//! QueryExecutor
//!     ↓
//! Warehouse → WarehouseSession → WarehouseJob → RowReader
//!     ↓
//! Concrete Implementations (BigQuery REST, Memory)
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! let warehouse = create_warehouse(&settings)?;
//! let session = warehouse.connect("my-project").await?;
//! let mut job = session.submit(&JobRequest::new(sql).with_location(location)).await?;
//! let status = job.wait().await?;
//! let mut reader = job.read().await?;
//! while let Some(row) = reader.next_row().await? {
//!     // ...
//! }
//! session.close().await?;
//! ```

#[cfg(feature = "bigquery")]
pub mod bigquery;
pub mod factory;
pub mod memory;
pub mod traits;
pub mod types;

#[cfg(feature = "bigquery")]
pub use bigquery::BigQueryWarehouse;
pub use factory::create_warehouse;
pub use memory::{Gate, MemoryFixture, MemoryWarehouse, Submission};
pub use traits::{RowReader, Warehouse, WarehouseJob, WarehouseSession};
pub use types::{
    JobFailure, JobRequest, JobStatus, WarehouseError, WarehouseResult, WarehouseRow,
    WarehouseType,
};

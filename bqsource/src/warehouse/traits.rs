// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Warehouse client traits
//!
//! These traits are the only way the executor talks to a warehouse. Every
//! call may suspend on network I/O; dropping the returned future abandons
//! the call, which is how the shared batch deadline cancels in-flight work.

use super::types::{JobRequest, JobStatus, WarehouseResult, WarehouseRow, WarehouseType};
use async_trait::async_trait;

/// A configured warehouse service
///
/// One instance is built per data-source configuration and shared by every
/// query of every batch. Implementations must not keep per-query state here;
/// that belongs in the session returned by [`Warehouse::connect`].
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Backend kind, for logging and diagnostics
    fn warehouse_type(&self) -> WarehouseType;

    /// Open a session scoped to one project
    async fn connect(&self, project: &str) -> WarehouseResult<Box<dyn WarehouseSession>>;

    /// Release backend resources when the owning data-source instance is replaced
    fn dispose(&self) {}
}

/// A session against one project, owned by exactly one query
#[async_trait]
pub trait WarehouseSession: Send + Sync {
    /// Project this session is scoped to
    fn project(&self) -> &str;

    /// Submit a query job
    async fn submit(&self, request: &JobRequest) -> WarehouseResult<Box<dyn WarehouseJob>>;

    /// Close the session
    ///
    /// Implementations must also release their resources on drop, since a
    /// cancelled query never reaches this call.
    async fn close(self: Box<Self>) -> WarehouseResult<()>;
}

/// A submitted job
#[async_trait]
pub trait WarehouseJob: Send + Sync {
    fn id(&self) -> &str;

    /// Block until the job reaches a terminal state
    ///
    /// A job that ran and failed is `Ok` with [`JobStatus::error`] set; `Err`
    /// means the wait itself failed.
    async fn wait(&mut self) -> WarehouseResult<JobStatus>;

    /// Open a reader over the job's result rows
    async fn read(&mut self) -> WarehouseResult<Box<dyn RowReader>>;
}

/// Paginated row reader
#[async_trait]
pub trait RowReader: Send {
    /// Next row in warehouse order, or `None` once the rows are exhausted
    async fn next_row(&mut self) -> WarehouseResult<Option<WarehouseRow>>;
}

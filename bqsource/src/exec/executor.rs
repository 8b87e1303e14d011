// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Single-query executor
//!
//! Runs one query end to end: parse the payload, open a warehouse session for
//! the query's project, submit the SQL, wait for the job, and read the rows
//! into a [`TimeSeries`]. Nothing is retried.

use super::error::QueryError;
use super::request::{DataQuery, QueryModel};
use super::result::TimeSeries;
use super::state::QueryState;
use crate::warehouse::{JobRequest, Warehouse, WarehouseSession};
use std::sync::Arc;

/// Executes single queries against a warehouse
///
/// The warehouse is injected by the owner; the executor keeps no state
/// between calls, so one executor is shared by every task of a batch.
pub struct QueryExecutor {
    warehouse: Arc<dyn Warehouse>,
}

impl QueryExecutor {
    pub fn new(warehouse: Arc<dyn Warehouse>) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    /// Run one query from the host
    ///
    /// A malformed payload fails before any warehouse call is made.
    pub async fn run(&self, query: &DataQuery) -> Result<TimeSeries, QueryError> {
        let ref_id = query.ref_id.as_str();
        log::debug!("Query {}: {}", ref_id, QueryState::Received);

        let result = match query.parse_model() {
            Ok(model) => self.run_model(ref_id, &model).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(series) => log::debug!(
                "Query {}: {} with {} rows",
                ref_id,
                QueryState::Succeeded,
                series.len()
            ),
            Err(e) => log::error!(
                "Error running query {} ({}): {}",
                ref_id,
                e.terminal_state(),
                e
            ),
        }
        result
    }

    /// Run an already-parsed query
    ///
    /// The session is closed on every path out, success or failure.
    pub async fn run_model(
        &self,
        ref_id: &str,
        model: &QueryModel,
    ) -> Result<TimeSeries, QueryError> {
        log::debug!("Query {}: {}", ref_id, QueryState::Parsed);
        if model.format.trim().is_empty() {
            log::warn!("Query {}: format is empty, defaulting to time series", ref_id);
        } else if model.known_format().is_none() {
            log::warn!(
                "Query {}: unknown format {:?}, defaulting to time series",
                ref_id,
                model.format
            );
        }

        let session = self
            .warehouse
            .connect(&model.project)
            .await
            .map_err(QueryError::Connection)?;

        let result = Self::run_in_session(ref_id, session.as_ref(), model).await;

        if let Err(e) = session.close().await {
            log::warn!(
                "Failed to close warehouse session for project {}: {}",
                model.project,
                e
            );
        }
        result
    }

    async fn run_in_session(
        ref_id: &str,
        session: &dyn WarehouseSession,
        model: &QueryModel,
    ) -> Result<TimeSeries, QueryError> {
        let request = JobRequest::new(model.raw_sql.as_str()).with_location(model.location.clone());

        let mut job = session
            .submit(&request)
            .await
            .map_err(QueryError::Submission)?;
        log::debug!("Query {}: {} as job {}", ref_id, QueryState::Submitted, job.id());

        log::debug!("Query {}: {}", ref_id, QueryState::Polling);
        let status = job.wait().await.map_err(QueryError::Wait)?;
        if let Some(failure) = status.error {
            return Err(QueryError::Job(failure));
        }

        let mut reader = job.read().await.map_err(|source| QueryError::Read {
            context: "reading job",
            source,
        })?;

        let mut series = TimeSeries::new().with_format(model.format());
        while let Some(row) = reader.next_row().await.map_err(|source| QueryError::Read {
            context: "iterating rows in job",
            source,
        })? {
            log::trace!("Query {}: row {:?}", ref_id, row);
            series.push(row.time, row.metric);
        }

        Ok(series)
    }
}

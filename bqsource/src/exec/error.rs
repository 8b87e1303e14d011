// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query error types

use super::state::QueryState;
use crate::warehouse::{JobFailure, WarehouseError};
use thiserror::Error;

/// Errors for a single query
///
/// Each variant marks the stage that failed. The coordinator treats them all
/// alike: the error is stored in the query's slot and the batch goes on.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Configuration payload could not be parsed or validated
    #[error("invalid query payload: {0}")]
    Parse(String),

    #[error("couldn't create BigQuery client: {0}")]
    Connection(#[source] WarehouseError),

    /// Query rejected at submission
    #[error("submitting query: {0}")]
    Submission(#[source] WarehouseError),

    /// Polling failed before the job reached a terminal state
    #[error("waiting for query: {0}")]
    Wait(#[source] WarehouseError),

    /// Job ran and the warehouse reported a failure (e.g. bad SQL)
    #[error("query returned error: {0}")]
    Job(#[source] JobFailure),

    #[error("{context}: {source}")]
    Read {
        context: &'static str,
        #[source]
        source: WarehouseError,
    },

    /// The query's task panicked or was aborted
    #[error("query task failed: {0}")]
    TaskFailed(String),
}

impl QueryError {
    /// Terminal state this error leaves the query in
    pub fn terminal_state(&self) -> QueryState {
        match self {
            QueryError::Parse(_) => QueryState::ParseFailed,
            QueryError::Connection(_) => QueryState::ConnectFailed,
            QueryError::Submission(_) => QueryState::SubmitFailed,
            QueryError::Wait(_) => QueryState::WaitFailed,
            QueryError::Job(_) => QueryState::JobFailed,
            QueryError::Read { .. } => QueryState::ReadFailed,
            QueryError::TaskFailed(_) => QueryState::TaskFailed,
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        QueryError::Parse(error.to_string())
    }
}

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Batch responses

use crate::exec::{QueryError, TimeSeries};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one query in a batch
#[derive(Debug)]
pub enum QueryOutcome<'a> {
    Success(&'a TimeSeries),
    Failure(&'a QueryError),
    /// Still running when the batch deadline fired; its result was discarded
    TimedOut,
}

impl QueryOutcome<'_> {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }
}

/// Results of one batch, keyed by query identifier
///
/// Only queries that finished before the deadline have an entry. Queries cut
/// off by the deadline have none, and are listed in [`BatchResponse::timed_out`].
#[derive(Debug, Default)]
pub struct BatchResponse {
    responses: HashMap<String, Result<TimeSeries, QueryError>>,
    timed_out: Vec<String>,
    /// Time the batch was given, after tightening to any caller deadline
    budget: Duration,
}

impl BatchResponse {
    /// Build from the dispatched identifiers and the entries published in time
    pub(crate) fn new(
        dispatched: Vec<String>,
        responses: HashMap<String, Result<TimeSeries, QueryError>>,
        budget: Duration,
    ) -> Self {
        let timed_out = dispatched
            .into_iter()
            .filter(|ref_id| !responses.contains_key(ref_id))
            .collect();
        Self {
            responses,
            timed_out,
            budget,
        }
    }

    /// Effective deadline the batch ran under, measured from dispatch
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Number of entries (completed queries)
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        self.responses.contains_key(ref_id)
    }

    pub fn get(&self, ref_id: &str) -> Option<&Result<TimeSeries, QueryError>> {
        self.responses.get(ref_id)
    }

    /// Tagged outcome for a dispatched query; `None` if the id was never in the batch
    pub fn outcome(&self, ref_id: &str) -> Option<QueryOutcome<'_>> {
        match self.responses.get(ref_id) {
            Some(Ok(series)) => Some(QueryOutcome::Success(series)),
            Some(Err(error)) => Some(QueryOutcome::Failure(error)),
            None if self.timed_out.iter().any(|id| id == ref_id) => Some(QueryOutcome::TimedOut),
            None => None,
        }
    }

    /// Identifiers whose queries were cut off by the deadline, in dispatch order
    pub fn timed_out(&self) -> &[String] {
        &self.timed_out
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Result<TimeSeries, QueryError>)> {
        self.responses.iter()
    }

    pub fn into_parts(self) -> (HashMap<String, Result<TimeSeries, QueryError>>, Vec<String>) {
        (self.responses, self.timed_out)
    }
}

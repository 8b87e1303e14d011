// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query Coordinator - batch orchestration
//!
//! The QueryCoordinator fans a batch of queries out to the executor and
//! assembles their results into one [`BatchResponse`].

pub mod batch;
pub mod query_coordinator;

pub use batch::{BatchResponse, QueryOutcome};
pub use query_coordinator::{QueryCoordinator, DEFAULT_BATCH_TIMEOUT};

// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-query execution states
//!
//! ```text
//! Received → Parsed → Submitted → Polling → Succeeded
//!     ↓          ↓         ↓          ↓
//! ParseFailed  ConnectFailed / SubmitFailed / WaitFailed / JobFailed / ReadFailed
//! ```
//!
//! There is no retry loop: no state is entered twice for one query.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryState {
    Received,
    Parsed,
    Submitted,
    Polling,
    Succeeded,
    ParseFailed,
    ConnectFailed,
    SubmitFailed,
    WaitFailed,
    JobFailed,
    ReadFailed,
    TaskFailed,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            QueryState::Received | QueryState::Parsed | QueryState::Submitted | QueryState::Polling
        )
    }

    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != QueryState::Succeeded
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Received => "received",
            QueryState::Parsed => "parsed",
            QueryState::Submitted => "submitted",
            QueryState::Polling => "polling",
            QueryState::Succeeded => "succeeded",
            QueryState::ParseFailed => "parse failed",
            QueryState::ConnectFailed => "connect failed",
            QueryState::SubmitFailed => "submit failed",
            QueryState::WaitFailed => "wait failed",
            QueryState::JobFailed => "job failed",
            QueryState::ReadFailed => "read failed",
            QueryState::TaskFailed => "task failed",
        };
        write!(f, "{}", name)
    }
}

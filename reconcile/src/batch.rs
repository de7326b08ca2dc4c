//! Batch reconciliation summary.

use std::fmt;

use reckon_types::{Email, EventId};
use serde::{Deserialize, Serialize};

use crate::ReconcileSummary;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub email: Email,
    pub error: String,
}

/// Aggregate outcome of reconciling every registrant of an event.
///
/// `reconciled + failed == total` always holds: each subject is counted
/// exactly once, as either a success or a failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub event: EventId,
    pub total: u64,
    pub reconciled: u64,
    pub failed: u64,
    /// Subjects whose pass detected at least one conflict.
    pub conflicts: u64,
    pub requires_review: u64,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn new(event: EventId) -> Self {
        Self {
            event,
            total: 0,
            reconciled: 0,
            failed: 0,
            conflicts: 0,
            requires_review: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_success(&mut self, summary: &ReconcileSummary) {
        self.total += 1;
        self.reconciled += 1;
        if summary.conflict_count > 0 {
            self.conflicts += 1;
        }
        if summary.requires_manual_review {
            self.requires_review += 1;
        }
    }

    pub fn record_failure(&mut self, email: Email, error: &dyn fmt::Display) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(BatchFailure {
            email,
            error: error.to_string(),
        });
    }
}

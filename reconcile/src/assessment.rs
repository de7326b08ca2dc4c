//! The pure part of a reconciliation pass: detect, resolve, score, flag.

use reckon_store::{Conflict, RecordFlags};
use reckon_types::{Signal, Timestamp, TrustPolicy};

use crate::{ConfidenceScorer, ConflictDetector, FlagEvaluator, Resolution, StatusResolver};

/// Everything a pass derives from one signal set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assessment {
    pub conflicts: Vec<Conflict>,
    pub resolution: Resolution,
    pub confidence: u8,
    pub flags: RecordFlags,
    pub active_signal_count: usize,
}

/// Runs conflict detection, resolution, scoring and flag evaluation in order.
pub struct Assessor<'a> {
    policy: &'a TrustPolicy,
}

impl<'a> Assessor<'a> {
    pub fn new(policy: &'a TrustPolicy) -> Self {
        Self { policy }
    }

    /// Assess the active members of `signals`. Inactive signals are ignored.
    pub fn assess(&self, signals: &[Signal], now: Timestamp) -> Assessment {
        let active_signal_count = signals.iter().filter(|s| s.is_active).count();
        let conflicts = ConflictDetector::new(self.policy).detect(signals, now);
        let resolution = StatusResolver.resolve(signals);
        let confidence =
            ConfidenceScorer::new(self.policy).score(signals, conflicts.len(), resolution.status);
        let flags = FlagEvaluator::new(self.policy).evaluate(
            &resolution,
            conflicts.len(),
            confidence,
            active_signal_count,
        );

        Assessment {
            conflicts,
            resolution,
            confidence,
            flags,
            active_signal_count,
        }
    }
}

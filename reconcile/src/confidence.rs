//! Confidence scoring.
//!
//! `score = avg_trust + consistency_bonus - conflict_penalty - suspicious_penalty`,
//! clamped to 0..=100. An empty active set has zero average trust.

use reckon_types::{CanonicalStatus, Signal, TrustPolicy};

pub struct ConfidenceScorer<'a> {
    policy: &'a TrustPolicy,
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(policy: &'a TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn score(&self, signals: &[Signal], conflict_count: usize, status: CanonicalStatus) -> u8 {
        let avg = average_trust(signals);
        let bonus = if conflict_count == 0 {
            i64::from(self.policy.consistency_bonus)
        } else {
            0
        };
        let conflict_penalty =
            i64::from(self.policy.conflict_penalty).saturating_mul(conflict_count as i64);
        let suspicious_penalty = if status == CanonicalStatus::Invalidated {
            i64::from(self.policy.suspicious_penalty)
        } else {
            0
        };

        let raw = avg + bonus - conflict_penalty - suspicious_penalty;
        raw.clamp(0, 100) as u8
    }
}

/// Integer mean (floor) of active trust scores; 0 for no active signals.
pub fn average_trust(signals: &[Signal]) -> i64 {
    let (sum, count) = signals
        .iter()
        .filter(|s| s.is_active)
        .fold((0i64, 0i64), |(sum, count), s| {
            (sum + i64::from(s.trust_score), count + 1)
        });
    if count == 0 {
        0
    } else {
        sum / count
    }
}

//! Flag evaluation: review, suspicion and verification flags.

use reckon_store::RecordFlags;
use reckon_types::TrustPolicy;

use crate::Resolution;

pub struct FlagEvaluator<'a> {
    policy: &'a TrustPolicy,
}

impl<'a> FlagEvaluator<'a> {
    pub fn new(policy: &'a TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn evaluate(
        &self,
        resolution: &Resolution,
        conflict_count: usize,
        confidence: u8,
        active_signal_count: usize,
    ) -> RecordFlags {
        let has_conflicts = conflict_count > 0;
        RecordFlags {
            has_conflicts,
            requires_manual_review: has_conflicts || confidence < self.policy.review_threshold,
            is_suspicious: (resolution.has_certificate && !resolution.is_present)
                || conflict_count >= self.policy.suspicious_conflict_count,
            is_verified: confidence >= self.policy.verified_threshold
                && !has_conflicts
                && active_signal_count >= self.policy.verified_min_signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::{CanonicalStatus, ResolutionStrategy};

    fn resolution(is_present: bool, has_certificate: bool) -> Resolution {
        Resolution {
            status: CanonicalStatus::RegisteredOnly,
            strategy: ResolutionStrategy::TrustPrecedence,
            is_registered: true,
            is_present,
            has_certificate,
            is_revoked: false,
            notes: String::new(),
        }
    }

    #[test]
    fn low_confidence_requires_review() {
        let policy = TrustPolicy::default();
        let flags = FlagEvaluator::new(&policy).evaluate(&resolution(false, false), 0, 49, 1);
        assert!(flags.requires_manual_review);
        assert!(!flags.has_conflicts);
        let flags = FlagEvaluator::new(&policy).evaluate(&resolution(false, false), 0, 50, 1);
        assert!(!flags.requires_manual_review);
    }

    #[test]
    fn certificate_without_presence_is_suspicious() {
        let policy = TrustPolicy::default();
        let flags = FlagEvaluator::new(&policy).evaluate(&resolution(false, true), 1, 35, 2);
        assert!(flags.is_suspicious);
        assert!(flags.has_conflicts && flags.requires_manual_review);
    }

    #[test]
    fn two_conflicts_are_suspicious_on_their_own() {
        let policy = TrustPolicy::default();
        let flags = FlagEvaluator::new(&policy).evaluate(&resolution(true, false), 2, 70, 2);
        assert!(flags.is_suspicious);
    }

    #[test]
    fn verification_needs_two_signals() {
        let policy = TrustPolicy::default();
        let evaluator = FlagEvaluator::new(&policy);
        assert!(!evaluator.evaluate(&resolution(true, false), 0, 100, 1).is_verified);
        assert!(evaluator.evaluate(&resolution(true, false), 0, 80, 2).is_verified);
        assert!(!evaluator.evaluate(&resolution(true, false), 0, 79, 2).is_verified);
    }
}

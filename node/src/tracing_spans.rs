//! [`tracing::Span`] constructors shared by the scheduler and the node.
//!
//! Consistent span names and field sets make traces easy to filter.

use reckon_types::{EventId, ParticipantKey};
use tracing::{info_span, Span};

/// One automatic pass for a single `(email, event)` pair.
pub fn reconcile_span(key: &ParticipantKey, worker: usize) -> Span {
    info_span!("reconcile", email = %key.email, event = %key.event, worker)
}

/// A whole-event batch fanned out over the worker pool.
pub fn batch_span(event: &EventId) -> Span {
    info_span!("reconcile_event", event = %event)
}

/// A manual override or its release.
pub fn override_span(key: &ParticipantKey, actor: &str) -> Span {
    info_span!("override", email = %key.email, event = %key.event, actor = %actor)
}

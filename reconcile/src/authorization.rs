//! Authorization decision for manual overrides.

use reckon_store::EventRoster;
use reckon_types::{Actor, EventId};

use crate::ReconcileError;

/// Platform admins may override anywhere; the event's owner and team leads
/// may override within that event. Everyone else is denied.
pub fn authorize_override(
    actor: &Actor,
    event: &EventId,
    roster: Option<&EventRoster>,
) -> Result<(), ReconcileError> {
    if actor.is_platform_admin() || roster.is_some_and(|r| r.is_lead(&actor.id)) {
        return Ok(());
    }
    Err(ReconcileError::PermissionDenied {
        actor: actor.id.clone(),
        event: event.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_types::{ActorId, ActorRole};

    fn roster() -> EventRoster {
        EventRoster {
            event: EventId::new("hack").unwrap(),
            owner: ActorId::new("owner"),
            team_leads: vec![ActorId::new("lead")],
            registrants: Vec::new(),
        }
    }

    #[test]
    fn admin_needs_no_roster() {
        let event = EventId::new("hack").unwrap();
        let admin = Actor::new("root", ActorRole::PlatformAdmin);
        assert!(authorize_override(&admin, &event, None).is_ok());
    }

    #[test]
    fn owner_and_lead_are_allowed() {
        let roster = roster();
        for id in ["owner", "lead"] {
            let actor = Actor::new(id, ActorRole::Member);
            assert!(authorize_override(&actor, &roster.event, Some(&roster)).is_ok());
        }
    }

    #[test]
    fn other_members_are_denied() {
        let roster = roster();
        let actor = Actor::new("attendee", ActorRole::Member);
        let err = authorize_override(&actor, &roster.event, Some(&roster)).unwrap_err();
        assert!(matches!(err, ReconcileError::PermissionDenied { .. }));
        assert!(authorize_override(&actor, &roster.event, None).is_err());
    }
}

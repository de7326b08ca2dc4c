//! Event directory trait: who runs an event and who registered for it.

use reckon_types::{ActorId, Email, EventId};
use serde::{Deserialize, Serialize};

use crate::SourceError;

/// Ownership and registrant list of one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRoster {
    pub event: EventId,
    pub owner: ActorId,
    #[serde(default)]
    pub team_leads: Vec<ActorId>,
    #[serde(default)]
    pub registrants: Vec<Email>,
}

impl EventRoster {
    /// Owner or team lead of this event.
    pub fn is_lead(&self, actor: &ActorId) -> bool {
        &self.owner == actor || self.team_leads.contains(actor)
    }
}

pub trait EventDirectory {
    /// Roster for an event, or `None` if the event is unknown.
    fn roster(&self, event: &EventId) -> Result<Option<EventRoster>, SourceError>;
}

//! Actors: the people or services that record signals and perform overrides.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ReckonError;

/// Opaque reference to a user account.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform-wide role of an actor.
///
/// Event-scoped authority (owner, team lead) comes from the event roster,
/// not from this role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    PlatformAdmin,
    Member,
}

impl FromStr for ActorRole {
    type Err = ReckonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "platform_admin" | "admin" => Ok(Self::PlatformAdmin),
            "member" | "user" => Ok(Self::Member),
            _ => Err(ReckonError::UnknownRole(s.to_string())),
        }
    }
}

/// An authenticated caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: ActorId::new(id),
            role,
        }
    }

    pub fn is_platform_admin(&self) -> bool {
        self.role == ActorRole::PlatformAdmin
    }
}

//! Ephemeral attendance scan sessions.
//!
//! A session lets a scanner device record attendance for one event until it
//! expires. Sessions live in a capacity-bounded store with TTL eviction:
//! opening a session when the store is full evicts the one closest to expiry.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use reckon_types::{ActorId, EventId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSession {
    pub token: String,
    pub event: EventId,
    pub opened_by: ActorId,
    pub opened_at: Timestamp,
    pub expires_at: Timestamp,
}

impl ScanSession {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

/// Open scan sessions indexed by token and by expiry.
pub struct ScanSessionStore {
    sessions: HashMap<String, ScanSession>,
    /// `(expires_at, token)` for oldest-first eviction.
    by_expiry: BTreeSet<(Timestamp, String)>,
    ttl_secs: u64,
    capacity: usize,
    /// Mixed into token derivation so tokens never repeat.
    issued: u64,
}

impl ScanSessionStore {
    pub fn new(ttl_secs: u64, capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            by_expiry: BTreeSet::new(),
            ttl_secs,
            capacity: capacity.max(1),
            issued: 0,
        }
    }

    /// Open a session for `event`. Expired sessions are purged first; if the
    /// store is still full, the session closest to expiry is evicted.
    pub fn open(&mut self, event: EventId, opened_by: ActorId, now: Timestamp) -> ScanSession {
        self.evict_expired(now);
        while self.sessions.len() >= self.capacity {
            let Some((_, token)) = self.by_expiry.pop_first() else {
                break;
            };
            if let Some(evicted) = self.sessions.remove(&token) {
                tracing::debug!(event = %evicted.event, "scan session evicted at capacity");
            }
        }

        let token = self.next_token(&event, &opened_by, now);
        let session = ScanSession {
            token: token.clone(),
            event,
            opened_by,
            opened_at: now,
            expires_at: now.plus_secs(self.ttl_secs),
        };
        self.by_expiry.insert((session.expires_at, token.clone()));
        self.sessions.insert(token, session.clone());
        session
    }

    /// The session for `token`, if it exists and has not expired.
    pub fn get(&self, token: &str, now: Timestamp) -> Option<&ScanSession> {
        self.sessions.get(token).filter(|s| !s.is_expired(now))
    }

    pub fn close(&mut self, token: &str) -> Option<ScanSession> {
        let session = self.sessions.remove(token)?;
        self.by_expiry
            .remove(&(session.expires_at, session.token.clone()));
        Some(session)
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn evict_expired(&mut self, now: Timestamp) -> usize {
        let mut removed = 0;
        while let Some((expires_at, _)) = self.by_expiry.first() {
            if *expires_at > now {
                break;
            }
            if let Some((_, token)) = self.by_expiry.pop_first() {
                self.sessions.remove(&token);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn next_token(&mut self, event: &EventId, actor: &ActorId, now: Timestamp) -> String {
        self.issued += 1;
        let mut hasher = DefaultHasher::new();
        (event, actor.as_str(), now, self.issued).hash(&mut hasher);
        format!("scan-{:016x}{:08x}", hasher.finish(), self.issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str) -> EventId {
        EventId::new(name).unwrap()
    }

    fn actor() -> ActorId {
        ActorId::new("scanner-1")
    }

    #[test]
    fn new_store_is_empty() {
        let store = ScanSessionStore::new(60, 10);
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn session_is_visible_until_expiry() {
        let mut store = ScanSessionStore::new(60, 10);
        let session = store.open(event("hack"), actor(), Timestamp::new(1_000));
        assert_eq!(session.expires_at, Timestamp::new(1_060));
        assert!(store.get(&session.token, Timestamp::new(1_059)).is_some());
        assert!(store.get(&session.token, Timestamp::new(1_060)).is_none());
    }

    #[test]
    fn tokens_are_unique() {
        let mut store = ScanSessionStore::new(60, 10);
        let a = store.open(event("hack"), actor(), Timestamp::new(1));
        let b = store.open(event("hack"), actor(), Timestamp::new(1));
        assert_ne!(a.token, b.token);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn close_removes_session() {
        let mut store = ScanSessionStore::new(60, 10);
        let session = store.open(event("hack"), actor(), Timestamp::new(1));
        assert_eq!(store.close(&session.token), Some(session.clone()));
        assert!(store.close(&session.token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn evict_expired_only_drops_expired() {
        let mut store = ScanSessionStore::new(60, 10);
        store.open(event("a"), actor(), Timestamp::new(0));
        store.open(event("b"), actor(), Timestamp::new(30));
        let live = store.open(event("c"), actor(), Timestamp::new(100));

        assert_eq!(store.evict_expired(Timestamp::new(90)), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&live.token, Timestamp::new(90)).is_some());
    }

    #[test]
    fn capacity_evicts_oldest_expiring() {
        let mut store = ScanSessionStore::new(60, 2);
        let first = store.open(event("a"), actor(), Timestamp::new(0));
        let second = store.open(event("b"), actor(), Timestamp::new(10));
        let third = store.open(event("c"), actor(), Timestamp::new(20));

        assert_eq!(store.len(), 2);
        assert!(store.get(&first.token, Timestamp::new(20)).is_none());
        assert!(store.get(&second.token, Timestamp::new(20)).is_some());
        assert!(store.get(&third.token, Timestamp::new(20)).is_some());
    }
}

//! The node end to end: LMDB store, snapshot sources, worker pool.

use std::sync::Arc;

use reckon_node::{NodeConfig, NodeError, ReckonNode, SnapshotSources};
use reckon_reconcile::{ReconcileError, RecordFilter};
use reckon_types::{
    Actor, ActorId, ActorRole, CanonicalStatus, Email, EventId, ParticipantKey,
};

const SNAPSHOT: &str = r#"{
    "rosters": [{ "event": "hack", "owner": "org", "team_leads": ["lead"] }],
    "registrations": [
        { "email": "ada@example.org", "event": "hack",
          "record": { "id": "r1", "valid": true, "created_at": 100 } },
        { "email": "bob@example.org", "event": "hack",
          "record": { "id": "r2", "valid": true, "created_at": 101 } },
        { "email": "cy@example.org", "event": "hack",
          "record": { "id": "r3", "valid": true, "created_at": 102 } }
    ],
    "attendance": [
        { "email": "ada@example.org", "event": "hack",
          "record": { "id": "a1", "valid": true, "marked_by": "volunteer",
                      "scanned_at": 200, "status": "PRESENT" } }
    ],
    "certificates": [
        { "email": "ada@example.org", "event": "hack",
          "record": { "id": "c1", "valid": true, "status": "SENT", "issued_at": 300 } },
        { "email": "bob@example.org", "event": "hack",
          "record": { "id": "c2", "valid": true, "status": "SENT", "issued_at": 301 } }
    ]
}"#;

fn key(email: &str) -> ParticipantKey {
    ParticipantKey::new(Email::parse(email).unwrap(), EventId::new("hack").unwrap())
}

fn event() -> EventId {
    EventId::new("hack").unwrap()
}

fn start(dir: &tempfile::TempDir) -> ReckonNode<SnapshotSources> {
    let config = NodeConfig {
        data_dir: dir.path().join("data"),
        map_size: 16 * 1024 * 1024,
        worker_count: 2,
        enable_metrics: true,
        ..NodeConfig::default()
    };
    let sources = Arc::new(SnapshotSources::from_json_str(SNAPSHOT).unwrap());
    ReckonNode::start(config, sources).unwrap()
}

#[tokio::test]
async fn batch_then_query() {
    let dir = tempfile::tempdir().unwrap();
    let node = start(&dir);

    let batch = node.reconcile_event(&event()).await.unwrap();
    assert_eq!(batch.total, 3);
    assert_eq!(batch.reconciled, 3);
    assert_eq!(batch.conflicts, 1);
    assert_eq!(node.record_count().unwrap(), 3);

    let ada = node.get_status(&key("ada@example.org")).unwrap().unwrap();
    assert_eq!(ada.canonical_status, CanonicalStatus::Certified);
    assert_eq!(ada.confidence_score, 80);
    assert!(ada.flags.is_verified);

    let stats = node.event_stats(&event()).unwrap();
    assert_eq!(stats.count(CanonicalStatus::Certified), 1);
    assert_eq!(stats.count(CanonicalStatus::Invalidated), 1);
    assert_eq!(stats.count(CanonicalStatus::RegisteredOnly), 1);

    let review = node
        .list_records(
            &event(),
            &RecordFilter {
                requires_review: Some(true),
                ..RecordFilter::default()
            },
        )
        .unwrap();
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].email, key("bob@example.org").email);

    let metrics = node.metrics_text().unwrap().unwrap();
    assert!(metrics.contains("reckon_reconciliations_total 3"));

    node.shutdown().await;
}

#[tokio::test]
async fn override_round_trip_persists() {
    let dir = tempfile::tempdir().unwrap();
    let node = start(&dir);
    node.reconcile(key("bob@example.org")).await.unwrap();

    let lead = Actor::new("lead", ActorRole::Member);
    let record = node
        .override_status(&key("bob@example.org"), "CERTIFIED", &lead, "attended, badge lost")
        .unwrap();
    assert_eq!(
        record.manual_override.previous_status,
        Some(CanonicalStatus::Invalidated)
    );

    // Pinned across an automatic pass.
    let summary = node.reconcile(key("bob@example.org")).await.unwrap();
    assert_eq!(summary.canonical_status, CanonicalStatus::Certified);

    let outsider = Actor::new("someone", ActorRole::Member);
    let err = node
        .clear_override(&key("bob@example.org"), &outsider)
        .unwrap_err();
    assert!(matches!(
        err,
        NodeError::Reconcile(ReconcileError::PermissionDenied { .. })
    ));

    let cleared = node.clear_override(&key("bob@example.org"), &lead).unwrap();
    assert_eq!(cleared.canonical_status, CanonicalStatus::Invalidated);

    let metrics = node.metrics_text().unwrap().unwrap();
    assert!(metrics.contains("reckon_overrides_total 2"));
    node.shutdown().await;

    // Reopen the same data directory.
    let node = start(&dir);
    let record = node.get_record(&key("bob@example.org")).unwrap().unwrap();
    assert_eq!(record.version(), 4);
    assert!(!record.manual_override.is_overridden);
    node.shutdown().await;
}

#[tokio::test]
async fn scan_sessions_expire_and_close() {
    let dir = tempfile::tempdir().unwrap();
    let node = start(&dir);

    let session = node.open_scan_session(event(), ActorId::new("scanner-1"));
    assert_eq!(node.scan_session(&session.token), Some(session.clone()));
    assert_eq!(node.evict_expired_sessions(), 0);
    assert_eq!(node.close_scan_session(&session.token), Some(session.clone()));
    assert!(node.scan_session(&session.token).is_none());

    node.shutdown().await;
}

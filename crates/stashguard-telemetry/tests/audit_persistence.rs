use stashguard_core::{AgentId, Badge, Money, StashId};
use stashguard_policy::{Decision, LedgerEntry};
use stashguard_telemetry::{AuditKind, AuditTrail};
use tempfile::tempdir;

fn populated_trail() -> AuditTrail {
    let stash = StashId::from("allowance");
    let kid = AgentId::from("kid");
    let mut trail = AuditTrail::new();

    trail.record_decision(
        &stash,
        &kid,
        &Decision {
            permitted: true,
            evaluations: Vec::new(),
        },
    );
    trail.record_commit(
        &stash,
        &LedgerEntry::transfer(kid.clone(), stash.clone(), StashId::from("shop"), Money::new(25, "USD")),
    );
    trail.record_commit(
        &stash,
        &LedgerEntry::badge_grant(
            stash.clone(),
            Badge::new("parent", AgentId::from("mom"), AgentId::from("dad")),
        ),
    );
    trail
}

#[test]
fn test_trail_survives_a_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.json");

    let trail = populated_trail();
    trail.write_json(&path).unwrap();

    let restored = AuditTrail::read_json(&path).unwrap();
    assert!(restored.verify());
    assert_eq!(restored.events().len(), 3);
    assert_eq!(restored.head(), trail.head());
    assert_eq!(restored.events()[2].kind, AuditKind::Recorded);
    assert_eq!(restored.events()[2].agent.as_ref().unwrap().as_str(), "mom");
}

#[test]
fn test_edited_file_fails_verification() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.json");
    populated_trail().write_json(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("\"permitted\"", "\"denied\"")).unwrap();

    let tampered = AuditTrail::read_json(&path).unwrap();
    assert!(!tampered.verify());
}

#[test]
fn test_dropped_trailing_event_fails_verification() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.json");
    populated_trail().write_json(&path).unwrap();

    let mut json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    json["events"].as_array_mut().unwrap().pop();
    std::fs::write(&path, serde_json::to_string_pretty(&json).unwrap()).unwrap();

    let truncated = AuditTrail::read_json(&path).unwrap();
    assert_eq!(truncated.events().len(), 2);
    assert!(!truncated.verify());
}

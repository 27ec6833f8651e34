use super::*;
use crate::identity::roles::{extend_roles, Role};

fn berta() -> Identity {
    Identity {
        principal_id: Some(2),
        display_name: "Bertå Beispiel".into(),
        roles: extend_roles([Role::Member, Role::Event]),
        ..Identity::anonymous()
    }
}

#[test]
fn issued_session_validates_from_same_ip() {
    let sm = SessionManager::default();
    let s = sm.issue(berta(), "127.0.0.1").unwrap();
    let id = sm.validate(&s.key, "127.0.0.1").expect("valid session");
    assert_eq!(id.principal_id, Some(2));
    assert_eq!(id.provenance, Provenance::Session);
    assert_eq!(id.source_ip.as_deref(), Some("127.0.0.1"));
}

#[test]
fn session_is_ip_bound() {
    let sm = SessionManager::default();
    let s = sm.issue(berta(), "127.0.0.1").unwrap();
    assert!(sm.validate(&s.key, "10.0.0.7").is_none());
    // Still usable from the original address afterwards.
    assert!(sm.validate(&s.key, "127.0.0.1").is_some());
}

#[test]
fn expired_session_is_dropped() {
    let sm = SessionManager::new(Duration::ZERO);
    let s = sm.issue(berta(), "127.0.0.1").unwrap();
    assert!(sm.validate(&s.key, "127.0.0.1").is_none());
    assert_eq!(sm.active_count(), 0);
}

#[test]
fn logout_revokes_key() {
    let sm = SessionManager::default();
    let s = sm.issue(berta(), "127.0.0.1").unwrap();
    assert!(sm.logout(&s.key));
    assert!(!sm.logout(&s.key));
    assert!(sm.validate(&s.key, "127.0.0.1").is_none());
}

#[test]
fn revoke_user_drops_all_sessions() {
    let sm = SessionManager::default();
    let a = sm.issue(berta(), "127.0.0.1").unwrap();
    let b = sm.issue(berta(), "127.0.0.2").unwrap();
    let other = sm.issue(Identity { principal_id: Some(3), ..berta() }, "127.0.0.1").unwrap();
    assert_eq!(sm.revoke_user(2), 2);
    assert!(sm.validate(&a.key, "127.0.0.1").is_none());
    assert!(sm.validate(&b.key, "127.0.0.2").is_none());
    assert!(sm.validate(&other.key, "127.0.0.1").is_some());
}

#[test]
fn empty_key_never_validates() {
    let sm = SessionManager::default();
    assert!(sm.validate("", "127.0.0.1").is_none());
}

#[test]
fn expired_sessions_do_not_accumulate() {
    let sm = SessionManager::new(Duration::ZERO);
    let mut last = None;
    for _ in 0..100 {
        last = Some(sm.issue(berta(), "127.0.0.1").unwrap());
    }
    // Each issue sweeps the ones issued before it.
    assert_eq!(sm.active_count(), 1);
    assert_eq!(sm.user_index.read().get(&2).map(HashSet::len), Some(1));

    // Presenting the expired key drops it from both maps.
    let last = last.unwrap();
    assert!(sm.validate(&last.key, "127.0.0.1").is_none());
    assert_eq!(sm.active_count(), 0);
    assert!(sm.user_index.read().is_empty());
}

#[test]
fn purge_expired_clears_index() {
    let sm = SessionManager::new(Duration::ZERO);
    sm.sessions.write().insert(
        "k".into(),
        Session {
            session_id: "s".into(),
            key: "k".into(),
            identity: berta(),
            ip: "127.0.0.1".into(),
            expires_at: std::time::Instant::now(),
        },
    );
    sm.user_index.write().entry(2).or_default().insert("k".into());
    assert_eq!(sm.purge_expired(), 1);
    assert_eq!(sm.active_count(), 0);
    assert!(sm.user_index.read().is_empty());
    assert_eq!(sm.purge_expired(), 0);
}

#[test]
fn logout_and_revoke_leave_no_residue() {
    let sm = SessionManager::default();
    let a = sm.issue(berta(), "127.0.0.1").unwrap();
    let b = sm.issue(berta(), "127.0.0.1").unwrap();
    let c = sm.issue(berta(), "127.0.0.1").unwrap();
    assert!(sm.logout(&a.key));
    assert_eq!(sm.user_index.read().get(&2).map(HashSet::len), Some(2));
    assert_eq!(sm.revoke_user(2), 2);
    assert_eq!(sm.active_count(), 0);
    assert!(sm.user_index.read().is_empty());
    for s in [a, b, c] {
        assert!(sm.validate(&s.key, "127.0.0.1").is_none());
    }
}

#[test]
fn issued_keys_are_distinct() {
    let sm = SessionManager::default();
    let a = sm.issue(berta(), "127.0.0.1").unwrap();
    let b = sm.issue(berta(), "127.0.0.1").unwrap();
    assert_ne!(a.key, b.key);
    assert_ne!(a.session_id, b.session_id);
    assert_eq!(sm.active_count(), 2);
}

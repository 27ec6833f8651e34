use super::*;
use crate::identity::roles::{extend_roles, Role};
use parking_lot::Mutex;

/// Lookup double recording which strategies were consulted.
#[derive(Default)]
struct Recording {
    token_hit: Option<Identity>,
    session_hit: Option<Identity>,
    calls: Mutex<Vec<&'static str>>,
}

impl CredentialLookup for Recording {
    fn lookup_by_token(&self, _token: &str) -> Identity {
        self.calls.lock().push("token");
        self.token_hit.clone().unwrap_or_default()
    }
    fn lookup_by_session(&self, _key: &str, _ip: &str) -> Identity {
        self.calls.lock().push("session");
        self.session_hit.clone().unwrap_or_default()
    }
}

fn persona(id: i64, roles: &[Role]) -> Identity {
    Identity {
        principal_id: Some(id),
        display_name: format!("persona {id}"),
        roles: extend_roles(roles.iter().copied()),
        ..Identity::anonymous()
    }
}

#[test]
fn token_hit_short_circuits() {
    let lk = Recording { token_hit: Some(persona(7, &[Role::Event])), ..Default::default() };
    let id = resolve(&lk, "memberhub-orga_bot-x", "127.0.0.0");
    assert_eq!(id.provenance, Provenance::ApiToken);
    assert_eq!(*lk.calls.lock(), vec!["token"]);
}

#[test]
fn anonymous_token_result_falls_back_to_session() {
    let lk = Recording { session_hit: Some(persona(2, &[Role::Member])), ..Default::default() };
    let id = resolve(&lk, "some-session-key", "127.0.0.1");
    assert_eq!(id.principal_id, Some(2));
    assert_eq!(id.provenance, Provenance::Session);
    assert_eq!(*lk.calls.lock(), vec!["token", "session"]);
}

#[test]
fn nothing_found_is_anonymous_not_error() {
    let lk = Recording::default();
    let id = resolve(&lk, "", "127.0.0.0");
    assert!(id.is_anonymous());
    assert_eq!(id.provenance, Provenance::None);
    assert_eq!(id.source_ip.as_deref(), Some("127.0.0.0"));
    assert_eq!(*lk.calls.lock(), vec!["token", "session"]);
}

#[test]
fn credential_service_resolves_both_kinds() {
    let svc = CredentialService::new(Arc::new(SessionManager::default()), Arc::new(TokenRegistry::new()));
    let token = svc.tokens.issue("quick_export", [Role::DroidQuickExport].into(), None).unwrap();
    let sess = svc.sessions.issue(persona(3, &[Role::Ml]), "127.0.0.1").unwrap();

    let by_token = resolve(&svc, &token, "10.1.1.1");
    assert_eq!(by_token.provenance, Provenance::ApiToken);
    assert!(by_token.has_role(Role::DroidQuickExport));

    let by_session = resolve(&svc, &sess.key, "127.0.0.1");
    assert_eq!(by_session.provenance, Provenance::Session);
    assert_eq!(by_session.principal_id, Some(3));

    // Session keys are IP bound, tokens are not.
    assert!(resolve(&svc, &sess.key, "10.1.1.1").is_anonymous());
}

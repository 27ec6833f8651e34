use std::sync::Arc;

use tracing::debug;

use super::principal::{Identity, Provenance};
use super::session::SessionManager;
use super::token::TokenRegistry;

/// The two ways a credential string can be recognised.
pub trait CredentialLookup: Send + Sync {
    fn lookup_by_token(&self, token: &str) -> Identity;
    fn lookup_by_session(&self, key: &str, ip: &str) -> Identity;
}

/// Resolve a bare credential to an identity.
///
/// The credential is tried as an API token first. Only when that yields the
/// bare anonymous identity is it retried as a session key bound to
/// `source_ip`. Unrecognised credentials resolve to anonymous, which is a
/// valid (maximally restricted) identity rather than an error.
pub fn resolve(lookup: &dyn CredentialLookup, credential: &str, source_ip: &str) -> Identity {
    let by_token = lookup.lookup_by_token(credential);
    if !by_token.is_anonymous() {
        debug!(target: "memberhub::identity", "resolve via=api_token name={}", by_token.display_name);
        return Identity { provenance: Provenance::ApiToken, ..by_token };
    }
    let by_session = lookup.lookup_by_session(credential, source_ip);
    if by_session.is_anonymous() {
        debug!(target: "memberhub::identity", "resolve via=none ip={}", source_ip);
        return Identity { source_ip: Some(source_ip.to_string()), ..Identity::anonymous() };
    }
    debug!(target: "memberhub::identity", "resolve via=session name={}", by_session.display_name);
    Identity { provenance: Provenance::Session, ..by_session }
}

/// Session manager and token registry behind one lookup seam.
#[derive(Clone)]
pub struct CredentialService {
    pub sessions: Arc<SessionManager>,
    pub tokens: Arc<TokenRegistry>,
}

impl CredentialService {
    pub fn new(sessions: Arc<SessionManager>, tokens: Arc<TokenRegistry>) -> Self { Self { sessions, tokens } }
}

impl CredentialLookup for CredentialService {
    fn lookup_by_token(&self, token: &str) -> Identity { self.tokens.lookup(token) }

    fn lookup_by_session(&self, key: &str, ip: &str) -> Identity {
        self.sessions.validate(key, ip).unwrap_or_else(Identity::anonymous)
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tracing::info;

use super::password::verify_password;
use super::principal::Identity;
use super::roles::{extend_roles, RoleSet};
use super::session::{Session, SessionManager};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub ip: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;
}

/// A persona able to log in interactively.
#[derive(Debug, Clone)]
pub struct Account {
    pub principal_id: i64,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub roles: RoleSet,
}

/// Password login against an in-memory account directory.
pub struct LocalAuthProvider {
    accounts: HashMap<String, Account>,
    sm: Arc<SessionManager>,
}

impl LocalAuthProvider {
    pub fn new<I: IntoIterator<Item = Account>>(accounts: I, sm: Arc<SessionManager>) -> Self {
        let accounts = accounts.into_iter().map(|a| (a.username.to_lowercase(), a)).collect();
        Self { accounts, sm }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> { &self.sm }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let Some(acct) = self.accounts.get(&req.username.to_lowercase()) else {
            return Err(anyhow!("invalid_credentials"));
        };
        if !verify_password(&acct.password_hash, &req.password) {
            return Err(anyhow!("invalid_credentials"));
        }
        let identity = Identity {
            principal_id: Some(acct.principal_id),
            display_name: acct.display_name.clone(),
            roles: extend_roles(acct.roles.iter().copied()),
            ..Identity::anonymous()
        };
        let session = self.sm.issue(identity, &req.ip)?;
        info!(target: "memberhub::identity", "auth.login user={} sid={}", acct.username, session.session_id);
        Ok(LoginResponse { session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::password::hash_password;
    use crate::identity::roles::Role;

    fn provider() -> LocalAuthProvider {
        let acct = Account {
            principal_id: 1,
            username: "anton@example.cde".into(),
            display_name: "Anton Armin A. Administrator".into(),
            password_hash: hash_password("secret").unwrap(),
            roles: RoleSet::from([Role::MetaAdmin]),
        };
        LocalAuthProvider::new([acct], Arc::new(SessionManager::default()))
    }

    #[test]
    fn login_issues_ip_bound_session() {
        let p = provider();
        let req = LoginRequest { username: "Anton@Example.cde".into(), password: "secret".into(), ip: "127.0.0.1".into() };
        let resp = p.login(&req).unwrap();
        let id = p.sessions().validate(&resp.session.key, "127.0.0.1").unwrap();
        assert_eq!(id.principal_id, Some(1));
        assert!(id.has_role(Role::CoreAdmin));
    }

    #[test]
    fn login_rejects_bad_password_and_unknown_user() {
        let p = provider();
        let bad = LoginRequest { username: "anton@example.cde".into(), password: "nope".into(), ip: "127.0.0.1".into() };
        assert!(p.login(&bad).is_err());
        let unknown = LoginRequest { username: "nobody".into(), password: "secret".into(), ip: "127.0.0.1".into() };
        assert_eq!(p.login(&unknown).unwrap_err().to_string(), "invalid_credentials");
    }
}

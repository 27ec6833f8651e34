use std::collections::HashMap;

use anyhow::{bail, Result};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::password::{gen_id, hash_password, verify_password};
use super::principal::{Identity, Provenance};
use super::roles::{extend_roles, RoleSet};

pub const TOKEN_PREFIX: &str = "memberhub";

#[derive(Debug, Clone)]
struct DroidEntry {
    roles: RoleSet,
    principal_id: Option<i64>,
    secret_hash: String,
}

/// Registry of API tokens held by service identities ("droids").
///
/// Tokens read `memberhub-<droid>-<secret>`. Droid names are restricted to
/// `[a-z0-9_]` so the first dash after the prefix always separates the name
/// from the secret. Only the Argon2 hash of the secret is kept.
#[derive(Default)]
pub struct TokenRegistry {
    droids: RwLock<HashMap<String, DroidEntry>>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        bail!("invalid droid name '{}': expected [a-z0-9_]+", name);
    }
    Ok(())
}

pub fn format_token(droid: &str, secret: &str) -> String { format!("{TOKEN_PREFIX}-{droid}-{secret}") }

fn parse_token(token: &str) -> Option<(&str, &str)> {
    let rest = token.strip_prefix(TOKEN_PREFIX)?.strip_prefix('-')?;
    let (droid, secret) = rest.split_once('-')?;
    if droid.is_empty() || secret.is_empty() { return None; }
    Some((droid, secret))
}

impl TokenRegistry {
    pub fn new() -> Self { Self::default() }

    /// Create (or rotate) a droid with a fresh secret. The clear token is only
    /// returned here.
    pub fn issue(&self, droid: &str, roles: RoleSet, principal_id: Option<i64>) -> Result<String> {
        let secret = gen_id()?;
        self.register(droid, roles, principal_id, &secret)?;
        info!(target: "memberhub::identity", "token.issue droid={}", droid);
        Ok(format_token(droid, &secret))
    }

    /// Register a droid with a known secret (fixture provisioning).
    pub fn register(&self, droid: &str, roles: RoleSet, principal_id: Option<i64>, secret: &str) -> Result<()> {
        let secret_hash = hash_password(secret)?;
        self.register_hashed(droid, roles, principal_id, secret_hash)
    }

    pub fn register_hashed(&self, droid: &str, roles: RoleSet, principal_id: Option<i64>, secret_hash: String) -> Result<()> {
        validate_name(droid)?;
        let entry = DroidEntry { roles: extend_roles(roles), principal_id, secret_hash };
        self.droids.write().insert(droid.to_string(), entry);
        Ok(())
    }

    pub fn revoke(&self, droid: &str) -> bool {
        let removed = self.droids.write().remove(droid).is_some();
        if removed { info!(target: "memberhub::identity", "token.revoke droid={}", droid); }
        removed
    }

    /// Identity bound to `token`; anonymous when the token is malformed,
    /// unknown, revoked, or its secret does not match.
    pub fn lookup(&self, token: &str) -> Identity {
        let Some((droid, secret)) = parse_token(token) else { return Identity::anonymous(); };
        let entry = self.droids.read().get(droid).cloned();
        match entry {
            Some(e) if verify_password(&e.secret_hash, secret) => Identity {
                principal_id: e.principal_id,
                display_name: droid.to_string(),
                roles: e.roles,
                provenance: Provenance::ApiToken,
                ..Identity::anonymous()
            },
            Some(_) => {
                debug!(target: "memberhub::identity", "token.lookup secret mismatch droid={}", droid);
                Identity::anonymous()
            }
            None => Identity::anonymous(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::roles::Role;

    #[test]
    fn issued_token_resolves() {
        let reg = TokenRegistry::new();
        let token = reg.issue("orga_bot", RoleSet::from([Role::Event]), Some(7)).unwrap();
        assert!(token.starts_with("memberhub-orga_bot-"));
        let id = reg.lookup(&token);
        assert_eq!(id.provenance, Provenance::ApiToken);
        assert_eq!(id.principal_id, Some(7));
        assert!(id.has_role(Role::Event));
        assert!(id.has_role(Role::Anonymous));
        assert!(id.has_role(Role::Persona));
    }

    #[test]
    fn wrong_secret_and_garbage_are_anonymous() {
        let reg = TokenRegistry::new();
        reg.register("quick_export", RoleSet::from([Role::DroidQuickExport]), None, "s3cr3t").unwrap();
        assert!(!reg.lookup(&format_token("quick_export", "s3cr3t")).is_anonymous());
        assert!(reg.lookup(&format_token("quick_export", "wrong")).is_anonymous());
        assert!(reg.lookup("").is_anonymous());
        assert!(reg.lookup("memberhub-").is_anonymous());
        assert!(reg.lookup("other-quick_export-s3cr3t").is_anonymous());
    }

    #[test]
    fn secret_may_contain_dashes() {
        let reg = TokenRegistry::new();
        reg.register("resolver", RoleSet::from([Role::DroidResolve]), None, "a-b-c").unwrap();
        assert!(reg.lookup("memberhub-resolver-a-b-c").has_role(Role::DroidResolve));
    }

    #[test]
    fn revoked_token_is_anonymous() {
        let reg = TokenRegistry::new();
        let token = reg.issue("genesis", RoleSet::from([Role::CoreAdmin]), None).unwrap();
        assert!(reg.revoke("genesis"));
        assert!(reg.lookup(&token).is_anonymous());
    }

    #[test]
    fn rotation_issues_a_fresh_secret() {
        let reg = TokenRegistry::new();
        let first = reg.issue("orga_bot", RoleSet::from([Role::Event]), Some(7)).unwrap();
        let second = reg.issue("orga_bot", RoleSet::from([Role::Event]), Some(7)).unwrap();
        assert_ne!(first, second);
        assert!(reg.lookup(&first).is_anonymous());
        assert!(!reg.lookup(&second).is_anonymous());
    }

    #[test]
    fn rejects_bad_names() {
        let reg = TokenRegistry::new();
        assert!(reg.issue("Bad-Name", RoleSet::new(), None).is_err());
        assert!(reg.issue("", RoleSet::new(), None).is_err());
    }
}

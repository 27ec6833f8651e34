//! Wiring: one place that turns a `ProxyConfig` plus fixtures into the
//! credential stores, pool, backend, and dispatchers.

use std::sync::Arc;

use tracing::info;

use crate::backend::membership::membership_backend;
use crate::backend::Backend;
use crate::config::ProxyConfig;
use crate::error::ProxyResult;
use crate::fixtures::FixtureStore;
use crate::identity::{AuthProvider, CredentialService, LocalAuthProvider, LoginRequest, SessionKey, SessionManager};
use crate::pool::ConnectionPool;
use crate::proxy::{BackendProxy, ScheduledProxy};

pub struct Environment {
    pub config: ProxyConfig,
    pub fixtures: Arc<FixtureStore>,
    pub credentials: CredentialService,
    pub auth: LocalAuthProvider,
    pub pool: Arc<ConnectionPool>,
    pub backend: Arc<Backend>,
}

impl Environment {
    /// Fixtures come from `config.fixtures` when set, the bundled sample data
    /// otherwise.
    pub fn from_config(config: ProxyConfig) -> ProxyResult<Self> {
        let fixtures = match &config.fixtures {
            Some(path) => Arc::new(FixtureStore::from_path(path)?),
            None => FixtureStore::shared()?,
        };
        Self::with_fixtures(config, fixtures)
    }

    pub fn with_fixtures(config: ProxyConfig, fixtures: Arc<FixtureStore>) -> ProxyResult<Self> {
        config.validate()?;
        let sessions = Arc::new(SessionManager::new(config.session_ttl()));
        let tokens = Arc::new(fixtures.token_registry()?);
        let credentials = CredentialService::new(Arc::clone(&sessions), tokens);
        let auth = LocalAuthProvider::new(fixtures.accounts().cloned(), sessions);
        let pool = ConnectionPool::new(config.pool_size_per_role);
        let backend = Arc::new(membership_backend(Arc::clone(&fixtures), config.storage_dir.clone()));
        info!(
            target: "memberhub",
            "environment ready: realm={} operations={} pool_size_per_role={} storage_dir='{}' internal_access={}",
            backend.realm(),
            backend.operations().count(),
            config.pool_size_per_role,
            config.storage_dir.display(),
            config.internal_access
        );
        Ok(Self { config, fixtures, credentials, auth, pool, backend })
    }

    pub fn proxy(&self) -> BackendProxy {
        BackendProxy::new(
            Arc::clone(&self.backend),
            Arc::new(self.credentials.clone()),
            Arc::clone(&self.pool),
            &self.config,
        )
    }

    pub fn scheduled(&self) -> ScheduledProxy {
        ScheduledProxy::new(Arc::clone(&self.backend), Arc::clone(&self.pool), self.config.locale)
    }

    /// Password login; returns the session key bound to `ip`.
    pub fn login(&self, username: &str, password: &str, ip: &str) -> anyhow::Result<SessionKey> {
        let req = LoginRequest { username: username.to_string(), password: password.to_string(), ip: ip.to_string() };
        Ok(self.auth.login(&req)?.session.key)
    }
}

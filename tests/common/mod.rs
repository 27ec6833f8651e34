//! Shared setup for integration tests.
//!
//! Each test describes what it needs with a `CaseConfig` (which persona it
//! runs as, whether storage must be provisioned, whether the dispatcher has
//! internal access, the locale). `run_case` evaluates that configuration
//! before the body runs and tears everything down afterwards.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use memberhub::fixtures::FixtureStore;
use memberhub::i18n::Locale;
use memberhub::storage_paths;
use memberhub::{BackendProxy, Environment, ProxyConfig, ScheduledProxy, DEFAULT_SOURCE_IP};

pub const PASSWORD: &str = "secret";

#[derive(Debug, Clone, Default)]
pub struct CaseConfig {
    user: Option<String>,
    storage: bool,
    internal_access: bool,
    locale: Option<Locale>,
    pool_size: Option<usize>,
}

impl CaseConfig {
    pub fn new() -> Self { Self::default() }

    /// Log in as the fixture persona with this username before the body runs.
    pub fn as_user(mut self, username: &str) -> Self {
        self.user = Some(username.to_string());
        self
    }

    /// Provision a fresh storage directory with the standard layout.
    pub fn with_storage(mut self) -> Self {
        self.storage = true;
        self
    }

    pub fn with_internal_access(mut self) -> Self {
        self.internal_access = true;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn with_pool_size(mut self, n: usize) -> Self {
        self.pool_size = Some(n);
        self
    }
}

pub struct Case {
    pub env: Environment,
    pub proxy: BackendProxy,
    /// Session key of the configured user; empty when running anonymously.
    pub key: String,
    storage_root: PathBuf,
    _tmp: TempDir,
}

impl Case {
    pub fn fixtures(&self) -> &FixtureStore { &self.env.fixtures }
    pub fn scheduled(&self) -> ScheduledProxy { self.env.scheduled() }
    pub fn storage_root(&self) -> &Path { &self.storage_root }

    pub fn droid_token(&self, name: &str) -> String {
        self.env.fixtures.droid_token(name).unwrap_or_default()
    }

    /// Write an assembly attachment file where the backend expects it.
    pub fn provision_attachment(&self, attachment_id: i64, version: u32, body: &[u8]) -> Result<PathBuf> {
        let path = storage_paths::assembly_attachment_path(&self.storage_root, attachment_id, version);
        std::fs::write(&path, body).with_context(|| format!("provisioning {}", path.display()))?;
        Ok(path)
    }
}

/// Evaluate `config`, then run `body` against the prepared case.
pub fn run_case<F>(config: CaseConfig, body: F) -> Result<()>
where
    F: FnOnce(&mut Case) -> Result<()>,
{
    let tmp = tempfile::tempdir()?;
    // Unprovisioned cases point at a directory that does not exist.
    let storage_root = if config.storage {
        let root = tmp.path().join("storage");
        storage_paths::ensure_layout(&root)?;
        root
    } else {
        tmp.path().join("unprovisioned")
    };

    let mut proxy_cfg = ProxyConfig {
        storage_dir: storage_root.clone(),
        internal_access: config.internal_access,
        locale: config.locale.unwrap_or(Locale::En),
        ..ProxyConfig::default()
    };
    if let Some(n) = config.pool_size { proxy_cfg.pool_size_per_role = n; }

    let env = Environment::with_fixtures(proxy_cfg, FixtureStore::shared()?)?;
    let key = match &config.user {
        Some(u) => env.login(u, PASSWORD, DEFAULT_SOURCE_IP)?,
        None => String::new(),
    };
    let proxy = env.proxy();
    let mut case = Case { env, proxy, key, storage_root, _tmp: tmp };
    body(&mut case)?;

    // Every call must have handed its connection back.
    assert_eq!(case.env.pool.total_in_use(), 0, "connections leaked by test body");
    Ok(())
}

pub fn no_kwargs() -> serde_json::Map<String, serde_json::Value> { serde_json::Map::new() }

//! Proxy configuration: built-in defaults, overridable from `MEMBERHUB_*`
//! environment variables or a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ProxyError, ProxyResult};
use crate::i18n::Locale;

pub const ENV_PREFIX: &str = "MEMBERHUB_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxyConfig {
    /// Fixture file; the bundled sample data when unset.
    pub fixtures: Option<PathBuf>,
    /// Root of on-disk resources (attachments, exports).
    pub storage_dir: PathBuf,
    pub locale: Locale,
    pub pool_size_per_role: usize,
    pub session_ttl_secs: u64,
    /// Whether the external dispatcher may reach internal-only operations.
    pub internal_access: bool,
    /// Attribute names handed out as-is, bypassing the gate.
    pub passthrough: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            fixtures: None,
            storage_dir: PathBuf::from("storage"),
            locale: Locale::De,
            pool_size_per_role: 8,
            session_ttl_secs: 60 * 60,
            internal_access: false,
            passthrough: vec!["subman".to_string()],
        }
    }
}

fn parse_bool(key: &str, v: &str) -> ProxyResult<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ProxyError::config(format!("{key}: expected a boolean, got '{v}'"))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, v: &str) -> ProxyResult<T> {
    v.trim().parse::<T>().map_err(|_| ProxyError::config(format!("{key}: expected a number, got '{v}'")))
}

impl ProxyConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> ProxyResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `MEMBERHUB_*` key.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> ProxyResult<Self> {
        let mut cfg = Self::default();
        let get = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|v| (key, v))
        };
        if let Some((_, v)) = get("FIXTURES") { cfg.fixtures = Some(PathBuf::from(v)); }
        if let Some((_, v)) = get("STORAGE_DIR") { cfg.storage_dir = PathBuf::from(v); }
        if let Some((k, v)) = get("LOCALE") {
            cfg.locale = v.parse().map_err(|e: anyhow::Error| ProxyError::config(format!("{k}: {e}")))?;
        }
        if let Some((k, v)) = get("POOL_SIZE") { cfg.pool_size_per_role = parse_num(&k, &v)?; }
        if let Some((k, v)) = get("SESSION_TTL_SECS") { cfg.session_ttl_secs = parse_num(&k, &v)?; }
        if let Some((k, v)) = get("INTERNAL_ACCESS") { cfg.internal_access = parse_bool(&k, &v)?; }
        if let Some((_, v)) = get("PASSTHROUGH") {
            cfg.passthrough = v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> ProxyResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProxyError::config(format!("reading {}: {e}", path.display())))?;
        let cfg: ProxyConfig = serde_json::from_str(&text)
            .map_err(|e| ProxyError::config(format!("parsing {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ProxyResult<()> {
        if self.pool_size_per_role == 0 {
            return Err(ProxyError::config("pool_size_per_role must be at least 1"));
        }
        if let Some(bad) = self.passthrough.iter().find(|n| n.is_empty() || n.chars().any(char::is_whitespace)) {
            return Err(ProxyError::config(format!("invalid passthrough name '{bad}'")));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_ttl_secs) }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

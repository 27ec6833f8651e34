//! Immutable sample data.
//!
//! A `FixtureStore` is parsed and validated once, then only ever read.
//! Passwords and droid secrets are hashed during loading so every consumer
//! shares the same precomputed hashes. `FixtureStore::shared()` holds the
//! bundled sample data for the whole process.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::subman::SubscriptionState;
use crate::error::{ProxyError, ProxyResult};
use crate::identity::{extend_roles, hash_password, Account, Role, RoleSet, TokenRegistry};

const SAMPLE_DATA: &str = include_str!("../fixtures/sample_data.json");

static SHARED: OnceCell<Arc<FixtureStore>> = OnceCell::new();

#[derive(Debug, Deserialize)]
struct RawPersona {
    id: i64,
    username: String,
    display_name: String,
    password: String,
    #[serde(default)]
    roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
struct RawDroid {
    name: String,
    secret: String,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(default)]
    principal_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFixture {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub orgas: BTreeSet<i64>,
    #[serde(default)]
    pub registrations: BTreeSet<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberFixture {
    pub persona_id: i64,
    pub state: SubscriptionState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailinglistFixture {
    pub id: i64,
    pub address: String,
    #[serde(default)]
    pub moderators: BTreeSet<i64>,
    #[serde(default)]
    pub subscribers: Vec<SubscriberFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentFixture {
    pub id: i64,
    pub title: String,
    pub version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyFixture {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub presiders: BTreeSet<i64>,
    #[serde(default)]
    pub attachments: Vec<AttachmentFixture>,
}

#[derive(Debug, Deserialize)]
struct RawFixtures {
    #[serde(default)]
    personas: Vec<RawPersona>,
    #[serde(default)]
    droids: Vec<RawDroid>,
    #[serde(default)]
    events: Vec<EventFixture>,
    #[serde(default)]
    mailinglists: Vec<MailinglistFixture>,
    #[serde(default)]
    assemblies: Vec<AssemblyFixture>,
}

#[derive(Debug, Clone)]
pub struct DroidFixture {
    pub name: String,
    pub secret: String,
    pub roles: RoleSet,
    pub principal_id: Option<i64>,
    secret_hash: String,
}

#[derive(Debug)]
pub struct FixtureStore {
    personas: BTreeMap<i64, Account>,
    droids: BTreeMap<String, DroidFixture>,
    events: BTreeMap<i64, EventFixture>,
    mailinglists: BTreeMap<i64, MailinglistFixture>,
    assemblies: BTreeMap<i64, AssemblyFixture>,
}

fn index_unique<T, F: Fn(&T) -> i64>(kind: &str, items: Vec<T>, key: F) -> ProxyResult<BTreeMap<i64, T>> {
    let mut out = BTreeMap::new();
    for it in items {
        let k = key(&it);
        if out.insert(k, it).is_some() {
            return Err(ProxyError::fixture(format!("duplicate {kind} id {k}")));
        }
    }
    Ok(out)
}

impl FixtureStore {
    /// The bundled sample data, loaded on first use and shared read-only.
    pub fn shared() -> ProxyResult<Arc<FixtureStore>> {
        SHARED.get_or_try_init(|| Self::from_json_str(SAMPLE_DATA).map(Arc::new)).cloned()
    }

    pub fn from_path(path: &Path) -> ProxyResult<FixtureStore> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixtures from {}", path.display()))
            .map_err(|e| ProxyError::fixture(format!("{e:#}")))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> ProxyResult<FixtureStore> {
        let raw: RawFixtures =
            serde_json::from_str(text).map_err(|e| ProxyError::fixture(format!("invalid fixture data: {e}")))?;

        let mut accounts = Vec::with_capacity(raw.personas.len());
        for p in raw.personas {
            let password_hash = hash_password(&p.password).map_err(|e| ProxyError::fixture(e.to_string()))?;
            accounts.push(Account {
                principal_id: p.id,
                username: p.username,
                display_name: p.display_name,
                password_hash,
                roles: extend_roles(p.roles),
            });
        }
        let personas = index_unique("persona", accounts, |a| a.principal_id)?;

        let mut droids = BTreeMap::new();
        for d in raw.droids {
            let secret_hash = hash_password(&d.secret).map_err(|e| ProxyError::fixture(e.to_string()))?;
            let fx = DroidFixture {
                name: d.name.clone(),
                secret: d.secret,
                roles: extend_roles(d.roles),
                principal_id: d.principal_id,
                secret_hash,
            };
            if droids.insert(d.name.clone(), fx).is_some() {
                return Err(ProxyError::fixture(format!("duplicate droid '{}'", d.name)));
            }
        }

        let store = FixtureStore {
            personas,
            droids,
            events: index_unique("event", raw.events, |e| e.id)?,
            mailinglists: index_unique("mailinglist", raw.mailinglists, |m| m.id)?,
            assemblies: index_unique("assembly", raw.assemblies, |a| a.id)?,
        };
        store.check_references()?;
        info!(
            target: "memberhub::fixtures",
            "fixtures.load personas={} droids={} events={} mailinglists={} assemblies={}",
            store.personas.len(), store.droids.len(), store.events.len(), store.mailinglists.len(), store.assemblies.len()
        );
        Ok(store)
    }

    fn check_references(&self) -> ProxyResult<()> {
        let known = |kind: &str, owner: i64, pid: i64| -> ProxyResult<()> {
            if self.personas.contains_key(&pid) { Ok(()) } else {
                Err(ProxyError::fixture(format!("{kind} {owner} references unknown persona {pid}")))
            }
        };
        for e in self.events.values() {
            for pid in e.orgas.iter().chain(e.registrations.iter()) { known("event", e.id, *pid)?; }
        }
        for m in self.mailinglists.values() {
            for pid in m.moderators.iter().chain(m.subscribers.iter().map(|s| &s.persona_id)) { known("mailinglist", m.id, *pid)?; }
        }
        for a in self.assemblies.values() {
            for pid in &a.presiders { known("assembly", a.id, *pid)?; }
        }
        for d in self.droids.values() {
            if let Some(pid) = d.principal_id {
                if !self.personas.contains_key(&pid) {
                    return Err(ProxyError::fixture(format!("droid '{}' references unknown persona {}", d.name, pid)));
                }
            }
        }
        Ok(())
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> { self.personas.values() }
    pub fn persona(&self, id: i64) -> Option<&Account> { self.personas.get(&id) }

    pub fn persona_by_username(&self, username: &str) -> Option<&Account> {
        self.personas.values().find(|a| a.username.eq_ignore_ascii_case(username))
    }

    pub fn droids(&self) -> impl Iterator<Item = &DroidFixture> { self.droids.values() }
    pub fn droid(&self, name: &str) -> Option<&DroidFixture> { self.droids.get(name) }

    /// Clear-text API token of a fixture droid.
    pub fn droid_token(&self, name: &str) -> Option<String> {
        self.droids.get(name).map(|d| crate::identity::format_token(&d.name, &d.secret))
    }

    pub fn events(&self) -> impl Iterator<Item = &EventFixture> { self.events.values() }
    pub fn event(&self, id: i64) -> Option<&EventFixture> { self.events.get(&id) }
    pub fn mailinglist(&self, id: i64) -> Option<&MailinglistFixture> { self.mailinglists.get(&id) }
    pub fn mailinglists(&self) -> impl Iterator<Item = &MailinglistFixture> { self.mailinglists.values() }
    pub fn assembly(&self, id: i64) -> Option<&AssemblyFixture> { self.assemblies.get(&id) }
    pub fn assemblies(&self) -> impl Iterator<Item = &AssemblyFixture> { self.assemblies.values() }

    pub fn orga_events(&self, persona_id: i64) -> BTreeSet<i64> {
        self.events.values().filter(|e| e.orgas.contains(&persona_id)).map(|e| e.id).collect()
    }

    pub fn moderated_lists(&self, persona_id: i64) -> BTreeSet<i64> {
        self.mailinglists.values().filter(|m| m.moderators.contains(&persona_id)).map(|m| m.id).collect()
    }

    pub fn presided_assemblies(&self, persona_id: i64) -> BTreeSet<i64> {
        self.assemblies.values().filter(|a| a.presiders.contains(&persona_id)).map(|a| a.id).collect()
    }

    /// Fresh token registry holding every fixture droid.
    pub fn token_registry(&self) -> ProxyResult<TokenRegistry> {
        let reg = TokenRegistry::new();
        for d in self.droids.values() {
            reg.register_hashed(&d.name, d.roles.clone(), d.principal_id, d.secret_hash.clone())
                .map_err(|e| ProxyError::fixture(e.to_string()))?;
        }
        Ok(reg)
    }
}

#[cfg(test)]
#[path = "fixtures_tests.rs"]
mod tests;

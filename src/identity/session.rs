use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::RwLock;
use tracing::{debug, info};

use super::password::gen_id;
use super::principal::{Identity, Provenance};

pub type SessionKey = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub key: SessionKey,
    pub identity: Identity,
    pub ip: String,
    pub expires_at: Instant,
}

/// Interactive login sessions. Each key is bound to the IP address it was
/// issued for and expires after `ttl`.
///
/// Keys are random and never reissued, so removing a session is enough to
/// make its key invalid. Expired sessions are swept on every `issue` and
/// dropped as soon as they are presented.
/// Lock order: `sessions` before `user_index`.
pub struct SessionManager {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionKey, Session>>,
    user_index: RwLock<HashMap<i64, HashSet<SessionKey>>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::new(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, sessions: RwLock::new(HashMap::new()), user_index: RwLock::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration { self.ttl }

    fn unindex(index: &mut HashMap<i64, HashSet<SessionKey>>, principal_id: Option<i64>, key: &str) {
        let Some(pid) = principal_id else { return; };
        if let Some(set) = index.get_mut(&pid) {
            set.remove(key);
            if set.is_empty() { index.remove(&pid); }
        }
    }

    pub fn issue(&self, identity: Identity, ip: &str) -> Result<Session> {
        self.purge_expired();
        let mut identity = identity;
        identity.provenance = Provenance::Session;
        identity.source_ip = Some(ip.to_string());
        let sess = Session {
            session_id: gen_id()?,
            key: gen_id()?,
            identity,
            ip: ip.to_string(),
            expires_at: Instant::now() + self.ttl,
        };
        let mut sessions = self.sessions.write();
        sessions.insert(sess.key.clone(), sess.clone());
        if let Some(pid) = sess.identity.principal_id {
            self.user_index.write().entry(pid).or_default().insert(sess.key.clone());
        }
        info!(target: "memberhub::identity", "session.issue user={} sid={} ttl_secs={}", sess.identity.display_name, sess.session_id, self.ttl.as_secs());
        Ok(sess)
    }

    /// Identity bound to `key` when presented from `ip`. Unknown, expired,
    /// logged-out, and foreign-IP keys all yield `None`.
    pub fn validate(&self, key: &str, ip: &str) -> Option<Identity> {
        if key.is_empty() { return None; }
        let now = Instant::now();
        let expired = {
            let map = self.sessions.read();
            match map.get(key) {
                Some(s) if s.expires_at <= now => true,
                Some(s) if s.ip != ip => return None,
                Some(s) => return Some(s.identity.clone()),
                None => return None,
            }
        };
        if expired {
            let mut sessions = self.sessions.write();
            if let Some(sess) = sessions.remove(key) {
                Self::unindex(&mut self.user_index.write(), sess.identity.principal_id, key);
                debug!(target: "memberhub::identity", "session.expired sid={}", sess.session_id);
            }
        }
        None
    }

    /// Drop every expired session; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let expired: Vec<SessionKey> = sessions.values().filter(|s| s.expires_at <= now).map(|s| s.key.clone()).collect();
        if expired.is_empty() { return 0; }
        let mut index = self.user_index.write();
        for key in &expired {
            if let Some(sess) = sessions.remove(key) {
                Self::unindex(&mut index, sess.identity.principal_id, key);
            }
        }
        debug!(target: "memberhub::identity", "session.purge count={}", expired.len());
        expired.len()
    }

    pub fn logout(&self, key: &str) -> bool {
        let mut sessions = self.sessions.write();
        let Some(sess) = sessions.remove(key) else { return false; };
        Self::unindex(&mut self.user_index.write(), sess.identity.principal_id, key);
        info!(target: "memberhub::identity", "session.logout sid={}", sess.session_id);
        true
    }

    pub fn revoke_user(&self, principal_id: i64) -> usize {
        let mut sessions = self.sessions.write();
        let keys = self.user_index.write().remove(&principal_id).unwrap_or_default();
        let count = keys.iter().filter(|k| sessions.remove(k.as_str()).is_some()).count();
        info!(target: "memberhub::identity", "session.revoke user={} count={}", principal_id, count);
        count
    }

    pub fn active_count(&self) -> usize { self.sessions.read().len() }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

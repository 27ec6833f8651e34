//! Per-call request context and the builder that synthesizes it from an
//! identity.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{Annotators, LookupFn};
use crate::error::ProxyResult;
use crate::i18n::{catalog, Catalog, Locale};
use crate::identity::{Identity, Role};
use crate::pool::{ConnectionPool, PooledConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Everything a backend operation gets to know about the current call.
/// Built fresh per call and dropped with it, which returns `conn` to the pool.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub identity: Identity,
    pub locale: Locale,
    pub catalog: &'static Catalog,
    pub begin: DateTime<Utc>,
    pub conn: PooledConnection,
    pub notifications: Vec<Notification>,
    pub errors: Vec<(String, String)>,
}

impl RequestContext {
    pub fn gettext<'a>(&self, msgid: &'a str) -> &'a str { self.catalog.gettext(msgid) }

    pub fn notify(&mut self, kind: NotificationKind, msgid: &str) {
        let message = self.catalog.gettext(msgid).to_string();
        self.notifications.push(Notification { kind, message });
    }

    /// Record a field-level validation error.
    pub fn add_error<F: Into<String>, M: Into<String>>(&mut self, field: F, message: M) {
        self.errors.push((field.into(), message.into()));
    }

    pub fn principal_id(&self) -> Option<i64> { self.identity.principal_id }

    pub fn elapsed(&self) -> chrono::Duration { Utc::now() - self.begin }
}

/// Synthesizes request contexts: picks the database role, borrows a pooled
/// connection, attaches the locale catalog, and enriches the identity.
#[derive(Clone)]
pub struct ContextBuilder {
    pool: Arc<ConnectionPool>,
    annotators: Annotators,
}

fn annotate(lookup: Option<&LookupFn>, wanted: bool, principal_id: Option<i64>) -> Option<BTreeSet<i64>> {
    if !wanted { return None; }
    let f = lookup?;
    Some(principal_id.map(|id| f(id)).unwrap_or_default())
}

impl ContextBuilder {
    pub fn new(pool: Arc<ConnectionPool>, annotators: Annotators) -> Self { Self { pool, annotators } }

    pub fn pool(&self) -> &Arc<ConnectionPool> { &self.pool }

    /// Enrich `identity` with the annotations its roles call for.
    pub fn enrich(&self, identity: &mut Identity) {
        let pid = identity.principal_id;
        let a = &self.annotators;
        if let Some(s) = annotate(a.organizer.as_ref(), identity.has_role(Role::Event), pid) {
            identity.annotations.orga = Some(s);
        }
        if let Some(s) = annotate(a.moderator.as_ref(), identity.has_role(Role::Ml), pid) {
            identity.annotations.moderator = Some(s);
        }
        if let Some(s) = annotate(a.presider.as_ref(), identity.has_role(Role::Assembly), pid) {
            identity.annotations.presider = Some(s);
        }
    }

    /// Build a complete context or fail before anything is handed out. The
    /// connection is borrowed first so a pool failure leaves no partial state.
    pub fn build(&self, identity: Identity, locale: Locale) -> ProxyResult<RequestContext> {
        let db_role = identity.db_role();
        let conn = self.pool.borrow(db_role)?;
        let mut identity = identity;
        self.enrich(&mut identity);
        let ctx = RequestContext {
            request_id: Uuid::new_v4(),
            identity,
            locale,
            catalog: catalog(locale),
            begin: Utc::now(),
            conn,
            notifications: Vec::new(),
            errors: Vec::new(),
        };
        debug!(
            target: "memberhub::context",
            "context.build rid={} user={} db_role={} conn={} locale={}",
            ctx.request_id, ctx.identity.display_name, db_role, ctx.conn.id, locale
        );
        Ok(ctx)
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

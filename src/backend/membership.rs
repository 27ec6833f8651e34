//! Membership backend: events, mailing lists, and assemblies over the
//! fixture store.
//!
//! Role checks happen here, in the operations themselves. The proxy only
//! decides whether an operation is reachable at all; whether *this* caller
//! may use it is application logic and fails with an ordinary operation
//! error.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use serde_json::{json, Value};
use tracing::info;

use super::subman::{SubscriptionAction, SubscriptionManager};
use super::{int_arg, Backend, Kwargs};
use crate::context::{NotificationKind, RequestContext};
use crate::fixtures::FixtureStore;
use crate::identity::{DbRole, Role};
use crate::storage_paths;

pub const SUBMAN: &str = "subman";

fn deny(ctx: &RequestContext, msgid: &str) -> anyhow::Error { anyhow!(ctx.gettext(msgid).to_string()) }

fn require_role(ctx: &RequestContext, role: Role) -> Result<()> {
    if ctx.identity.is_anonymous() {
        return Err(deny(ctx, "error.not_logged_in"));
    }
    if !ctx.identity.has_role(role) {
        return Err(deny(ctx, "error.not_privileged"));
    }
    Ok(())
}

fn require_int(ctx: &RequestContext, args: &[Value], kwargs: &Kwargs, idx: usize, key: &str) -> Result<i64> {
    int_arg(args, kwargs, idx, key).ok_or_else(|| anyhow!("{} ({})", ctx.gettext("error.invalid_argument"), key))
}

fn list_events(fx: &FixtureStore, _ctx: &mut RequestContext) -> Result<Value> {
    let events: Vec<Value> = fx.events().map(|e| json!({ "id": e.id, "title": e.title })).collect();
    Ok(Value::Array(events))
}

fn get_persona(fx: &FixtureStore, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    require_role(ctx, Role::Persona)?;
    ctx.conn.require(DbRole::Persona)?;
    let me = ctx.principal_id();
    let wanted = int_arg(args, kwargs, 0, "persona_id").or(me).ok_or_else(|| deny(ctx, "error.unknown_persona"))?;
    if Some(wanted) != me && !ctx.identity.has_role(Role::CoreAdmin) {
        return Err(deny(ctx, "error.not_privileged"));
    }
    let p = fx.persona(wanted).ok_or_else(|| deny(ctx, "error.unknown_persona"))?;
    let roles: Vec<&str> = p.roles.iter().map(|r| r.as_str()).collect();
    Ok(json!({ "id": p.principal_id, "username": p.username, "display_name": p.display_name, "roles": roles }))
}

fn list_registrations(fx: &FixtureStore, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    require_role(ctx, Role::Event)?;
    let event_id = require_int(ctx, args, kwargs, 0, "event_id")?;
    let event = fx.event(event_id).ok_or_else(|| deny(ctx, "error.unknown_event"))?;
    if !ctx.identity.is_orga(event_id) && !ctx.identity.has_role(Role::EventAdmin) {
        return Err(deny(ctx, "error.not_privileged"));
    }
    Ok(json!({ "event_id": event.id, "registrations": event.registrations }))
}

fn moderated_lists(ctx: &mut RequestContext) -> Result<Value> {
    require_role(ctx, Role::Ml)?;
    let ids = ctx.identity.annotations.moderator.clone().unwrap_or_default();
    Ok(json!(ids))
}

fn get_assembly_attachment(
    fx: &FixtureStore,
    storage: &std::path::Path,
    ctx: &mut RequestContext,
    args: &[Value],
    kwargs: &Kwargs,
) -> Result<Value> {
    require_role(ctx, Role::Assembly)?;
    let attachment_id = require_int(ctx, args, kwargs, 0, "attachment_id")?;
    let found = fx.assemblies().find_map(|a| a.attachments.iter().find(|at| at.id == attachment_id).map(|at| (a.id, at)));
    let Some((assembly_id, att)) = found else { return Err(deny(ctx, "error.invalid_argument")); };
    let path = storage_paths::assembly_attachment_path(storage, att.id, att.version);
    let bytes = std::fs::read(&path)
        .with_context(|| format!("reading assembly attachment {} at {}", att.id, path.display()))?;
    Ok(json!({
        "assembly_id": assembly_id,
        "id": att.id,
        "title": att.title,
        "version": att.version,
        "size": bytes.len(),
        "content": base64::engine::general_purpose::STANDARD.encode(&bytes),
    }))
}

fn subscribe(fx: &FixtureStore, subman: &SubscriptionManager, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    require_role(ctx, Role::Ml)?;
    let pid = ctx.principal_id().ok_or_else(|| deny(ctx, "error.not_logged_in"))?;
    let ml_id = require_int(ctx, args, kwargs, 0, "mailinglist_id")?;
    let ml = fx.mailinglist(ml_id).ok_or_else(|| deny(ctx, "error.unknown_mailinglist"))?;
    let current = ml.subscribers.iter().find(|s| s.persona_id == pid).map(|s| s.state);
    let next = subman.apply(current, SubscriptionAction::Subscribe)?;
    ctx.notify(NotificationKind::Success, "notify.subscribed");
    Ok(json!({ "mailinglist_id": ml_id, "state": next }))
}

fn list_orphaned_events(fx: &FixtureStore, ctx: &mut RequestContext) -> Result<Value> {
    if !(ctx.identity.has_role(Role::EventAdmin) || ctx.identity.has_role(Role::CoreAdmin) || ctx.identity.has_role(Role::Cron)) {
        return Err(deny(ctx, "error.not_privileged"));
    }
    let ids: Vec<i64> = fx.events().filter(|e| e.orgas.is_empty()).map(|e| e.id).collect();
    Ok(json!(ids))
}

fn load_persona_row(fx: &FixtureStore, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    let pid = require_int(ctx, args, kwargs, 0, "persona_id")?;
    let p = fx.persona(pid).ok_or_else(|| deny(ctx, "error.unknown_persona"))?;
    Ok(json!({ "id": p.principal_id, "username": p.username, "display_name": p.display_name }))
}

fn export_mailinglist(fx: &FixtureStore, storage: &std::path::Path, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> Result<Value> {
    ctx.conn.require(DbRole::Admin)?;
    let ml_id = require_int(ctx, args, kwargs, 0, "mailinglist_id")?;
    let ml = fx.mailinglist(ml_id).ok_or_else(|| deny(ctx, "error.unknown_mailinglist"))?;
    let path = storage_paths::mailinglist_export_path(storage, ml_id);
    let body = serde_json::to_vec_pretty(ml)?;
    std::fs::write(&path, &body).with_context(|| format!("writing mailinglist export {}", path.display()))?;
    info!(target: "memberhub::backend", "ml.export id={} bytes={} by={}", ml_id, body.len(), ctx.identity.display_name);
    Ok(json!({ "mailinglist_id": ml_id, "path": path.display().to_string(), "bytes": body.len() }))
}

/// Assemble the membership backend over `fixtures`, reading and writing
/// files below `storage_root`.
pub fn membership_backend(fixtures: Arc<FixtureStore>, storage_root: PathBuf) -> Backend {
    let subman = Arc::new(SubscriptionManager::new());
    let storage = Arc::new(storage_root);

    let (f1, f2, f3, f4, f5, f6, f7, f8) = (
        fixtures.clone(), fixtures.clone(), fixtures.clone(), fixtures.clone(),
        fixtures.clone(), fixtures.clone(), fixtures.clone(), fixtures.clone(),
    );
    let (s1, s2) = (storage.clone(), storage.clone());
    let sm = subman.clone();
    let (orga, moder, presi) = (fixtures.clone(), fixtures.clone(), fixtures);

    Backend::builder("membership")
        .public("list_events", move |ctx, _, _| list_events(&f1, ctx))
        .public("get_persona", move |ctx, a, k| get_persona(&f2, ctx, a, k))
        .public("list_registrations", move |ctx, a, k| list_registrations(&f3, ctx, a, k))
        .public("moderated_lists", |ctx, _, _| moderated_lists(ctx))
        .public("get_assembly_attachment", move |ctx, a, k| get_assembly_attachment(&f4, &s1, ctx, a, k))
        .public("subscribe", move |ctx, a, k| subscribe(&f5, &sm, ctx, a, k))
        .internal("list_orphaned_events", move |ctx, _, _| list_orphaned_events(&f6, ctx))
        .private("_load_persona_row", move |ctx, a, k| load_persona_row(&f7, ctx, a, k))
        .private("_export_mailinglist", move |ctx, a, k| export_mailinglist(&f8, &s2, ctx, a, k))
        .utility(SUBMAN, subman)
        .organizer_lookup(move |pid| orga.orga_events(pid))
        .moderator_lookup(move |pid| moder.moderated_lists(pid))
        .presider_lookup(move |pid| presi.presided_assemblies(pid))
        .build()
}

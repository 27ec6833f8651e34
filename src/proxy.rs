//! Proxy dispatchers: the façade callers use to run backend operations as
//! the identity behind a credential.
//!
//! `BackendProxy` is the external path: gate check, credential resolution,
//! context synthesis, invocation. `ScheduledProxy` is the trusted path for
//! the job runner: it skips the gate and credential steps and runs every call
//! under the fixed scheduler identity.

use std::any::Any;
use std::io;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{Backend, Kwargs, Operation};
use crate::config::ProxyConfig;
use crate::context::{ContextBuilder, RequestContext};
use crate::error::{ProxyError, ProxyResult};
use crate::gate::{CapabilityGate, DenyReason, GateDecision};
use crate::i18n::Locale;
use crate::identity::{resolve, CredentialLookup, Identity};
use crate::pool::ConnectionPool;

pub const DEFAULT_SOURCE_IP: &str = "127.0.0.0";

/// True when an absent file sits anywhere in the error chain.
fn is_missing_resource(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|c| c.downcast_ref::<io::Error>())
        .any(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Run `op` and translate its failure at this boundary. Missing on-disk
/// resources become `MissingResource` with the original error as source;
/// everything else passes through unchanged.
fn invoke(op: &Operation, ctx: &mut RequestContext, args: &[Value], kwargs: &Kwargs) -> ProxyResult<Value> {
    match op.invoke(ctx, args, kwargs) {
        Ok(v) => {
            debug!(target: "memberhub::proxy", "call.done op={} rid={} elapsed_ms={}", op.name(), ctx.request_id, ctx.elapsed().num_milliseconds());
            Ok(v)
        }
        Err(err) if is_missing_resource(&err) => {
            warn!(
                target: "memberhub::proxy",
                "call.missing_resource op={} rid={} elapsed_ms={} err={:#}",
                op.name(), ctx.request_id, ctx.elapsed().num_milliseconds(), err
            );
            Err(ProxyError::MissingResource { operation: op.name().to_string(), source: err.into() })
        }
        Err(err) => {
            debug!(target: "memberhub::proxy", "call.failed op={} rid={} err={}", op.name(), ctx.request_id, err);
            Err(ProxyError::Operation(err))
        }
    }
}

pub struct BackendProxy {
    backend: Arc<Backend>,
    credentials: Arc<dyn CredentialLookup>,
    contexts: ContextBuilder,
    gate: CapabilityGate,
    locale: Locale,
}

impl BackendProxy {
    pub fn new(
        backend: Arc<Backend>,
        credentials: Arc<dyn CredentialLookup>,
        pool: Arc<ConnectionPool>,
        config: &ProxyConfig,
    ) -> Self {
        let contexts = ContextBuilder::new(pool, backend.annotators().clone());
        let gate = CapabilityGate::new(config.internal_access, config.passthrough.iter().cloned());
        Self { backend, credentials, contexts, gate, locale: config.locale }
    }

    /// Same backend and stores, different internal-access flag.
    pub fn with_internal_access(&self, internal_access: bool) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            credentials: Arc::clone(&self.credentials),
            contexts: self.contexts.clone(),
            gate: CapabilityGate::new(internal_access, self.gate.passthrough().map(str::to_string)),
            locale: self.locale,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn internal_access(&self) -> bool { self.gate.internal_access() }
    pub fn backend(&self) -> &Arc<Backend> { &self.backend }
    pub fn contexts(&self) -> &ContextBuilder { &self.contexts }

    /// Call `operation` as the holder of `credential`, arriving from the
    /// default source address.
    pub fn call(&self, credential: &str, operation: &str, args: &[Value], kwargs: &Kwargs) -> ProxyResult<Value> {
        self.call_from(credential, operation, args, kwargs, DEFAULT_SOURCE_IP)
    }

    pub fn call_from(
        &self,
        credential: &str,
        operation: &str,
        args: &[Value],
        kwargs: &Kwargs,
        source_ip: &str,
    ) -> ProxyResult<Value> {
        let op = self.backend.operation(operation);
        let op = match self.gate.check(operation, op.map(Operation::descriptor)) {
            GateDecision::Allow => match op {
                Some(op) => op,
                None => return Err(ProxyError::privilege(operation, DenyReason::NotCallable)),
            },
            // Utility objects are fetched with `utility`, never called.
            GateDecision::PassThrough => return Err(ProxyError::privilege(operation, DenyReason::NotCallable)),
            GateDecision::Deny(reason) => {
                warn!(target: "memberhub::proxy", "gate.deny op={} reason={} internal={}", operation, reason, self.internal_access());
                return Err(ProxyError::privilege(operation, reason));
            }
        };

        let identity = resolve(self.credentials.as_ref(), credential, source_ip);
        let mut ctx = self.contexts.build(identity, self.locale)?;
        debug!(
            target: "memberhub::proxy",
            "call op={} rid={} user={} via={:?}",
            operation, ctx.request_id, ctx.identity.display_name, ctx.identity.provenance
        );
        invoke(op, &mut ctx, args, kwargs)
    }

    /// Fetch a reserved pass-through object by name, bypassing the operation
    /// markers entirely.
    pub fn utility<T: Any + Send + Sync>(&self, name: &str) -> ProxyResult<Arc<T>> {
        match self.gate.check(name, None) {
            GateDecision::PassThrough => {}
            GateDecision::Deny(reason) => return Err(ProxyError::privilege(name, reason)),
            GateDecision::Allow => return Err(ProxyError::privilege(name, DenyReason::NotCallable)),
        }
        let obj = self
            .backend
            .utility(name)
            .cloned()
            .ok_or_else(|| ProxyError::privilege(name, DenyReason::NotCallable))?;
        obj.downcast::<T>().map_err(|_| ProxyError::privilege(name, DenyReason::NotCallable))
    }
}

/// Dispatcher for the scheduled job runner. Different trust boundary: no gate,
/// no credential, a fresh scheduler-identity context per call.
pub struct ScheduledProxy {
    backend: Arc<Backend>,
    contexts: ContextBuilder,
    locale: Locale,
}

impl ScheduledProxy {
    pub fn new(backend: Arc<Backend>, pool: Arc<ConnectionPool>, locale: Locale) -> Self {
        let contexts = ContextBuilder::new(pool, backend.annotators().clone());
        Self { backend, contexts, locale }
    }

    pub fn contexts(&self) -> &ContextBuilder { &self.contexts }

    pub fn call(&self, operation: &str, args: &[Value], kwargs: &Kwargs) -> ProxyResult<Value> {
        let op = self
            .backend
            .operation(operation)
            .ok_or_else(|| ProxyError::privilege(operation, DenyReason::NotCallable))?;
        let mut ctx = self.contexts.build(Identity::scheduler(), self.locale)?;
        debug!(target: "memberhub::proxy", "cron.call op={} rid={}", operation, ctx.request_id);
        invoke(op, &mut ctx, args, kwargs)
    }
}

#[cfg(test)]
#[path = "proxy_tests.rs"]
mod tests;

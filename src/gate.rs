//! Capability gate: which backend attributes are reachable through the proxy.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Exposure markers attached to every registered backend operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    /// Callable through the proxy at all.
    pub public: bool,
    /// Callable only by dispatchers configured with internal access.
    pub internal: bool,
}

impl OperationDescriptor {
    pub const PUBLIC: Self = Self { public: true, internal: false };
    pub const INTERNAL: Self = Self { public: true, internal: true };
    pub const PRIVATE: Self = Self { public: false, internal: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Operation lacks the public-visibility marker.
    NotPublic,
    /// Operation is internal-only and internal access was not requested.
    InternalOnly,
    /// Name does not resolve to a callable operation.
    NotCallable,
}

impl Display for DenyReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DenyReason::NotPublic => "not marked public",
            DenyReason::InternalOnly => "internal access required",
            DenyReason::NotCallable => "not a callable operation",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Reserved utility object handed out as-is.
    PassThrough,
    Deny(DenyReason),
}

/// Decide for a single operation. `descriptor` is `None` when the name does
/// not resolve to a callable.
pub fn check(descriptor: Option<&OperationDescriptor>, internal_access: bool) -> GateDecision {
    match descriptor {
        None => GateDecision::Deny(DenyReason::NotCallable),
        Some(d) if !d.public => GateDecision::Deny(DenyReason::NotPublic),
        Some(d) if d.internal && !internal_access => GateDecision::Deny(DenyReason::InternalOnly),
        Some(_) => GateDecision::Allow,
    }
}

/// Gate configuration for one dispatcher: its internal-access flag and the
/// closed list of pass-through attribute names.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    internal_access: bool,
    passthrough: BTreeSet<String>,
}

impl CapabilityGate {
    pub fn new<I, S>(internal_access: bool, passthrough: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { internal_access, passthrough: passthrough.into_iter().map(Into::into).collect() }
    }

    pub fn internal_access(&self) -> bool { self.internal_access }
    pub fn is_passthrough(&self, name: &str) -> bool { self.passthrough.contains(name) }
    pub fn passthrough(&self) -> impl Iterator<Item = &str> { self.passthrough.iter().map(String::as_str) }

    /// Pass-through names win over everything else, then the operation
    /// markers decide.
    pub fn check(&self, name: &str, descriptor: Option<&OperationDescriptor>) -> GateDecision {
        if self.is_passthrough(name) {
            return GateDecision::PassThrough;
        }
        check(descriptor, self.internal_access)
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;

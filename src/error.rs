//! Unified proxy error model and mapping helpers.
//! Every failure leaving the dispatcher is one of these variants; genuine
//! application errors raised by backend operations pass through untouched
//! inside `ProxyError::Operation`.

use crate::gate::DenyReason;
use crate::identity::DbRole;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The capability gate refused access to the named attribute.
    #[error("privilege_error: attribute `{attribute}` is not accessible through the proxy ({reason})")]
    Privilege { attribute: String, reason: DenyReason },

    /// An operation tripped over an absent on-disk resource. Almost always a
    /// test that forgot to provision storage or a fixture file.
    #[error("missing_resource: operation `{operation}` needs a provisioned resource that is absent; provision the storage fixture before calling it")]
    MissingResource {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("pool_exhausted: no free connection for database role {role} (limit {limit})")]
    Pool { role: DbRole, limit: usize },

    #[error("config_error: {message}")]
    Config { message: String },

    #[error("fixture_error: {message}")]
    Fixture { message: String },

    /// Failure raised by the backend operation itself.
    #[error(transparent)]
    Operation(#[from] anyhow::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn privilege<S: Into<String>>(attribute: S, reason: DenyReason) -> Self {
        ProxyError::Privilege { attribute: attribute.into(), reason }
    }
    pub fn config<S: Into<String>>(msg: S) -> Self { ProxyError::Config { message: msg.into() } }
    pub fn fixture<S: Into<String>>(msg: S) -> Self { ProxyError::Fixture { message: msg.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            ProxyError::Privilege { .. } => "privilege_error",
            ProxyError::MissingResource { .. } => "missing_resource",
            ProxyError::Pool { .. } => "pool_exhausted",
            ProxyError::Config { .. } => "config_error",
            ProxyError::Fixture { .. } => "fixture_error",
            ProxyError::Operation(_) => "operation_error",
        }
    }

    /// Map to the HTTP status the web frontend would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ProxyError::Privilege { .. } => 403,
            ProxyError::MissingResource { .. } => 500,
            ProxyError::Pool { .. } => 503,
            ProxyError::Config { .. } | ProxyError::Fixture { .. } => 500,
            ProxyError::Operation(_) => 422,
        }
    }

    /// Process exit code used by the command line tools.
    pub fn exit_code(&self) -> i32 {
        match self {
            ProxyError::Privilege { .. } => 3,
            ProxyError::MissingResource { .. } => 4,
            ProxyError::Pool { .. } => 5,
            ProxyError::Config { .. } | ProxyError::Fixture { .. } => 2,
            ProxyError::Operation(_) => 1,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

//! Caller identities: role model, credential stores, and the resolver that
//! turns a bare credential string into an `Identity`.
//! Keep the public surface thin and split implementation across sub-modules.

mod password;
mod principal;
mod provider;
mod resolver;
mod roles;
mod session;
mod token;

pub use password::{gen_id, hash_password, verify_password};
pub use principal::{Annotations, Identity, Provenance};
pub use provider::{Account, AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use resolver::{resolve, CredentialLookup, CredentialService};
pub use roles::{anonymous_roles, extend_roles, is_only_anonymous, DbRole, Role, RoleSet};
pub use session::{Session, SessionKey, SessionManager};
pub use token::{format_token, TokenRegistry, TOKEN_PREFIX};

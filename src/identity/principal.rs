use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::roles::{anonymous_roles, is_only_anonymous, DbRole, Role, RoleSet};

/// How the caller's credential was recognised. Display and audit only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    #[default]
    None,
    Session,
    ApiToken,
}

/// Role-scoped annotations. `None` means "not looked up", which differs from
/// an empty set ("looked up, nothing found").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotations {
    #[serde(default)]
    pub orga: Option<BTreeSet<i64>>,
    #[serde(default)]
    pub moderator: Option<BTreeSet<i64>>,
    #[serde(default)]
    pub presider: Option<BTreeSet<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub principal_id: Option<i64>,
    pub display_name: String,
    pub roles: RoleSet,
    #[serde(default)]
    pub provenance: Provenance,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl Default for Identity {
    fn default() -> Self { Self::anonymous() }
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            principal_id: None,
            display_name: "anonymous".into(),
            roles: anonymous_roles(),
            provenance: Provenance::None,
            source_ip: None,
            annotations: Annotations::default(),
        }
    }

    /// Fixed identity used by the scheduled job runner.
    pub fn scheduler() -> Self {
        Self {
            display_name: "cron".into(),
            roles: RoleSet::from([Role::Anonymous, Role::Cron]),
            ..Self::anonymous()
        }
    }

    pub fn is_anonymous(&self) -> bool { is_only_anonymous(&self.roles) }
    pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }
    pub fn db_role(&self) -> DbRole { DbRole::for_roles(&self.roles) }

    pub fn is_orga(&self, event_id: i64) -> bool {
        self.annotations.orga.as_ref().is_some_and(|s| s.contains(&event_id))
    }

    pub fn is_moderator(&self, mailinglist_id: i64) -> bool {
        self.annotations.moderator.as_ref().is_some_and(|s| s.contains(&mailinglist_id))
    }

    pub fn is_presider(&self, assembly_id: i64) -> bool {
        self.annotations.presider.as_ref().is_some_and(|s| s.contains(&assembly_id))
    }
}

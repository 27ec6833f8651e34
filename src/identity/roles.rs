use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Named capability groups a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Anonymous,
    Persona,
    Cde,
    Event,
    Ml,
    Assembly,
    Member,
    Searchable,
    CoreAdmin,
    CdeAdmin,
    EventAdmin,
    MlAdmin,
    AssemblyAdmin,
    MetaAdmin,
    DroidQuickExport,
    DroidResolve,
    Cron,
}

pub type RoleSet = BTreeSet<Role>;

impl Role {
    pub const ALL: [Role; 17] = [
        Role::Anonymous,
        Role::Persona,
        Role::Cde,
        Role::Event,
        Role::Ml,
        Role::Assembly,
        Role::Member,
        Role::Searchable,
        Role::CoreAdmin,
        Role::CdeAdmin,
        Role::EventAdmin,
        Role::MlAdmin,
        Role::AssemblyAdmin,
        Role::MetaAdmin,
        Role::DroidQuickExport,
        Role::DroidResolve,
        Role::Cron,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Persona => "persona",
            Role::Cde => "cde",
            Role::Event => "event",
            Role::Ml => "ml",
            Role::Assembly => "assembly",
            Role::Member => "member",
            Role::Searchable => "searchable",
            Role::CoreAdmin => "core_admin",
            Role::CdeAdmin => "cde_admin",
            Role::EventAdmin => "event_admin",
            Role::MlAdmin => "ml_admin",
            Role::AssemblyAdmin => "assembly_admin",
            Role::MetaAdmin => "meta_admin",
            Role::DroidQuickExport => "droid_quick_export",
            Role::DroidResolve => "droid_resolve",
            Role::Cron => "cron",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Role::CoreAdmin | Role::CdeAdmin | Role::EventAdmin | Role::MlAdmin | Role::AssemblyAdmin | Role::MetaAdmin
        )
    }

    /// Roles directly implied by holding this one.
    fn implies(&self) -> &'static [Role] {
        match self {
            Role::Anonymous | Role::Cron => &[],
            Role::Persona | Role::DroidQuickExport | Role::DroidResolve => &[Role::Anonymous],
            Role::Cde | Role::Event | Role::Ml | Role::Assembly => &[Role::Persona],
            Role::Member => &[Role::Cde],
            Role::Searchable => &[Role::Member],
            Role::CoreAdmin => &[Role::Persona],
            Role::CdeAdmin => &[Role::Cde],
            Role::EventAdmin => &[Role::Event],
            Role::MlAdmin => &[Role::Ml],
            Role::AssemblyAdmin => &[Role::Assembly],
            Role::MetaAdmin => &[Role::CoreAdmin],
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == needle)
            .ok_or_else(|| anyhow!("unknown role '{}'", s))
    }
}

pub fn anonymous_roles() -> RoleSet { RoleSet::from([Role::Anonymous]) }

/// True when the set carries nothing beyond the anonymous baseline.
pub fn is_only_anonymous(roles: &RoleSet) -> bool {
    roles.iter().all(|r| *r == Role::Anonymous)
}

/// Close a role set under implication. The result always contains `anonymous`.
pub fn extend_roles<I: IntoIterator<Item = Role>>(roles: I) -> RoleSet {
    let mut out = anonymous_roles();
    let mut stack: Vec<Role> = roles.into_iter().collect();
    while let Some(r) = stack.pop() {
        if out.insert(r) {
            stack.extend_from_slice(r.implies());
        }
    }
    out
}

/// Connection pool partitions. Ordered from most to least restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbRole {
    Anonymous,
    Persona,
    Member,
    Admin,
}

impl DbRole {
    pub const ALL: [DbRole; 4] = [DbRole::Anonymous, DbRole::Persona, DbRole::Member, DbRole::Admin];

    /// Total mapping from a caller's role set to the database role its
    /// connection is opened with.
    pub fn for_roles(roles: &RoleSet) -> DbRole {
        if roles.iter().any(|r| r.is_admin()) || roles.contains(&Role::Cron) || roles.contains(&Role::DroidResolve) {
            DbRole::Admin
        } else if roles.contains(&Role::Member) {
            DbRole::Member
        } else if roles.contains(&Role::Persona) || roles.contains(&Role::DroidQuickExport) {
            DbRole::Persona
        } else {
            DbRole::Anonymous
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DbRole::Anonymous => "mh_anonymous",
            DbRole::Persona => "mh_persona",
            DbRole::Member => "mh_member",
            DbRole::Admin => "mh_admin",
        }
    }
}

impl Display for DbRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod tests;

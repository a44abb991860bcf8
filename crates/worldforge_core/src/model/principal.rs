//! Principal (calling actor) model.
//!
//! # Invariants
//! - Roles form a strict total order of privilege; `Ord` follows it.
//! - A principal's role is fixed for the lifetime of one request.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque user identifier issued by the identity provider.
pub type PrincipalId = String;

/// Closed set of roles, declared from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Free,
    WorldBuilder,
    WorldDeveloper,
    UniverseCreator,
    Privileged,
    Admin,
}

impl Role {
    /// Every role, least privileged first.
    pub const ALL: [Role; 6] = [
        Role::Free,
        Role::WorldBuilder,
        Role::WorldDeveloper,
        Role::UniverseCreator,
        Role::Privileged,
        Role::Admin,
    ];

    /// Stable storage/wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::WorldBuilder => "world_builder",
            Self::WorldDeveloper => "world_developer",
            Self::UniverseCreator => "universe_creator",
            Self::Privileged => "privileged",
            Self::Admin => "admin",
        }
    }

    /// Parses the storage/wire string. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated actor making a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<PrincipalId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

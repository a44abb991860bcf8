//! Named resource model shared by every worldbuilder tool.
//!
//! # Responsibility
//! - Define the single-table "named resource" shape and its write inputs.
//! - Declare the per-tool entity kinds that reuse the shape.
//! - Own the field validation shared by every write path.
//!
//! # Invariants
//! - `name` is never blank after create or update.
//! - `owner_id` is assigned by the store, never by the caller.
//! - `data` is opaque to the engine; tools own its semantics.

use crate::model::principal::PrincipalId;
use crate::policy::visibility::Ownable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Server-assigned identifier of any stored resource.
pub type ResourceId = Uuid;

/// Stored row of a named resource table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedResource {
    pub id: ResourceId,
    pub owner_id: PrincipalId,
    pub name: String,
    pub tagline: Option<String>,
    /// Tool-specific payload, stored as JSON text.
    pub data: Value,
    pub is_free: bool,
    pub is_published: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Ownable for NamedResource {
    fn owner_id(&self) -> &str {
        self.owner_id.as_str()
    }

    fn is_free(&self) -> bool {
        self.is_free
    }
}

/// Create request. Unknown fields (including any `ownerId`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub is_published: bool,
}

impl NewResource {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update. `None` keeps the stored value; an empty tagline clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub is_free: Option<bool>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Response wrapper carrying the caller-relative `canEdit` flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Editable<T> {
    #[serde(flatten)]
    pub item: T,
    pub can_edit: bool,
}

/// Static description of one tool table built on the named resource shape.
pub trait ResourceKind: Send + Sync + 'static {
    /// SQL table name; also the plural wire key and route segment.
    const TABLE: &'static str;
    /// Singular wire key used by item responses.
    const SINGULAR: &'static str;
}

macro_rules! resource_kinds {
    ($($(#[$meta:meta])* $kind:ident => $table:literal, $singular:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $kind;

            impl ResourceKind for $kind {
                const TABLE: &'static str = $table;
                const SINGULAR: &'static str = $singular;
            }
        )+

        /// Every named resource table, in migration order.
        pub const RESOURCE_TABLES: &[&str] = &[$($table),+];
    };
}

resource_kinds! {
    Skill => "skills", "skill";
    Faction => "factions", "faction";
    Armor => "armor", "armor";
    Companion => "companions", "companion";
    Service => "services", "service";
    /// Planes, pantheons and other cosmology entries.
    Cosmos => "cosmos", "cosmos";
    Npc => "npcs", "npc";
    Religion => "religions", "religion";
    Culture => "cultures", "culture";
    Language => "languages", "language";
    Item => "items", "item";
    Spell => "spells", "spell";
}

/// Field validation failures shared by every write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `name` is empty after trim.
    BlankName,
    /// A required text field is empty after trim.
    BlankField(&'static str),
    /// A numeric field must be strictly positive.
    NonPositive { field: &'static str, value: i64 },
    /// `scale = other` without a `scaleOther` label.
    MissingScaleOther,
    /// `scale = world` with a parent.
    WorldWithParent,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::NonPositive { field, value } => {
                write!(f, "{field} must be greater than zero, got {value}")
            }
            Self::MissingScaleOther => write!(f, "scaleOther is required when scale is `other`"),
            Self::WorldWithParent => write!(f, "a world-scale entry cannot have a parent"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects it when nothing is left.
pub fn normalize_name(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field, mapping blank input to `None`.
pub fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, normalize_optional_text, NewResource, ValidationError};

    #[test]
    fn normalize_name_rejects_blank_values() {
        assert_eq!(normalize_name(""), Err(ValidationError::BlankName));
        assert_eq!(normalize_name("   "), Err(ValidationError::BlankName));
        assert_eq!(normalize_name("  Ironhold "), Ok("Ironhold".to_string()));
    }

    #[test]
    fn normalize_optional_text_drops_blank_values() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(
            normalize_optional_text(Some(" windswept ")),
            Some("windswept".to_string())
        );
    }

    #[test]
    fn new_resource_ignores_client_owner_field() {
        let parsed: NewResource =
            serde_json::from_str(r#"{"ownerId":"U2","createdBy":"U2","name":"X"}"#)
                .expect("create body should parse");
        assert_eq!(parsed, NewResource::named("X"));
    }
}

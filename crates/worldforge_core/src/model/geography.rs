//! Geography (hierarchical named resource) model.
//!
//! # Responsibility
//! - Define scales, the typed geography payload and write inputs.
//! - Resolve the effective scale used by hierarchy rules.
//!
//! # Invariants
//! - `scale = World` implies `parent_id = None`.
//! - `scale = Other` requires a non-blank `scale_other`.
//! - Unknown keys in `data` survive every read/write unchanged.

use crate::model::principal::PrincipalId;
use crate::model::resource::{
    normalize_name, normalize_optional_text, ResourceId, ValidationError,
};
use crate::policy::visibility::Ownable;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Hierarchy tier of a geography entry, top-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    World,
    Continent,
    Region,
    Province,
    District,
    Location,
    Poi,
    Other,
}

impl Scale {
    /// Every named tier, top-down. `Other` is excluded.
    pub const NAMED: [Scale; 7] = [
        Scale::World,
        Scale::Continent,
        Scale::Region,
        Scale::Province,
        Scale::District,
        Scale::Location,
        Scale::Poi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Continent => "continent",
            Self::Region => "region",
            Self::Province => "province",
            Self::District => "district",
            Self::Location => "location",
            Self::Poi => "poi",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "world" => Some(Self::World),
            "continent" => Some(Self::Continent),
            "region" => Some(Self::Region),
            "province" => Some(Self::Province),
            "district" => Some(Self::District),
            "location" => Some(Self::Location),
            "poi" => Some(Self::Poi),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl Display for Scale {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scale after resolving `other` through its free-text label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveScale<'a> {
    /// A named tier (including `other` labels that spell a named tier).
    Named(Scale),
    /// A free-text tier outside the named chain.
    Custom(&'a str),
}

/// Resolves the effective scale of `(scale, scale_other)`.
///
/// Returns `None` when `scale = other` and no label has been entered yet.
pub fn effective_scale(scale: Scale, scale_other: Option<&str>) -> Option<EffectiveScale<'_>> {
    if scale != Scale::Other {
        return Some(EffectiveScale::Named(scale));
    }

    let label = scale_other.map(str::trim).filter(|label| !label.is_empty())?;
    match Scale::parse(&label.to_ascii_lowercase()) {
        Some(named) if named != Scale::Other => Some(EffectiveScale::Named(named)),
        _ => Some(EffectiveScale::Custom(label)),
    }
}

/// Typed view of the geography `data` payload.
///
/// Only the inheritable fields are typed; every other key is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographyDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlling_faction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Stored geography entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geography {
    pub id: ResourceId,
    pub owner_id: PrincipalId,
    pub name: String,
    pub tagline: Option<String>,
    pub data: GeographyDetails,
    pub scale: Scale,
    pub scale_other: Option<String>,
    pub parent_id: Option<ResourceId>,
    pub is_free: bool,
    pub is_published: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Geography {
    pub fn effective_scale(&self) -> Option<EffectiveScale<'_>> {
        effective_scale(self.scale, self.scale_other.as_deref())
    }
}

impl Ownable for Geography {
    fn owner_id(&self) -> &str {
        self.owner_id.as_str()
    }

    fn is_free(&self) -> bool {
        self.is_free
    }
}

/// Create request for a geography entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGeography {
    pub name: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub data: GeographyDetails,
    pub scale: Scale,
    #[serde(default)]
    pub scale_other: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ResourceId>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub is_published: bool,
}

impl NewGeography {
    pub fn new(name: impl Into<String>, scale: Scale) -> Self {
        Self {
            name: name.into(),
            tagline: None,
            data: GeographyDetails::default(),
            scale,
            scale_other: None,
            parent_id: None,
            is_free: false,
            is_published: false,
        }
    }

    /// Checks the single-row invariants; hierarchy rules live in the service.
    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_name(&self.name)?;
        if self.scale == Scale::Other
            && normalize_optional_text(self.scale_other.as_deref()).is_none()
        {
            return Err(ValidationError::MissingScaleOther);
        }
        if self.scale == Scale::World && self.parent_id.is_some() {
            return Err(ValidationError::WorldWithParent);
        }
        Ok(())
    }

    /// Applies `patch` on top of this full state.
    pub fn merged(mut self, patch: &GeographyPatch) -> Self {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(tagline) = &patch.tagline {
            self.tagline = Some(tagline.clone());
        }
        if let Some(data) = &patch.data {
            self.data = data.clone();
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
        if let Some(scale_other) = &patch.scale_other {
            self.scale_other = Some(scale_other.clone());
        }
        if let Some(parent_id) = patch.parent_id {
            self.parent_id = parent_id;
        }
        if let Some(is_free) = patch.is_free {
            self.is_free = is_free;
        }
        if let Some(is_published) = patch.is_published {
            self.is_published = is_published;
        }
        self
    }
}

impl From<&Geography> for NewGeography {
    fn from(value: &Geography) -> Self {
        Self {
            name: value.name.clone(),
            tagline: value.tagline.clone(),
            data: value.data.clone(),
            scale: value.scale,
            scale_other: value.scale_other.clone(),
            parent_id: value.parent_id,
            is_free: value.is_free,
            is_published: value.is_published,
        }
    }
}

/// Partial update for a geography entry.
///
/// `parent_id: Some(None)` detaches the entry; `None` keeps the parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeographyPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub data: Option<GeographyDetails>,
    #[serde(default)]
    pub scale: Option<Scale>,
    #[serde(default)]
    pub scale_other: Option<String>,
    #[serde(default, with = "double_option")]
    pub parent_id: Option<Option<ResourceId>>,
    #[serde(default)]
    pub is_free: Option<bool>,
    #[serde(default)]
    pub is_published: Option<bool>,
}

/// Distinguishes an absent key from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

//! Geography hierarchy rules.
//!
//! # Responsibility
//! - Decide which scales may parent which.
//! - Narrow candidate parent lists and derive inherited child fields.
//!
//! # Invariants
//! - Pure functions; no storage access.
//! - An entry is never its own candidate parent.
//! - Only named tiers may act as parents of a scaled entry.

use crate::model::geography::{
    EffectiveScale, Geography, GeographyDetails, GeographyPatch, NewGeography, Scale,
};

/// Scales allowed as the direct parent of `scale`.
pub fn legal_parent_scales(scale: Scale) -> &'static [Scale] {
    match scale {
        Scale::World => &[],
        Scale::Continent => &[Scale::World],
        Scale::Region => &[Scale::Continent],
        Scale::Province => &[Scale::Region],
        Scale::District => &[Scale::Province, Scale::Region],
        Scale::Location => &[Scale::District, Scale::Province],
        Scale::Poi => &[Scale::Location],
        Scale::Other => &Scale::NAMED,
    }
}

/// Returns whether an entry at `parent` scale may parent one at `child`.
///
/// A child whose scale is not yet determinable accepts any parent.
pub fn is_legal_parent(child: Option<EffectiveScale<'_>>, parent: Option<EffectiveScale<'_>>) -> bool {
    let allowed = match child {
        None => return true,
        Some(EffectiveScale::Named(scale)) => legal_parent_scales(scale),
        Some(EffectiveScale::Custom(_)) => legal_parent_scales(Scale::Other),
    };
    matches!(parent, Some(EffectiveScale::Named(scale)) if allowed.contains(&scale))
}

/// Keeps the candidates that may legally parent `current`, in input order.
pub fn filter_candidate_parents(current: &Geography, candidates: Vec<Geography>) -> Vec<Geography> {
    let child_scale = current.effective_scale();
    candidates
        .into_iter()
        .filter(|candidate| candidate.id != current.id)
        .filter(|candidate| is_legal_parent(child_scale, candidate.effective_scale()))
        .collect()
}

/// Next tier down the named chain; anything past `poi` is `other`.
pub fn successor_scale(scale: Option<EffectiveScale<'_>>) -> Scale {
    match scale {
        Some(EffectiveScale::Named(Scale::World)) => Scale::Continent,
        Some(EffectiveScale::Named(Scale::Continent)) => Scale::Region,
        Some(EffectiveScale::Named(Scale::Region)) => Scale::Province,
        Some(EffectiveScale::Named(Scale::Province)) => Scale::District,
        Some(EffectiveScale::Named(Scale::District)) => Scale::Location,
        Some(EffectiveScale::Named(Scale::Location)) => Scale::Poi,
        _ => Scale::Other,
    }
}

/// Builds the patch that fills the child's empty inheritable fields.
///
/// Tags are the union of child tags then parent tags, first occurrence wins.
pub fn compute_inherited_patch(parent: &Geography, child: &Geography) -> GeographyPatch {
    let from = &parent.data;
    let mut data = child.data.clone();

    inherit_text(&mut data.biome, &from.biome);
    inherit_text(&mut data.climate, &from.climate);
    inherit_text(&mut data.controlling_faction_id, &from.controlling_faction_id);

    let mut tags = Vec::with_capacity(data.tags.len() + from.tags.len());
    for tag in data.tags.iter().chain(from.tags.iter()) {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    data.tags = tags;

    if is_blank(&data.description) {
        data.description = Some(subregion_description(&parent.name));
    }

    GeographyPatch {
        data: Some(data),
        ..GeographyPatch::default()
    }
}

/// Prefills an unsaved child entry under `parent`.
pub fn build_child_from_parent(parent: &Geography) -> NewGeography {
    let mut draft = NewGeography::new("", successor_scale(parent.effective_scale()));
    draft.parent_id = Some(parent.id);
    draft.data = GeographyDetails {
        biome: parent.data.biome.clone(),
        climate: parent.data.climate.clone(),
        controlling_faction_id: parent.data.controlling_faction_id.clone(),
        tags: parent.data.tags.clone(),
        description: Some(subregion_description(&parent.name)),
        ..GeographyDetails::default()
    };
    draft
}

fn subregion_description(parent_name: &str) -> String {
    format!("Subregion of {parent_name}.")
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |text| text.trim().is_empty())
}

fn inherit_text(target: &mut Option<String>, source: &Option<String>) {
    if is_blank(target) && !is_blank(source) {
        target.clone_from(source);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        build_child_from_parent, compute_inherited_patch, filter_candidate_parents,
        is_legal_parent, legal_parent_scales, successor_scale,
    };
    use crate::model::geography::{EffectiveScale, Geography, GeographyDetails, Scale};
    use uuid::Uuid;

    fn entry(name: &str, scale: Scale, scale_other: Option<&str>) -> Geography {
        Geography {
            id: Uuid::new_v4(),
            owner_id: "owner".to_string(),
            name: name.to_string(),
            tagline: None,
            data: GeographyDetails::default(),
            scale,
            scale_other: scale_other.map(str::to_string),
            parent_id: None,
            is_free: false,
            is_published: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn legal_parent_table_matches_hierarchy() {
        assert!(legal_parent_scales(Scale::World).is_empty());
        assert_eq!(legal_parent_scales(Scale::Region), &[Scale::Continent]);
        assert_eq!(
            legal_parent_scales(Scale::District),
            &[Scale::Province, Scale::Region]
        );
        assert_eq!(
            legal_parent_scales(Scale::Location),
            &[Scale::District, Scale::Province]
        );
        assert_eq!(legal_parent_scales(Scale::Other).len(), 7);
    }

    #[test]
    fn province_candidates_keep_only_regions() {
        let province = entry("Tethyr", Scale::Province, None);
        let world = entry("Toril", Scale::World, None);
        let continent = entry("Faerun", Scale::Continent, None);
        let region = entry("Western Heartlands", Scale::Region, None);
        let district = entry("Riverside", Scale::District, None);
        let relabeled = entry("Sword Coast", Scale::Other, Some("region"));

        let kept = filter_candidate_parents(
            &province,
            vec![
                world,
                continent,
                region.clone(),
                district,
                province.clone(),
                relabeled.clone(),
            ],
        );
        let ids: Vec<_> = kept.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![region.id, relabeled.id]);
    }

    #[test]
    fn undetermined_scale_accepts_everything_but_itself() {
        let unlabeled = entry("Somewhere", Scale::Other, Some("  "));
        let world = entry("Toril", Scale::World, None);
        let plane = entry("Feywild", Scale::Other, Some("plane"));

        let kept = filter_candidate_parents(&unlabeled, vec![world, plane, unlabeled.clone()]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|item| item.id != unlabeled.id));
    }

    #[test]
    fn custom_scales_only_accept_named_parents() {
        let custom = Some(EffectiveScale::Custom("plane"));
        assert!(is_legal_parent(custom, Some(EffectiveScale::Named(Scale::World))));
        assert!(!is_legal_parent(custom, Some(EffectiveScale::Custom("layer"))));
        assert!(!is_legal_parent(
            Some(EffectiveScale::Named(Scale::Poi)),
            None
        ));
        assert!(is_legal_parent(None, None));
    }

    #[test]
    fn successor_walks_the_named_chain() {
        assert_eq!(
            successor_scale(Some(EffectiveScale::Named(Scale::World))),
            Scale::Continent
        );
        assert_eq!(
            successor_scale(Some(EffectiveScale::Named(Scale::Location))),
            Scale::Poi
        );
        assert_eq!(
            successor_scale(Some(EffectiveScale::Named(Scale::Poi))),
            Scale::Other
        );
        assert_eq!(successor_scale(Some(EffectiveScale::Custom("plane"))), Scale::Other);
        assert_eq!(successor_scale(None), Scale::Other);
    }

    #[test]
    fn inherited_patch_fills_only_empty_fields() {
        let mut parent = entry("Faerun", Scale::Continent, None);
        parent.data.biome = Some("temperate".to_string());
        parent.data.climate = Some("mild".to_string());
        parent.data.tags = vec!["magic".to_string(), "old".to_string()];

        let mut child = entry("Cormyr", Scale::Region, None);
        child.data.biome = Some("forest".to_string());
        child.data.tags = vec!["old".to_string(), "royal".to_string()];
        child
            .data
            .extra
            .insert("population".to_string(), serde_json::json!(42));

        let patch = compute_inherited_patch(&parent, &child);
        let data = patch.data.expect("patch carries data");
        assert_eq!(data.biome.as_deref(), Some("forest"));
        assert_eq!(data.climate.as_deref(), Some("mild"));
        assert_eq!(data.controlling_faction_id, None);
        assert_eq!(data.tags, vec!["old", "royal", "magic"]);
        assert_eq!(data.description.as_deref(), Some("Subregion of Faerun."));
        assert_eq!(data.extra.get("population"), Some(&serde_json::json!(42)));
        assert!(patch.name.is_none());
        assert!(patch.parent_id.is_none());
    }

    #[test]
    fn inherited_patch_keeps_existing_description() {
        let parent = entry("Faerun", Scale::Continent, None);
        let mut child = entry("Cormyr", Scale::Region, None);
        child.data.description = Some("Forest kingdom".to_string());

        let data = compute_inherited_patch(&parent, &child)
            .data
            .expect("patch carries data");
        assert_eq!(data.description.as_deref(), Some("Forest kingdom"));
    }

    #[test]
    fn child_draft_prefills_from_parent() {
        let mut parent = entry("Cormyr", Scale::Region, None);
        parent.data.climate = Some("mild".to_string());
        parent.data.tags = vec!["royal".to_string()];
        parent
            .data
            .extra
            .insert("population".to_string(), serde_json::json!(42));

        let draft = build_child_from_parent(&parent);
        assert_eq!(draft.scale, Scale::Province);
        assert_eq!(draft.parent_id, Some(parent.id));
        assert_eq!(draft.data.climate.as_deref(), Some("mild"));
        assert_eq!(draft.data.tags, vec!["royal"]);
        assert_eq!(draft.data.description.as_deref(), Some("Subregion of Cormyr."));
        assert!(draft.data.extra.is_empty());
    }
}

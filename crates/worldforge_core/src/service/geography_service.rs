//! Geography use-case service.
//!
//! # Responsibility
//! - Provide geography CRUD with the hierarchy write gate.
//! - Offer candidate-parent, child-draft and inherit helpers.
//!
//! # Invariants
//! - A parent must exist, be readable by the caller and carry a legal scale.
//! - Parent assignments never create cycles (full ancestor walk).
//! - A scale change is rejected when any existing child could no longer
//!   sit under the new scale.
//! - Hierarchy checks run only when parent or scale actually change, so an
//!   entry under a parent that later became invisible stays editable.

use crate::model::geography::{effective_scale, Geography, GeographyPatch, NewGeography};
use crate::model::principal::Principal;
use crate::model::resource::{Editable, ResourceId};
use crate::policy::visibility::can_write;
use crate::repo::geography_repo::GeographyRepository;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::hierarchy::{
    build_child_from_parent, compute_inherited_patch, filter_candidate_parents, is_legal_parent,
};
use crate::service::{editable, traced};
use std::collections::HashSet;

/// Geography service facade.
pub struct GeographyService<R: GeographyRepository> {
    repo: R,
}

impl<R: GeographyRepository> GeographyService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists entries visible to `principal`, ordered by name.
    pub fn list(&self, principal: &Principal) -> ServiceResult<Vec<Editable<Geography>>> {
        traced("geography_list", principal, "geographies", || {
            let rows = self.repo.list_geographies(principal)?;
            Ok(rows
                .into_iter()
                .map(|row| editable(principal, row))
                .collect())
        })
    }

    /// Creates one entry after validating its hierarchy placement.
    pub fn create(
        &self,
        principal: &Principal,
        input: &NewGeography,
    ) -> ServiceResult<Editable<Geography>> {
        traced("geography_create", principal, "geographies", || {
            input.validate()?;
            self.ensure_parent_allowed(principal, None, input)?;
            let row = self.repo.create_geography(principal, input)?;
            Ok(editable(principal, row))
        })
    }

    /// Loads one visible entry.
    pub fn get(&self, principal: &Principal, id: ResourceId) -> ServiceResult<Editable<Geography>> {
        traced("geography_get", principal, &id.to_string(), || {
            let row = self.load_visible(principal, id)?;
            Ok(editable(principal, row))
        })
    }

    /// Applies a partial update, re-validating the hierarchy when it changes.
    pub fn update(
        &self,
        principal: &Principal,
        id: ResourceId,
        patch: &GeographyPatch,
    ) -> ServiceResult<Editable<Geography>> {
        traced("geography_update", principal, &id.to_string(), || {
            let current = self.load_writable(principal, id)?;
            let next = NewGeography::from(&current).merged(patch);
            self.write_checked(principal, &current, next)
        })
    }

    /// Deletes one writable entry; its children are detached.
    pub fn delete(&self, principal: &Principal, id: ResourceId) -> ServiceResult<()> {
        traced("geography_delete", principal, &id.to_string(), || {
            self.repo.delete_geography(principal, id)?;
            Ok(())
        })
    }

    /// Lists visible entries that may legally parent entry `id`.
    pub fn candidate_parents(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> ServiceResult<Vec<Editable<Geography>>> {
        traced("geography_candidate_parents", principal, &id.to_string(), || {
            let current = self.load_visible(principal, id)?;
            let visible = self.repo.list_geographies(principal)?;
            Ok(filter_candidate_parents(&current, visible)
                .into_iter()
                .map(|row| editable(principal, row))
                .collect())
        })
    }

    /// Builds an unsaved child prefilled from visible parent `parent_id`.
    pub fn child_draft(
        &self,
        principal: &Principal,
        parent_id: ResourceId,
    ) -> ServiceResult<NewGeography> {
        traced("geography_child_draft", principal, &parent_id.to_string(), || {
            let parent = self.load_visible(principal, parent_id)?;
            Ok(build_child_from_parent(&parent))
        })
    }

    /// Fills the empty inheritable fields of entry `id` from its parent.
    pub fn inherit_from_parent(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> ServiceResult<Editable<Geography>> {
        traced("geography_inherit", principal, &id.to_string(), || {
            let child = self.load_writable(principal, id)?;
            let parent_id = child
                .parent_id
                .ok_or_else(|| ServiceError::BadRequest(format!("entry {id} has no parent")))?;
            let parent = self
                .repo
                .get_geography(principal, parent_id)?
                .ok_or_else(|| {
                    ServiceError::BadRequest(format!("parent {parent_id} is not visible"))
                })?;

            let patch = compute_inherited_patch(&parent, &child);
            let next = NewGeography::from(&child).merged(&patch);
            self.write_checked(principal, &child, next)
        })
    }

    fn write_checked(
        &self,
        principal: &Principal,
        current: &Geography,
        next: NewGeography,
    ) -> ServiceResult<Editable<Geography>> {
        next.validate()?;
        let scale_changed =
            next.scale != current.scale || next.scale_other != current.scale_other;
        if scale_changed || next.parent_id != current.parent_id {
            self.ensure_parent_allowed(principal, Some(current.id), &next)?;
        }
        if scale_changed {
            self.ensure_children_allowed(current.id, &next)?;
        }
        let row = self.repo.update_geography(principal, current.id, &next)?;
        Ok(editable(principal, row))
    }

    fn load_visible(&self, principal: &Principal, id: ResourceId) -> ServiceResult<Geography> {
        self.repo
            .get_geography(principal, id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    fn load_writable(&self, principal: &Principal, id: ResourceId) -> ServiceResult<Geography> {
        let current = self
            .repo
            .find_geography_unscoped(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        if !can_write(principal, &current) {
            return Err(ServiceError::Forbidden(id.to_string()));
        }
        Ok(current)
    }

    fn ensure_parent_allowed(
        &self,
        principal: &Principal,
        node_id: Option<ResourceId>,
        next: &NewGeography,
    ) -> ServiceResult<()> {
        let Some(parent_id) = next.parent_id else {
            return Ok(());
        };
        if node_id == Some(parent_id) {
            return Err(ServiceError::BadRequest(format!(
                "entry {parent_id} cannot be its own parent"
            )));
        }

        let parent = self
            .repo
            .get_geography(principal, parent_id)?
            .ok_or_else(|| {
                ServiceError::BadRequest(format!(
                    "parent {parent_id} does not exist or is not visible"
                ))
            })?;

        let child_scale = effective_scale(next.scale, next.scale_other.as_deref());
        if !is_legal_parent(child_scale, parent.effective_scale()) {
            return Err(ServiceError::BadRequest(format!(
                "a {} cannot be placed under a {}",
                next.scale, parent.scale
            )));
        }

        if let Some(node_id) = node_id {
            if self.would_create_cycle(node_id, parent_id)? {
                return Err(ServiceError::BadRequest(format!(
                    "moving {node_id} under {parent_id} would create a cycle"
                )));
            }
        }
        Ok(())
    }

    fn ensure_children_allowed(
        &self,
        node_id: ResourceId,
        next: &NewGeography,
    ) -> ServiceResult<()> {
        let parent_scale = effective_scale(next.scale, next.scale_other.as_deref());
        let stranded = self
            .repo
            .children_of(node_id)?
            .into_iter()
            .find(|child| !is_legal_parent(child.effective_scale(), parent_scale));
        match stranded {
            Some(child) => Err(ServiceError::BadRequest(format!(
                "child {} ({}) cannot stay under a {}",
                child.id, child.scale, next.scale
            ))),
            None => Ok(()),
        }
    }

    fn would_create_cycle(
        &self,
        node_id: ResourceId,
        candidate_parent_id: ResourceId,
    ) -> ServiceResult<bool> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == node_id || !visited.insert(current) {
                return Ok(true);
            }
            cursor = self.repo.parent_of(current)?.flatten();
        }
        Ok(false)
    }
}

//! Named resource use-case service.
//!
//! # Responsibility
//! - Provide list/create/get/update/delete over one resource table.
//! - Tag every returned row with the caller's `canEdit` flag.

use crate::model::principal::Principal;
use crate::model::resource::{Editable, NamedResource, NewResource, ResourceId, ResourcePatch};
use crate::repo::resource_repo::ResourceRepository;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{editable, traced};

/// Named resource service facade.
pub struct ResourceService<R: ResourceRepository> {
    repo: R,
}

impl<R: ResourceRepository> ResourceService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists rows visible to `principal`, ordered by name.
    pub fn list(&self, principal: &Principal) -> ServiceResult<Vec<Editable<NamedResource>>> {
        traced("resource_list", principal, self.repo.table(), || {
            let rows = self.repo.list_resources(principal)?;
            Ok(rows
                .into_iter()
                .map(|row| editable(principal, row))
                .collect())
        })
    }

    /// Creates one row owned by `principal`.
    pub fn create(
        &self,
        principal: &Principal,
        input: &NewResource,
    ) -> ServiceResult<Editable<NamedResource>> {
        traced("resource_create", principal, self.repo.table(), || {
            let row = self.repo.create_resource(principal, input)?;
            Ok(editable(principal, row))
        })
    }

    /// Loads one visible row.
    pub fn get(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> ServiceResult<Editable<NamedResource>> {
        traced("resource_get", principal, &id.to_string(), || {
            let row = self
                .repo
                .get_resource(principal, id)?
                .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
            Ok(editable(principal, row))
        })
    }

    /// Applies a partial update to one writable row.
    pub fn update(
        &self,
        principal: &Principal,
        id: ResourceId,
        patch: &ResourcePatch,
    ) -> ServiceResult<Editable<NamedResource>> {
        traced("resource_update", principal, &id.to_string(), || {
            let row = self.repo.update_resource(principal, id, patch)?;
            Ok(editable(principal, row))
        })
    }

    /// Deletes one writable row.
    pub fn delete(&self, principal: &Principal, id: ResourceId) -> ServiceResult<()> {
        traced("resource_delete", principal, &id.to_string(), || {
            self.repo.delete_resource(principal, id)?;
            Ok(())
        })
    }
}

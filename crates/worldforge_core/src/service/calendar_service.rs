//! Calendar aggregate use-case service.
//!
//! # Responsibility
//! - List, read, write and delete calendar trees for one principal.
//! - Surface rolled-back writes as `Internal` after the repository undid them.

use crate::model::calendar::{Calendar, CalendarAggregate, CalendarPayload};
use crate::model::principal::Principal;
use crate::model::resource::{Editable, ResourceId};
use crate::repo::calendar_repo::CalendarRepository;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::{editable, traced};

/// Calendar service facade.
pub struct CalendarService<R: CalendarRepository> {
    repo: R,
}

impl<R: CalendarRepository> CalendarService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists calendar summaries visible to `principal`.
    pub fn list(&self, principal: &Principal) -> ServiceResult<Vec<Editable<Calendar>>> {
        traced("calendar_list", principal, "calendars", || {
            let rows = self.repo.list_calendars(principal)?;
            Ok(rows
                .into_iter()
                .map(|row| editable(principal, row))
                .collect())
        })
    }

    /// Loads one visible calendar tree.
    pub fn read(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> ServiceResult<Editable<CalendarAggregate>> {
        traced("calendar_read", principal, &id.to_string(), || {
            let aggregate = self
                .repo
                .read_aggregate(principal, id)?
                .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
            Ok(editable(principal, aggregate))
        })
    }

    /// Creates a calendar (`id = None`) or fully replaces an existing one.
    pub fn write(
        &self,
        principal: &Principal,
        id: Option<ResourceId>,
        payload: &CalendarPayload,
    ) -> ServiceResult<Editable<CalendarAggregate>> {
        let target = id.map_or_else(|| "new".to_string(), |id| id.to_string());
        traced("calendar_write", principal, &target, || {
            let aggregate = match id {
                None => self.repo.create_aggregate(principal, payload)?,
                Some(id) => self.repo.replace_aggregate(principal, id, payload)?,
            };
            Ok(editable(principal, aggregate))
        })
    }

    /// Deletes one writable calendar with all of its children.
    pub fn delete(&self, principal: &Principal, id: ResourceId) -> ServiceResult<()> {
        traced("calendar_delete", principal, &id.to_string(), || {
            self.repo.delete_calendar(principal, id)?;
            Ok(())
        })
    }
}

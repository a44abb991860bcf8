//! Core domain logic for Worldforge.
//! This crate is the single source of truth for ownership, hierarchy and
//! aggregate invariants; transports only adapt it.

pub mod db;
pub mod draft;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use draft::{mint_draft_id, DraftCollection, DraftEntity, DraftEntry, EntityId, LocalId};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::calendar::{Calendar, CalendarAggregate, CalendarPayload};
pub use model::geography::{Geography, GeographyPatch, NewGeography, Scale};
pub use model::principal::{Principal, PrincipalId, Role};
pub use model::resource::{
    Editable, NamedResource, NewResource, ResourceId, ResourceKind, ResourcePatch,
    ValidationError, RESOURCE_TABLES,
};
pub use policy::visibility::{can_delete, can_read, can_write, list_filter, ListFilter, Ownable};
pub use repo::calendar_repo::{CalendarRepository, SqliteCalendarRepository};
pub use repo::geography_repo::{GeographyRepository, SqliteGeographyRepository};
pub use repo::resource_repo::{ResourceRepository, SqliteResourceRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::calendar_service::CalendarService;
pub use service::error::{ServiceError, ServiceResult};
pub use service::geography_service::GeographyService;
pub use service::resource_service::ResourceService;
pub use service::user_service::UserService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Principal resolution and role administration.
//!
//! # Responsibility
//! - Resolve the request principal from a user id supplied by the session
//!   layer.
//! - Let admins change roles; let the operator register users.
//!
//! # Invariants
//! - An absent, blank or unknown user id resolves to `Unauthenticated`.
//! - Only admins change roles.

use crate::model::principal::{Principal, Role};
use crate::repo::user_repo::UserRepository;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::traced;
use log::debug;

/// Principal service facade.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves the principal behind `user_id`.
    pub fn resolve_principal(&self, user_id: Option<&str>) -> ServiceResult<Principal> {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            debug!("event=principal_resolve module=service status=rejected reason=missing_id");
            return Err(ServiceError::Unauthenticated);
        };

        match self.repo.get_user(user_id)? {
            Some(principal) => Ok(principal),
            None => {
                debug!(
                    "event=principal_resolve module=service status=rejected reason=unknown_user user={user_id}"
                );
                Err(ServiceError::Unauthenticated)
            }
        }
    }

    /// Registers a new user. Operator-only; not reachable over HTTP.
    pub fn register(&self, user_id: &str, role: Role) -> ServiceResult<Principal> {
        let principal = self.repo.create_user(user_id, role)?;
        debug!(
            "event=user_register module=service status=ok user={} role={role}",
            principal.id
        );
        Ok(principal)
    }

    /// Changes a role without an acting principal. Operator-only.
    pub fn assign_role(&self, target_id: &str, role: Role) -> ServiceResult<Principal> {
        let principal = self.repo.set_role(target_id, role)?;
        debug!("event=user_assign_role module=service status=ok user={target_id} role={role}");
        Ok(principal)
    }

    /// Changes the role of `target_id` on behalf of `actor`.
    pub fn set_role(
        &self,
        actor: &Principal,
        target_id: &str,
        role: Role,
    ) -> ServiceResult<Principal> {
        traced("user_set_role", actor, target_id, || {
            if !actor.is_admin() {
                return Err(ServiceError::Forbidden(target_id.to_string()));
            }
            Ok(self.repo.set_role(target_id, role)?)
        })
    }

    /// Lists every user. Admin only.
    pub fn list(&self, actor: &Principal) -> ServiceResult<Vec<Principal>> {
        traced("user_list", actor, "users", || {
            if !actor.is_admin() {
                return Err(ServiceError::Forbidden("users".to_string()));
            }
            Ok(self.repo.list_users()?)
        })
    }
}

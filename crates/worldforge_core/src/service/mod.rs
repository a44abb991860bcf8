//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Attach caller-relative `canEdit` flags to every returned entity.
//! - Keep the HTTP layer decoupled from storage details.
//!
//! # Invariants
//! - Every operation logs one `event=... module=service` outcome line with
//!   ids only, never resource content.

use crate::model::principal::Principal;
use crate::model::resource::Editable;
use crate::policy::visibility::{can_write, Ownable};
use log::{debug, error, warn};
use std::time::Instant;

pub mod calendar_service;
pub mod error;
pub mod geography_service;
pub mod hierarchy;
pub mod resource_service;
pub mod user_service;

use error::ServiceResult;

/// Wraps `item` with the caller-relative edit flag.
pub fn editable<T: Ownable>(principal: &Principal, item: T) -> Editable<T> {
    let can_edit = can_write(principal, &item);
    Editable { item, can_edit }
}

/// Runs `op` and logs its outcome.
pub(crate) fn traced<T>(
    event: &'static str,
    principal: &Principal,
    target: &str,
    op: impl FnOnce() -> ServiceResult<T>,
) -> ServiceResult<T> {
    let started_at = Instant::now();
    let result = op();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => debug!(
            "event={event} module=service status=ok principal={} target={target} duration_ms={duration_ms}",
            principal.id
        ),
        Err(err) if err.is_internal() => error!(
            "event={event} module=service status=error principal={} target={target} duration_ms={duration_ms} error_code={} error={err}",
            principal.id,
            err.code()
        ),
        Err(err) => warn!(
            "event={event} module=service status=rejected principal={} target={target} duration_ms={duration_ms} error_code={}",
            principal.id,
            err.code()
        ),
    }
    result
}

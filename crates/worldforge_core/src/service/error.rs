//! Service error taxonomy shared by every use-case.
//!
//! # Invariants
//! - Every failure maps to exactly one stable machine code.
//! - Persisted-data and database failures surface as `Internal`.

use crate::model::resource::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Use-case level failure.
#[derive(Debug)]
pub enum ServiceError {
    /// No principal could be resolved for the request.
    Unauthenticated,
    /// Input failed validation or hierarchy rules.
    BadRequest(String),
    /// Target is absent or not visible to the caller.
    NotFound(String),
    /// Target exists but the caller may not modify it.
    Forbidden(String),
    /// Storage or consistency failure.
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "no authenticated principal"),
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Forbidden(id) => write!(f, "forbidden: {id}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for ServiceError {}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::BadRequest(value.to_string())
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => err.into(),
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Forbidden(id) => Self::Forbidden(id),
            other @ (RepoError::Db(_) | RepoError::InvalidData(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

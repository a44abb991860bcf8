//! Domain model for principals, named resources, geography and calendars.
//!
//! # Responsibility
//! - Define the canonical data structures shared by policy, repo and service.
//! - Keep wire naming (`camelCase`) next to the types that carry it.
//!
//! # Invariants
//! - Every stored entity carries an owner and an `is_free` flag.
//! - Write inputs never carry an owner; the store assigns it.

pub mod calendar;
pub mod geography;
pub mod principal;
pub mod resource;

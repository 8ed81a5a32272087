//! Domain model for geolocated issues and their tags.
//!
//! # Responsibility
//! - Define entity types and their invariant-checked mutation methods.
//! - Define the explicit `Validate` contract used at save time.
//!
//! # Invariants
//! - Entities are identified by stable UUIDs.
//! - Deletion visible to users is a soft-delete flag; hard delete is an
//!   explicit administrative operation.

pub mod geo;
pub mod issue;
pub mod tag;
pub mod validation;

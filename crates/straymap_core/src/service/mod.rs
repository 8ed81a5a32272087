//! Validated-action pipeline and use-case façades.
//!
//! # Responsibility
//! - Run single-purpose actions through read/write runners.
//! - Translate known failure signals into field-scoped errors.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Actions never commit; only `WriteRunner` triggers a save.
//! - One façade instance owns one unit of work.

pub mod action;
pub mod errors;
pub mod issue_actions;
pub mod issue_service;
pub mod requests;
pub mod runner;
pub mod tag_actions;
pub mod tag_service;

//! Data access, unit of work and query composition.
//!
//! # Responsibility
//! - Define per-entity data-access contracts (`IssueRepository`,
//!   `TagRepository`) and the commit boundary (`UnitOfWork`).
//! - Keep SQL details and change tracking inside the persistence boundary.
//!
//! # Invariants
//! - Entities are written only by `UnitOfWork::save_with_validation`.
//! - Lookup by id raises `RepoError::NotFound` instead of returning `None`.

pub mod issue_repo;
pub mod query;
pub mod tag_repo;
pub mod unit_of_work;

//! Core domain logic for straymap: geolocated issues, tags and the
//! validated-action pipeline that reads and writes them.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, LoggingConfig, LoggingError};
pub use model::geo::{GeoPoint, RangeError};
pub use model::issue::{Issue, IssueId};
pub use model::tag::{Tag, TagId};
pub use model::validation::{FieldError, Validate};
pub use repo::issue_repo::{IssueRecord, IssueRepository, IssuesPage};
pub use repo::query::SortDirection;
pub use repo::tag_repo::{TagRecord, TagRepository, TagsPage};
pub use repo::unit_of_work::{RepoError, RepoResult, SqliteUnitOfWork, UnitOfWork};
pub use service::errors::{ErrorCollector, ServiceError, ServiceResult};
pub use service::issue_service::IssuesService;
pub use service::requests::{
    AddTagToIssueRequest, GetIssuesRequest, GetTagsRequest, IssueSortBy, NewIssueRequest,
    NewTagRequest, RemoveTagFromIssueRequest, UpdateIssueRequest, UpdateTagNameRequest,
};
pub use service::tag_service::TagsService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

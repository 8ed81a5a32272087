//! Issue use-case façade.
//!
//! # Responsibility
//! - Validate request shapes, run issue actions and collect recoverable
//!   failures as field errors.
//!
//! # Invariants
//! - Recoverable failures never surface as `Err`; they land in `errors()`.
//! - The error collector is only reset by `clear_errors()`.
//! - Operations return `None` whenever they recorded errors.

use crate::model::issue::IssueId;
use crate::model::validation::{FieldError, Validate};
use crate::repo::issue_repo::{IssueRecord, IssueRepository, IssuesPage};
use crate::repo::tag_repo::TagRepository;
use crate::repo::unit_of_work::{RepoResult, SqliteUnitOfWork, UnitOfWork};
use crate::service::errors::{ErrorCollector, Recovery, ServiceResult};
use crate::service::issue_actions::{
    AddTagToIssueAction, DeleteIssueAction, GetIssueByIdAction, GetIssuesWithPaginationAction,
    NewIssueAction, RemoveTagFromIssueAction, SoftDeleteIssueAction, UpdateIssueAction,
};
use crate::service::requests::{
    AddTagToIssueRequest, GetIssuesRequest, NewIssueRequest, RemoveTagFromIssueRequest,
    UpdateIssueRequest,
};
use crate::service::runner::{ReadRunner, WriteRunner};
use rusqlite::Connection;

const LOCATION_FIELDS: &[&str] = &["latitude", "longitude"];

const GET_ISSUES: Recovery = Recovery {
    operation: "get_issues_with_pagination",
    range_fields: &["page_size", "page_number"],
    not_found: false,
    unique_tag_name: false,
};
const GET_ISSUE: Recovery = by_id("get_issue_by_id");
const NEW_ISSUE: Recovery = Recovery {
    operation: "new_issue",
    range_fields: LOCATION_FIELDS,
    not_found: false,
    unique_tag_name: false,
};
const UPDATE_ISSUE: Recovery = Recovery {
    operation: "update_issue",
    range_fields: LOCATION_FIELDS,
    not_found: true,
    unique_tag_name: false,
};
const ADD_TAG: Recovery = by_id("add_tag_to_issue");
const REMOVE_TAG: Recovery = by_id("remove_tag_from_issue");
const SOFT_DELETE_ISSUE: Recovery = by_id("soft_delete_issue");
const DELETE_ISSUE: Recovery = by_id("delete_issue");

const fn by_id(operation: &'static str) -> Recovery {
    Recovery {
        operation,
        range_fields: &[],
        not_found: true,
        unique_tag_name: false,
    }
}

/// Issue operations over one unit of work.
pub struct IssuesService<S> {
    store: S,
    errors: ErrorCollector,
}

impl<'conn> IssuesService<SqliteUnitOfWork<'conn>> {
    /// Builds the façade over a fresh unit of work on a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        Ok(Self::new(SqliteUnitOfWork::try_new(conn)?))
    }
}

impl<S> IssuesService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            errors: ErrorCollector::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn errors(&self) -> &[FieldError] {
        self.errors.errors()
    }

    pub fn has_errors(&self) -> bool {
        self.errors.has_errors()
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }
}

impl<S> IssuesService<S>
where
    S: IssueRepository + TagRepository + UnitOfWork,
{
    /// Lists active issues; `None` when the request shape is invalid.
    pub fn get_issues_with_pagination(
        &mut self,
        request: &GetIssuesRequest,
    ) -> ServiceResult<Option<IssuesPage>> {
        let invalid = request.validate();
        if !invalid.is_empty() {
            self.errors.extend(invalid);
            return Ok(None);
        }

        let mut runner = ReadRunner::new(GetIssuesWithPaginationAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        GET_ISSUES.settle(outcome, runner.errors(), &mut self.errors)
    }

    pub fn get_issue_by_id(&mut self, id: IssueId) -> ServiceResult<Option<IssueRecord>> {
        let mut runner = ReadRunner::new(GetIssueByIdAction::default());
        let outcome = runner.run(&mut self.store, id);
        GET_ISSUE.settle(outcome, runner.errors(), &mut self.errors)
    }

    /// Creates an issue and returns its id once committed.
    pub fn new_issue(&mut self, request: &NewIssueRequest) -> ServiceResult<Option<IssueId>> {
        let mut runner = WriteRunner::new(NewIssueAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        NEW_ISSUE.settle(outcome, runner.errors(), &mut self.errors)
    }

    pub fn update_issue(&mut self, request: &UpdateIssueRequest) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(UpdateIssueAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        UPDATE_ISSUE
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    pub fn add_tag_to_issue(&mut self, request: &AddTagToIssueRequest) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(AddTagToIssueAction::default());
        let outcome = runner.run(&mut self.store, *request);
        ADD_TAG
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    pub fn remove_tag_from_issue(
        &mut self,
        request: &RemoveTagFromIssueRequest,
    ) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(RemoveTagFromIssueAction::default());
        let outcome = runner.run(&mut self.store, *request);
        REMOVE_TAG
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    pub fn soft_delete_issue(&mut self, id: IssueId) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(SoftDeleteIssueAction::default());
        let outcome = runner.run(&mut self.store, id);
        SOFT_DELETE_ISSUE
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    /// Hard delete.
    pub fn delete_issue(&mut self, id: IssueId) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(DeleteIssueAction::default());
        let outcome = runner.run(&mut self.store, id);
        DELETE_ISSUE
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }
}

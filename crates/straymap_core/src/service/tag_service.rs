//! Tag use-case façade.
//!
//! # Invariants
//! - A duplicate active name (after trimming, case-insensitive) surfaces as
//!   one `name` field error, never as `Err`.
//! - The error collector is only reset by `clear_errors()`.

use crate::model::tag::TagId;
use crate::model::validation::{FieldError, Validate};
use crate::repo::tag_repo::{TagRecord, TagRepository, TagsPage};
use crate::repo::unit_of_work::{RepoResult, SqliteUnitOfWork, UnitOfWork};
use crate::service::errors::{ErrorCollector, Recovery, ServiceResult};
use crate::service::requests::{GetTagsRequest, NewTagRequest, UpdateTagNameRequest};
use crate::service::runner::{ReadRunner, WriteRunner};
use crate::service::tag_actions::{
    DeleteTagAction, GetTagByIdAction, GetTagsWithPaginationAction, NewTagAction,
    SoftDeleteTagAction, UpdateTagNameAction,
};
use rusqlite::Connection;

const GET_TAGS: Recovery = Recovery {
    operation: "get_tags_with_pagination",
    range_fields: &["page_size", "page_number"],
    not_found: false,
    unique_tag_name: false,
};
const GET_TAG: Recovery = Recovery {
    operation: "get_tag_by_id",
    range_fields: &[],
    not_found: true,
    unique_tag_name: false,
};
const NEW_TAG: Recovery = Recovery {
    operation: "new_tag",
    range_fields: &[],
    not_found: false,
    unique_tag_name: true,
};
const UPDATE_TAG_NAME: Recovery = Recovery {
    operation: "update_tag_name",
    range_fields: &[],
    not_found: true,
    unique_tag_name: true,
};
const SOFT_DELETE_TAG: Recovery = Recovery {
    operation: "soft_delete_tag",
    range_fields: &[],
    not_found: true,
    unique_tag_name: false,
};
const DELETE_TAG: Recovery = Recovery {
    operation: "delete_tag",
    range_fields: &[],
    not_found: true,
    unique_tag_name: false,
};

/// Tag operations over one unit of work.
pub struct TagsService<S> {
    store: S,
    errors: ErrorCollector,
}

impl<'conn> TagsService<SqliteUnitOfWork<'conn>> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        Ok(Self::new(SqliteUnitOfWork::try_new(conn)?))
    }
}

impl<S> TagsService<S> {
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

impl<S> TagsService<S>
where
    S: TagRepository + UnitOfWork,
{
    pub fn get_tags_with_pagination(
        &mut self,
        request: &GetTagsRequest,
    ) -> ServiceResult<Option<TagsPage>> {
        let invalid = request.validate();
        if !invalid.is_empty() {
            self.errors.extend(invalid);
            return Ok(None);
        }

        let mut runner = ReadRunner::new(GetTagsWithPaginationAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        GET_TAGS.settle(outcome, runner.errors(), &mut self.errors)
    }

    pub fn get_tag_by_id(&mut self, id: TagId) -> ServiceResult<Option<TagRecord>> {
        let mut runner = ReadRunner::new(GetTagByIdAction::default());
        let outcome = runner.run(&mut self.store, id);
        GET_TAG.settle(outcome, runner.errors(), &mut self.errors)
    }

    /// Creates a tag and returns its id once committed.
    pub fn new_tag(&mut self, request: &NewTagRequest) -> ServiceResult<Option<TagId>> {
        let mut runner = WriteRunner::new(NewTagAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        NEW_TAG.settle(outcome, runner.errors(), &mut self.errors)
    }

    pub fn update_tag_name(&mut self, request: &UpdateTagNameRequest) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(UpdateTagNameAction::default());
        let outcome = runner.run(&mut self.store, request.clone());
        UPDATE_TAG_NAME
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    pub fn soft_delete_tag(&mut self, id: TagId) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(SoftDeleteTagAction::default());
        let outcome = runner.run(&mut self.store, id);
        SOFT_DELETE_TAG
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }

    /// Hard delete.
    pub fn delete_tag(&mut self, id: TagId) -> ServiceResult<()> {
        let mut runner = WriteRunner::new(DeleteTagAction::default());
        let outcome = runner.run(&mut self.store, id);
        DELETE_TAG
            .settle(outcome, runner.errors(), &mut self.errors)
            .map(|_| ())
    }
}

//! Issue actions.
//!
//! Every action works on any store implementing the issue and tag data-access
//! contracts. Not-found failures name the request field that held the id.

use crate::model::geo::GeoPoint;
use crate::model::issue::{Issue, IssueId};
use crate::repo::issue_repo::{IssueListQuery, IssueRecord, IssueRepository, IssuesPage};
use crate::repo::query::{IssueOrder, Page, SortDirection};
use crate::repo::tag_repo::TagRepository;
use crate::service::action::{Action, ActionStatus};
use crate::service::errors::{not_found_as, ServiceResult};
use crate::service::requests::{
    AddTagToIssueRequest, GetIssuesRequest, IssueSortBy, NewIssueRequest,
    RemoveTagFromIssueRequest, UpdateIssueRequest,
};

#[derive(Debug, Default)]
pub struct GetIssuesWithPaginationAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for GetIssuesWithPaginationAction {
    type Input = GetIssuesRequest;
    type Output = IssuesPage;

    const NAME: &'static str = "get_issues_with_pagination";

    fn execute(&mut self, store: &mut S, input: GetIssuesRequest) -> ServiceResult<IssuesPage> {
        let direction = SortDirection::from_descending(input.descending);
        let query = IssueListQuery {
            page: Page::new(input.page_size, input.page_number)?,
            order: match input.sort_by {
                IssueSortBy::CreatedAt => IssueOrder::CreatedAt(direction),
                IssueSortBy::Distance => IssueOrder::Distance(direction),
            },
            current_location: input.current_location(),
            radius_meters: input.radius_meters,
        };
        Ok(store.query_issues_with_pagination(&query)?)
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Reads one issue by id, soft-deleted or not.
#[derive(Debug, Default)]
pub struct GetIssueByIdAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for GetIssueByIdAction {
    type Input = IssueId;
    type Output = IssueRecord;

    const NAME: &'static str = "get_issue_by_id";

    fn execute(&mut self, store: &mut S, id: IssueId) -> ServiceResult<IssueRecord> {
        let issue = store.get_issue_by_id(id).map_err(not_found_as("id"))?;
        Ok(IssueRecord::from(&*issue))
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

#[derive(Debug, Default)]
pub struct NewIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for NewIssueAction {
    type Input = NewIssueRequest;
    type Output = IssueId;

    const NAME: &'static str = "new_issue";

    fn execute(&mut self, store: &mut S, input: NewIssueRequest) -> ServiceResult<IssueId> {
        let location = GeoPoint::new(input.latitude, input.longitude)?;
        Ok(store.add_issue(Issue::new(input.title, input.description, location)))
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Replaces title, description and location of an issue.
#[derive(Debug, Default)]
pub struct UpdateIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for UpdateIssueAction {
    type Input = UpdateIssueRequest;
    type Output = IssueId;

    const NAME: &'static str = "update_issue";

    fn execute(&mut self, store: &mut S, input: UpdateIssueRequest) -> ServiceResult<IssueId> {
        let issue = store.get_issue_by_id(input.id).map_err(not_found_as("id"))?;
        issue.set_title(input.title);
        issue.set_location(input.latitude, input.longitude)?;
        issue.set_description(input.description);
        Ok(issue.id())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Attaches an active tag to an issue.
#[derive(Debug, Default)]
pub struct AddTagToIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository + TagRepository> Action<S> for AddTagToIssueAction {
    type Input = AddTagToIssueRequest;
    type Output = IssueId;

    const NAME: &'static str = "add_tag_to_issue";

    fn execute(&mut self, store: &mut S, input: AddTagToIssueRequest) -> ServiceResult<IssueId> {
        store
            .get_issue_by_id(input.issue_id)
            .map_err(not_found_as("issue_id"))?;
        let tag = store
            .get_tag_by_id(input.tag_id)
            .map_err(not_found_as("tag_id"))?
            .clone();

        if tag.is_soft_deleted() {
            self.status
                .add_error("tag_id", format!("tag {} is deleted", tag.id()));
            return Ok(input.issue_id);
        }

        let issue = store
            .get_issue_by_id(input.issue_id)
            .map_err(not_found_as("issue_id"))?;
        if !issue.add_tag(tag) {
            self.status.skip_persistence();
        }
        Ok(input.issue_id)
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

#[derive(Debug, Default)]
pub struct RemoveTagFromIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository + TagRepository> Action<S> for RemoveTagFromIssueAction {
    type Input = RemoveTagFromIssueRequest;
    type Output = IssueId;

    const NAME: &'static str = "remove_tag_from_issue";

    fn execute(
        &mut self,
        store: &mut S,
        input: RemoveTagFromIssueRequest,
    ) -> ServiceResult<IssueId> {
        store
            .get_issue_by_id(input.issue_id)
            .map_err(not_found_as("issue_id"))?;
        store
            .get_tag_by_id(input.tag_id)
            .map_err(not_found_as("tag_id"))?;

        let issue = store
            .get_issue_by_id(input.issue_id)
            .map_err(not_found_as("issue_id"))?;
        if !issue.remove_tag(input.tag_id) {
            self.status.skip_persistence();
        }
        Ok(input.issue_id)
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Marks an issue deleted; a second call is a no-op.
#[derive(Debug, Default)]
pub struct SoftDeleteIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for SoftDeleteIssueAction {
    type Input = IssueId;
    type Output = ();

    const NAME: &'static str = "soft_delete_issue";

    fn execute(&mut self, store: &mut S, id: IssueId) -> ServiceResult<()> {
        let issue = store.get_issue_by_id(id).map_err(not_found_as("id"))?;
        if issue.is_soft_deleted() {
            self.status.skip_persistence();
        } else {
            issue.soft_delete();
        }
        Ok(())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Removes an issue and its tag links permanently.
#[derive(Debug, Default)]
pub struct DeleteIssueAction {
    status: ActionStatus,
}

impl<S: IssueRepository> Action<S> for DeleteIssueAction {
    type Input = IssueId;
    type Output = ();

    const NAME: &'static str = "delete_issue";

    fn execute(&mut self, store: &mut S, id: IssueId) -> ServiceResult<()> {
        store.get_issue_by_id(id).map_err(not_found_as("id"))?;
        store.remove_issue(id).map_err(not_found_as("id"))?;
        Ok(())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

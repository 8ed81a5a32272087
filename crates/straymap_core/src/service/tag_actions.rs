//! Tag actions.

use crate::model::tag::{Tag, TagId};
use crate::repo::query::{Page, SortDirection};
use crate::repo::tag_repo::{TagListQuery, TagRecord, TagRepository, TagsPage};
use crate::service::action::{Action, ActionStatus};
use crate::service::errors::{not_found_as, ServiceResult};
use crate::service::requests::{GetTagsRequest, NewTagRequest, UpdateTagNameRequest};

#[derive(Debug, Default)]
pub struct GetTagsWithPaginationAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for GetTagsWithPaginationAction {
    type Input = GetTagsRequest;
    type Output = TagsPage;

    const NAME: &'static str = "get_tags_with_pagination";

    fn execute(&mut self, store: &mut S, input: GetTagsRequest) -> ServiceResult<TagsPage> {
        let query = TagListQuery {
            page: Page::new(input.page_size, input.page_number)?,
            name_search: input.name_search,
            direction: SortDirection::from_descending(input.descending),
        };
        Ok(store.query_tags_with_pagination(&query)?)
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Reads one tag by id, soft-deleted or not.
#[derive(Debug, Default)]
pub struct GetTagByIdAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for GetTagByIdAction {
    type Input = TagId;
    type Output = TagRecord;

    const NAME: &'static str = "get_tag_by_id";

    fn execute(&mut self, store: &mut S, id: TagId) -> ServiceResult<TagRecord> {
        let tag = store.get_tag_by_id(id).map_err(not_found_as("id"))?;
        Ok(TagRecord::from(&*tag))
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Stages a new tag; name uniqueness is enforced by the store at commit.
#[derive(Debug, Default)]
pub struct NewTagAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for NewTagAction {
    type Input = NewTagRequest;
    type Output = TagId;

    const NAME: &'static str = "new_tag";

    fn execute(&mut self, store: &mut S, input: NewTagRequest) -> ServiceResult<TagId> {
        Ok(store.add_tag(Tag::new(input.name)))
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

#[derive(Debug, Default)]
pub struct UpdateTagNameAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for UpdateTagNameAction {
    type Input = UpdateTagNameRequest;
    type Output = TagId;

    const NAME: &'static str = "update_tag_name";

    fn execute(&mut self, store: &mut S, input: UpdateTagNameRequest) -> ServiceResult<TagId> {
        let tag = store.get_tag_by_id(input.id).map_err(not_found_as("id"))?;
        tag.set_name(input.name);
        Ok(tag.id())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Marks a tag deleted; a second call is a no-op.
#[derive(Debug, Default)]
pub struct SoftDeleteTagAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for SoftDeleteTagAction {
    type Input = TagId;
    type Output = ();

    const NAME: &'static str = "soft_delete_tag";

    fn execute(&mut self, store: &mut S, id: TagId) -> ServiceResult<()> {
        let tag = store.get_tag_by_id(id).map_err(not_found_as("id"))?;
        if tag.is_soft_deleted() {
            self.status.skip_persistence();
        } else {
            tag.soft_delete();
        }
        Ok(())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

/// Removes a tag permanently; its issue links go with it.
#[derive(Debug, Default)]
pub struct DeleteTagAction {
    status: ActionStatus,
}

impl<S: TagRepository> Action<S> for DeleteTagAction {
    type Input = TagId;
    type Output = ();

    const NAME: &'static str = "delete_tag";

    fn execute(&mut self, store: &mut S, id: TagId) -> ServiceResult<()> {
        store.get_tag_by_id(id).map_err(not_found_as("id"))?;
        store.remove_tag(id).map_err(not_found_as("id"))?;
        Ok(())
    }

    fn status(&self) -> &ActionStatus {
        &self.status
    }
}

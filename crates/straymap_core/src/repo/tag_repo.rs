//! Tag data access over the unit of work.
//!
//! # Invariants
//! - Lookup by id bypasses soft-delete filtering.
//! - Listing excludes soft-deleted tags; the name filter is case-insensitive.

use crate::model::tag::{Tag, TagId};
use crate::repo::query::{Page, SortDirection, TagQuery};
use crate::repo::unit_of_work::{parse_bool, parse_uuid, RepoError, RepoResult, SqliteUnitOfWork};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub id: TagId,
    pub name: String,
    pub soft_deleted: bool,
}

impl From<&Tag> for TagRecord {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id(),
            name: tag.name().to_string(),
            soft_deleted: tag.is_soft_deleted(),
        }
    }
}

/// One page of tags plus the total number of active tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagsPage {
    pub items: Vec<TagRecord>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagListQuery {
    pub page: Page,
    pub name_search: Option<String>,
    pub direction: SortDirection,
}

impl TagListQuery {
    pub fn compose(&self) -> TagQuery {
        let mut query = TagQuery::active();
        if let Some(fragment) = self.name_search.as_deref() {
            query = query.name_contains(fragment);
        }
        query.order_by_name(self.direction).page(self.page)
    }
}

/// Data-access contract for tags.
pub trait TagRepository {
    fn get_tag_by_id(&mut self, id: TagId) -> RepoResult<&mut Tag>;
    fn add_tag(&mut self, tag: Tag) -> TagId;
    fn remove_tag(&mut self, id: TagId) -> RepoResult<()>;
    fn query_tags_with_pagination(&self, query: &TagListQuery) -> RepoResult<TagsPage>;
}

impl TagRepository for SqliteUnitOfWork<'_> {
    fn get_tag_by_id(&mut self, id: TagId) -> RepoResult<&mut Tag> {
        let not_found = || RepoError::NotFound { entity: "tag", id };
        if self.tags.is_removed(id) {
            return Err(not_found());
        }
        if !self.tags.is_tracked(id) {
            let tag = load_tag(self.conn, id)?.ok_or_else(not_found)?;
            self.tags.attach(tag);
        }
        self.tags.current_mut(id).ok_or_else(not_found)
    }

    fn add_tag(&mut self, tag: Tag) -> TagId {
        self.tags.add(tag)
    }

    fn remove_tag(&mut self, id: TagId) -> RepoResult<()> {
        if self.tags.remove(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound { entity: "tag", id })
        }
    }

    fn query_tags_with_pagination(&self, query: &TagListQuery) -> RepoResult<TagsPage> {
        let (sql, binds) = query.compose().to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            items.push(TagRecord {
                id: parse_uuid(&id_text, "tags.id")?,
                name: row.get("name")?,
                soft_deleted: parse_bool(row.get("is_deleted")?, "tags.is_deleted")?,
            });
        }

        let total: i64 = self
            .conn
            .query_row(TagQuery::count_sql(), [], |row| row.get(0))?;

        Ok(TagsPage {
            items,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}

fn load_tag(conn: &Connection, id: TagId) -> RepoResult<Option<Tag>> {
    let row = conn
        .query_row(
            "SELECT name, is_deleted FROM tags WHERE id = ?1;",
            [id.to_string()],
            |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
        )
        .optional()?;

    match row {
        Some((name, is_deleted)) => Ok(Some(Tag::restore_from_parts(
            id,
            name,
            parse_bool(is_deleted, "tags.is_deleted")?,
        ))),
        None => Ok(None),
    }
}

//! Issue data access over the unit of work.
//!
//! # Responsibility
//! - Resolve issues by id into the unit of work's identity map.
//! - Stage issue additions and removals for the next save.
//! - Execute composed listing queries and project rows to `IssueRecord`.
//!
//! # Invariants
//! - Lookup by id bypasses soft-delete filtering.
//! - Listing excludes soft-deleted issues and soft-deleted tags.
//! - Filter, ordering and displayed distance share one reference point.

use crate::model::geo::GeoPoint;
use crate::model::issue::{Issue, IssueId};
use crate::model::tag::Tag;
use crate::repo::query::{IssueOrder, IssueQuery, Page, SpatialQuery};
use crate::repo::tag_repo::TagRecord;
use crate::repo::unit_of_work::{parse_bool, parse_uuid, RepoError, RepoResult, SqliteUnitOfWork};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

/// Transport projection of one issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueRecord {
    pub id: IssueId,
    pub soft_deleted: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Metres from the listing's reference point; `None` outside listings
    /// that asked for a location or distance ordering.
    pub distance_meters: Option<f64>,
    /// Active tags in attachment order.
    pub tags: Vec<TagRecord>,
}

impl From<&Issue> for IssueRecord {
    fn from(issue: &Issue) -> Self {
        let location = issue.location();
        Self {
            id: issue.id(),
            soft_deleted: issue.is_soft_deleted(),
            created_at: issue.created_at(),
            title: issue.title().to_string(),
            description: issue.description().to_string(),
            latitude: location.latitude(),
            longitude: location.longitude(),
            distance_meters: None,
            tags: issue
                .tags()
                .iter()
                .filter(|tag| !tag.is_soft_deleted())
                .map(TagRecord::from)
                .collect(),
        }
    }
}

/// One page of issues plus the total number of active issues.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuesPage {
    pub items: Vec<IssueRecord>,
    pub total_count: u64,
}

/// Resolved listing options for issues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssueListQuery {
    pub page: Page,
    pub order: IssueOrder,
    pub current_location: Option<GeoPoint>,
    pub radius_meters: Option<f64>,
}

impl IssueListQuery {
    /// Point used for the radius filter, distance ordering and projection.
    pub fn reference_point(&self) -> GeoPoint {
        self.current_location.unwrap_or(GeoPoint::ORIGIN)
    }

    /// Composes the lazy query: filter, ordering, projection, paging.
    pub fn compose(&self) -> IssueQuery {
        let reference = self.reference_point();
        let mut query = IssueQuery::active();

        if let Some(radius_meters) = self.radius_meters {
            query = query.filter_within_radius(reference, radius_meters);
        }

        query = match self.order {
            IssueOrder::CreatedAt(direction) => query.order_by_created_at(direction),
            IssueOrder::Distance(direction) => query.order_by_distance(reference, direction),
        };

        if self.current_location.is_some() || matches!(self.order, IssueOrder::Distance(_)) {
            query = query.project_distance_from(reference);
        }

        query.page(self.page)
    }
}

/// Data-access contract for issues.
pub trait IssueRepository {
    /// Loads (or returns the tracked) issue, including soft-deleted ones.
    fn get_issue_by_id(&mut self, id: IssueId) -> RepoResult<&mut Issue>;
    /// Stages a new issue for insertion.
    fn add_issue(&mut self, issue: Issue) -> IssueId;
    /// Stages a tracked issue for hard deletion.
    fn remove_issue(&mut self, id: IssueId) -> RepoResult<()>;
    /// Runs one page query plus the separate total count.
    fn query_issues_with_pagination(&self, query: &IssueListQuery) -> RepoResult<IssuesPage>;
}

impl IssueRepository for SqliteUnitOfWork<'_> {
    fn get_issue_by_id(&mut self, id: IssueId) -> RepoResult<&mut Issue> {
        let not_found = || RepoError::NotFound { entity: "issue", id };
        if self.issues.is_removed(id) {
            return Err(not_found());
        }
        if !self.issues.is_tracked(id) {
            let issue = load_issue(self.conn, id)?.ok_or_else(not_found)?;
            self.issues.attach(issue);
        }
        self.issues.current_mut(id).ok_or_else(not_found)
    }

    fn add_issue(&mut self, issue: Issue) -> IssueId {
        self.issues.add(issue)
    }

    fn remove_issue(&mut self, id: IssueId) -> RepoResult<()> {
        if self.issues.remove(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound { entity: "issue", id })
        }
    }

    fn query_issues_with_pagination(&self, query: &IssueListQuery) -> RepoResult<IssuesPage> {
        let (sql, binds) = query.compose().to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = parse_issue_record(row)?;
            record.tags = load_active_tag_records(self.conn, record.id)?;
            items.push(record);
        }

        let total: i64 = self
            .conn
            .query_row(IssueQuery::count_sql(), [], |row| row.get(0))?;

        Ok(IssuesPage {
            items,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }
}

fn load_issue(conn: &Connection, id: IssueId) -> RepoResult<Option<Issue>> {
    let row = conn
        .query_row(
            "SELECT id, created_at, title, description, latitude, longitude, is_deleted
             FROM issues
             WHERE id = ?1;",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, i64>("created_at")?,
                    row.get::<_, String>("title")?,
                    row.get::<_, String>("description")?,
                    row.get::<_, f64>("latitude")?,
                    row.get::<_, f64>("longitude")?,
                    row.get::<_, i64>("is_deleted")?,
                ))
            },
        )
        .optional()?;

    let Some((created_at, title, description, latitude, longitude, is_deleted)) = row else {
        return Ok(None);
    };
    let location = GeoPoint::new(latitude, longitude)
        .map_err(|err| RepoError::InvalidData(format!("issues.location: {err}")))?;
    let tags = load_linked_tags(conn, id)?;

    Ok(Some(Issue::restore_from_parts(
        id,
        created_at,
        title,
        description,
        location,
        parse_bool(is_deleted, "issues.is_deleted")?,
        tags,
    )))
}

/// Loads every linked tag, soft-deleted ones included, in attachment order.
fn load_linked_tags(conn: &Connection, issue_id: IssueId) -> RepoResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.is_deleted
         FROM issue_tags it
         INNER JOIN tags t ON t.id = it.tag_id
         WHERE it.issue_id = ?1
         ORDER BY it.position ASC;",
    )?;
    let mut rows = stmt.query([issue_id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        tags.push(Tag::restore_from_parts(
            parse_uuid(&id_text, "tags.id")?,
            row.get("name")?,
            parse_bool(row.get("is_deleted")?, "tags.is_deleted")?,
        ));
    }
    Ok(tags)
}

fn load_active_tag_records(conn: &Connection, issue_id: IssueId) -> RepoResult<Vec<TagRecord>> {
    Ok(load_linked_tags(conn, issue_id)?
        .iter()
        .filter(|tag| !tag.is_soft_deleted())
        .map(TagRecord::from)
        .collect())
}

fn parse_issue_record(row: &Row<'_>) -> RepoResult<IssueRecord> {
    let id_text: String = row.get("id")?;
    Ok(IssueRecord {
        id: parse_uuid(&id_text, "issues.id")?,
        soft_deleted: parse_bool(row.get("is_deleted")?, "issues.is_deleted")?,
        created_at: row.get("created_at")?,
        title: row.get("title")?,
        description: row.get("description")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        distance_meters: row.get("distance_m")?,
        tags: Vec::new(),
    })
}

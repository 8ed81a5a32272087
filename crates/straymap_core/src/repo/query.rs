//! Lazy SQL query composition for issue and tag listings.
//!
//! # Responsibility
//! - Build listing queries stage by stage without touching the database.
//! - Render each query into one SQL string plus ordered bind values.
//!
//! # Invariants
//! - Stages always render in the order filter -> ordering -> projection ->
//!   pagination, whatever order the builder methods were called in.
//! - Only active (`is_deleted = 0`) rows are listed.
//! - Every ordering ends with `id ASC` so pages are deterministic.
//! - Distance semantics are the ones of `geo_distance_m`: great-circle metres.

use crate::db::GEO_DISTANCE_FN;
use crate::model::geo::{GeoPoint, RangeError};
use crate::model::tag::name_key;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

/// Validated one-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    size: u32,
    number: u32,
    offset: i64,
}

impl Page {
    /// Checks page bounds before any query runs; values are never clamped.
    pub fn new(size: i64, number: i64) -> Result<Self, RangeError> {
        if size <= 0 {
            return Err(RangeError::new(
                "page_size",
                "page size must be greater than 0",
            ));
        }
        if number <= 0 {
            return Err(RangeError::new(
                "page_number",
                "page number must be greater than 0",
            ));
        }
        let size = u32::try_from(size).map_err(|_| {
            RangeError::new(
                "page_size",
                format!("page size must not be greater than {}", u32::MAX),
            )
        })?;
        let number = u32::try_from(number).map_err(|_| {
            RangeError::new(
                "page_number",
                format!("page number must not be greater than {}", u32::MAX),
            )
        })?;
        let offset = i64::try_from(u64::from(size) * u64::from(number - 1)).map_err(|_| {
            RangeError::new("page_number", "page number is too large for page size")
        })?;
        Ok(Self {
            size,
            number,
            offset,
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Issue ordering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOrder {
    CreatedAt(SortDirection),
    Distance(SortDirection),
}

/// Storage capability for geodesic predicates.
///
/// Implementations must keep the semantics of `GeoPoint::distance_meters`.
pub trait SpatialQuery: Sized {
    /// Keeps only rows within `radius_meters` of `center` (inclusive).
    fn filter_within_radius(self, center: GeoPoint, radius_meters: f64) -> Self;
    /// Orders rows by distance from `reference`.
    fn order_by_distance(self, reference: GeoPoint, direction: SortDirection) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum IssueOrderClause {
    CreatedAt(SortDirection),
    Distance(GeoPoint, SortDirection),
}

/// Lazily composed listing query over `issues`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueQuery {
    within: Option<(GeoPoint, f64)>,
    order: Option<IssueOrderClause>,
    distance_from: Option<GeoPoint>,
    page: Option<Page>,
}

impl IssueQuery {
    /// Starts a query over all active issues.
    pub fn active() -> Self {
        Self::default()
    }

    pub fn order_by_created_at(mut self, direction: SortDirection) -> Self {
        self.order = Some(IssueOrderClause::CreatedAt(direction));
        self
    }

    /// Adds a `distance_m` column measured from `reference`.
    pub fn project_distance_from(mut self, reference: GeoPoint) -> Self {
        self.distance_from = Some(reference);
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Renders the query; bind values follow placeholder order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut binds = Vec::new();

        let distance_column = match self.distance_from {
            Some(reference) => {
                push_point(&mut binds, reference);
                distance_expr()
            }
            None => "NULL".to_string(),
        };
        let mut sql = format!(
            "SELECT
                i.id,
                i.created_at,
                i.title,
                i.description,
                i.latitude,
                i.longitude,
                i.is_deleted,
                {distance_column} AS distance_m
             FROM issues i
             WHERE i.is_deleted = 0"
        );

        if let Some((center, radius_meters)) = self.within {
            sql.push_str(&format!(" AND {} <= ?", distance_expr()));
            push_point(&mut binds, center);
            binds.push(Value::Real(radius_meters));
        }

        match self.order {
            Some(IssueOrderClause::CreatedAt(direction)) => {
                sql.push_str(&format!(
                    " ORDER BY i.created_at {}, i.id ASC",
                    direction.sql()
                ));
            }
            Some(IssueOrderClause::Distance(reference, direction)) => {
                sql.push_str(&format!(
                    " ORDER BY {} {}, i.id ASC",
                    distance_expr(),
                    direction.sql()
                ));
                push_point(&mut binds, reference);
            }
            None => sql.push_str(" ORDER BY i.id ASC"),
        }

        push_page(&mut sql, &mut binds, self.page);
        (sql, binds)
    }

    /// Total of active issues, unaffected by radius or paging.
    pub fn count_sql() -> &'static str {
        "SELECT COUNT(*) FROM issues WHERE is_deleted = 0;"
    }
}

impl SpatialQuery for IssueQuery {
    fn filter_within_radius(mut self, center: GeoPoint, radius_meters: f64) -> Self {
        self.within = Some((center, radius_meters));
        self
    }

    fn order_by_distance(mut self, reference: GeoPoint, direction: SortDirection) -> Self {
        self.order = Some(IssueOrderClause::Distance(reference, direction));
        self
    }
}

/// Lazily composed listing query over `tags`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagQuery {
    name_contains: Option<String>,
    direction: SortDirection,
    page: Option<Page>,
}

impl TagQuery {
    pub fn active() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match on the folded `name_key`; blank
    /// input is ignored.
    pub fn name_contains(mut self, fragment: &str) -> Self {
        let fragment = fragment.trim();
        self.name_contains = if fragment.is_empty() {
            None
        } else {
            Some(name_key(fragment))
        };
        self
    }

    pub fn order_by_name(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut binds = Vec::new();
        let mut sql = String::from(
            "SELECT id, name, is_deleted
             FROM tags
             WHERE is_deleted = 0",
        );

        if let Some(fragment) = self.name_contains.as_ref() {
            sql.push_str(" AND name_key LIKE ? ESCAPE '\\'");
            binds.push(Value::Text(format!("%{}%", escape_like(fragment))));
        }

        sql.push_str(&format!(
            " ORDER BY name_key {}, id ASC",
            self.direction.sql()
        ));
        push_page(&mut sql, &mut binds, self.page);
        (sql, binds)
    }

    pub fn count_sql() -> &'static str {
        "SELECT COUNT(*) FROM tags WHERE is_deleted = 0;"
    }
}

fn distance_expr() -> String {
    format!("{GEO_DISTANCE_FN}(i.latitude, i.longitude, ?, ?)")
}

fn push_point(binds: &mut Vec<Value>, point: GeoPoint) {
    binds.push(Value::Real(point.latitude()));
    binds.push(Value::Real(point.longitude()));
}

fn push_page(sql: &mut String, binds: &mut Vec<Value>, page: Option<Page>) {
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        binds.push(Value::Integer(i64::from(page.size())));
        binds.push(Value::Integer(page.offset()));
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{escape_like, IssueQuery, Page, SortDirection, SpatialQuery, TagQuery};
    use crate::model::geo::GeoPoint;
    use rusqlite::types::Value;

    #[test]
    fn page_rejects_non_positive_values_with_field_names() {
        assert_eq!(Page::new(0, 1).unwrap_err().field, "page_size");
        assert_eq!(Page::new(-3, 1).unwrap_err().field, "page_size");
        assert_eq!(Page::new(5, 0).unwrap_err().field, "page_number");
    }

    #[test]
    fn page_offset_is_one_based() {
        let page = Page::new(5, 3).unwrap();
        assert_eq!(page.offset(), 10);
        assert_eq!(Page::new(5, 1).unwrap().offset(), 0);
    }

    #[test]
    fn stages_render_in_fixed_order_regardless_of_call_order() {
        let here = GeoPoint::new(10.0, 20.0).unwrap();
        let page = Page::new(5, 2).unwrap();

        let a = IssueQuery::active()
            .page(page)
            .order_by_distance(here, SortDirection::Descending)
            .project_distance_from(here)
            .filter_within_radius(here, 1000.0);
        let b = IssueQuery::active()
            .filter_within_radius(here, 1000.0)
            .order_by_distance(here, SortDirection::Descending)
            .project_distance_from(here)
            .page(page);

        assert_eq!(a.to_sql(), b.to_sql());

        let (sql, binds) = a.to_sql();
        let where_at = sql.find("WHERE").unwrap();
        let order_at = sql.find("ORDER BY").unwrap();
        let limit_at = sql.find("LIMIT").unwrap();
        assert!(where_at < order_at && order_at < limit_at);
        assert_eq!(sql.matches('?').count(), binds.len());
        assert_eq!(binds.last(), Some(&Value::Integer(5)));
    }

    #[test]
    fn created_at_order_without_projection_binds_only_paging() {
        let (sql, binds) = IssueQuery::active()
            .order_by_created_at(SortDirection::Ascending)
            .page(Page::new(10, 1).unwrap())
            .to_sql();
        assert!(sql.contains("NULL AS distance_m"));
        assert!(sql.contains("ORDER BY i.created_at ASC, i.id ASC"));
        assert_eq!(binds, vec![Value::Integer(10), Value::Integer(0)]);
    }

    #[test]
    fn tag_name_filter_escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        let (sql, binds) = TagQuery::active().name_contains("  CA_t ").to_sql();
        assert!(sql.contains("name_key LIKE ? ESCAPE"));
        assert_eq!(binds, vec![Value::Text("%ca\\_t%".to_string())]);

        let (_, binds) = TagQuery::active().name_contains("КІТ").to_sql();
        assert_eq!(binds, vec![Value::Text("%кіт%".to_string())]);
    }

    #[test]
    fn blank_tag_name_filter_is_ignored() {
        let (sql, binds) = TagQuery::active().name_contains("   ").to_sql();
        assert!(!sql.contains("LIKE"));
        assert!(binds.is_empty());
    }
}

//! Request shapes accepted by the service façades.
//!
//! Listing requests validate their own shape before any runner is built.
//! Write requests carry raw values; entity invariants are checked at save
//! time and coordinate ranges by the domain setters.

use crate::model::geo::GeoPoint;
use crate::model::issue::IssueId;
use crate::model::tag::TagId;
use crate::model::validation::{FieldError, Validate};
use serde::{Deserialize, Serialize};

/// Upper bound for `GetIssuesRequest::page_size`.
pub const ISSUES_PAGE_SIZE_MAX: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIssueRequest {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Full replacement of an issue's editable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    pub id: IssueId,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTagToIssueRequest {
    pub issue_id: IssueId,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveTagFromIssueRequest {
    pub issue_id: IssueId,
    pub tag_id: TagId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSortBy {
    CreatedAt,
    #[default]
    Distance,
}

/// Issue listing options.
///
/// Defaults: 10 per page, first page, nearest first from the origin, no
/// radius filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetIssuesRequest {
    pub page_size: i64,
    /// One-based.
    pub page_number: i64,
    pub sort_by: IssueSortBy,
    pub descending: bool,
    pub current_latitude: Option<f64>,
    pub current_longitude: Option<f64>,
    /// No radius filter when `None`.
    pub radius_meters: Option<f64>,
}

impl Default for GetIssuesRequest {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_number: 1,
            sort_by: IssueSortBy::default(),
            descending: false,
            current_latitude: None,
            current_longitude: None,
            radius_meters: None,
        }
    }
}

impl GetIssuesRequest {
    /// Current location when both coordinates are given and in range.
    pub fn current_location(&self) -> Option<GeoPoint> {
        match (self.current_latitude, self.current_longitude) {
            (Some(latitude), Some(longitude)) => GeoPoint::new(latitude, longitude).ok(),
            _ => None,
        }
    }
}

impl Validate for GetIssuesRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_page(&mut errors, self.page_size, self.page_number);
        if self.page_size > ISSUES_PAGE_SIZE_MAX {
            errors.push(FieldError::new(
                "page_size",
                format!("page size must not be greater than {ISSUES_PAGE_SIZE_MAX}"),
            ));
        }

        if let Some(radius_meters) = self.radius_meters {
            if !(radius_meters.is_finite() && radius_meters > 0.0) {
                errors.push(FieldError::new(
                    "radius_meters",
                    "radius must be a positive number of meters",
                ));
            }
        }

        match (self.current_latitude, self.current_longitude) {
            (Some(latitude), Some(longitude)) => {
                if let Err(err) = GeoPoint::new(latitude, 0.0) {
                    errors.push(FieldError::new("current_latitude", err.message));
                }
                if let Err(err) = GeoPoint::new(0.0, longitude) {
                    errors.push(FieldError::new("current_longitude", err.message));
                }
            }
            (Some(_), None) => errors.push(FieldError::new(
                "current_longitude",
                "current longitude must be provided with current latitude",
            )),
            (None, Some(_)) => errors.push(FieldError::new(
                "current_latitude",
                "current latitude must be provided with current longitude",
            )),
            (None, None) => {}
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTagRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTagNameRequest {
    pub id: TagId,
    pub name: String,
}

/// Tag listing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetTagsRequest {
    pub page_size: i64,
    /// One-based.
    pub page_number: i64,
    /// Case-insensitive substring of the tag name; blank means no filter.
    pub name_search: Option<String>,
    pub descending: bool,
}

impl Default for GetTagsRequest {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page_number: 1,
            name_search: None,
            descending: false,
        }
    }
}

impl Validate for GetTagsRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_page(&mut errors, self.page_size, self.page_number);
        errors
    }
}

fn check_page(errors: &mut Vec<FieldError>, page_size: i64, page_number: i64) {
    if page_size <= 0 {
        errors.push(FieldError::new(
            "page_size",
            "page size must be greater than 0",
        ));
    }
    if page_number <= 0 {
        errors.push(FieldError::new(
            "page_number",
            "page number must be greater than 0",
        ));
    }
}

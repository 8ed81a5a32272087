//! Issue domain model.
//!
//! # Responsibility
//! - Define the geolocated report record and its mutation methods.
//! - Provide soft-delete lifecycle helpers.
//!
//! # Invariants
//! - `created_at` is set once at construction and never changes.
//! - `title` and `description` are always stored trimmed.
//! - `location` is always within coordinate bounds; `set_location` fails
//!   instead of storing an invalid point.
//! - `tags` never holds two entries with the same tag id.

use crate::model::geo::{GeoPoint, RangeError};
use crate::model::tag::{Tag, TagId};
use crate::model::validation::{check_text, FieldError, Validate};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier of one issue.
pub type IssueId = Uuid;

pub const ISSUE_TITLE_MAX_CHARS: usize = 250;
pub const ISSUE_DESCRIPTION_MAX_CHARS: usize = 2500;

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    id: IssueId,
    /// Unix epoch milliseconds.
    created_at: i64,
    title: String,
    description: String,
    location: GeoPoint,
    soft_deleted: bool,
    tags: Vec<Tag>,
}

impl Issue {
    /// Creates a new active issue stamped with the current time.
    ///
    /// Title and description are trimmed but not validated; invariants are
    /// checked by `Validate` when the unit of work is saved.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        location: GeoPoint,
    ) -> Self {
        let mut issue = Self::restore_from_parts(
            Uuid::new_v4(),
            now_epoch_ms(),
            String::new(),
            String::new(),
            location,
            false,
            Vec::new(),
        );
        issue.set_title(title);
        issue.set_description(description);
        issue
    }

    pub(crate) fn restore_from_parts(
        id: IssueId,
        created_at: i64,
        title: String,
        description: String,
        location: GeoPoint,
        soft_deleted: bool,
        tags: Vec<Tag>,
    ) -> Self {
        Self {
            id,
            created_at,
            title,
            description,
            location,
            soft_deleted,
            tags,
        }
    }

    pub fn id(&self) -> IssueId {
        self.id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn location(&self) -> GeoPoint {
        self.location
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.soft_deleted
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into().trim().to_string();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into().trim().to_string();
    }

    /// Moves the issue, leaving it untouched when either coordinate is invalid.
    pub fn set_location(&mut self, latitude: f64, longitude: f64) -> Result<(), RangeError> {
        self.location = GeoPoint::new(latitude, longitude)?;
        Ok(())
    }

    pub fn soft_delete(&mut self) {
        self.soft_deleted = true;
    }

    pub fn restore(&mut self) {
        self.soft_deleted = false;
    }

    /// Attaches `tag`; returns `false` when a tag with the same id is present.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(tag.id()) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    /// Detaches the tag with `tag_id`; returns `false` when it was not attached.
    pub fn remove_tag(&mut self, tag_id: TagId) -> bool {
        let before = self.tags.len();
        self.tags.retain(|tag| tag.id() != tag_id);
        self.tags.len() != before
    }

    pub fn has_tag(&self, tag_id: TagId) -> bool {
        self.tags.iter().any(|tag| tag.id() == tag_id)
    }
}

impl Validate for Issue {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "title", &self.title, true, ISSUE_TITLE_MAX_CHARS);
        check_text(
            &mut errors,
            "description",
            &self.description,
            false,
            ISSUE_DESCRIPTION_MAX_CHARS,
        );
        errors
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

//! Tag domain model.
//!
//! # Invariants
//! - `name` is stored trimmed; it must be non-empty and at most
//!   `TAG_NAME_MAX_CHARS` characters.
//! - Name uniqueness among active tags is enforced by the store, not here.

use crate::model::validation::{check_text, FieldError, Validate};
use uuid::Uuid;

pub type TagId = Uuid;

pub const TAG_NAME_MAX_CHARS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    id: TagId,
    name: String,
    soft_deleted: bool,
}

impl Tag {
    /// Creates a new active tag with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::restore_from_parts(Uuid::new_v4(), name.into().trim().to_string(), false)
    }

    /// Rebuilds a tag from persisted state without re-normalizing it.
    pub(crate) fn restore_from_parts(id: TagId, name: String, soft_deleted: bool) -> Self {
        Self {
            id,
            name,
            soft_deleted,
        }
    }

    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-folded name used for uniqueness and search.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into().trim().to_string();
    }

    pub fn is_soft_deleted(&self) -> bool {
        self.soft_deleted
    }

    pub fn soft_delete(&mut self) {
        self.soft_deleted = true;
    }

    pub fn restore(&mut self) {
        self.soft_deleted = false;
    }
}

/// Unicode lowercase of the trimmed name; two names clash when keys match.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Validate for Tag {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_text(&mut errors, "name", &self.name, true, TAG_NAME_MAX_CHARS);
        errors
    }
}

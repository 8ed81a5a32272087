//! Field-scoped validation primitives.
//!
//! # Responsibility
//! - Define the `(field, message)` error shape shared by every layer.
//! - Define the `Validate` contract used for entities and request shapes.
//!
//! # Invariants
//! - Field names are snake_case and stable; callers build error maps on them.
//! - `validate()` never mutates and never short-circuits: it reports every
//!   failing rule.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// One validation failure tagged with the offending field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Explicit invariant check for one entity kind or request shape.
pub trait Validate {
    /// Returns every failing rule; an empty vector means valid.
    fn validate(&self) -> Vec<FieldError>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Pushes the standard "required"/"max length" errors for one text field.
pub(crate) fn check_text(
    errors: &mut Vec<FieldError>,
    field: &str,
    value: &str,
    required: bool,
    max_chars: usize,
) {
    if required && value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{field} must be filled")));
    }
    if value.chars().count() > max_chars {
        errors.push(FieldError::new(
            field,
            format!("{field} length must not exceed {max_chars} characters"),
        ));
    }
}

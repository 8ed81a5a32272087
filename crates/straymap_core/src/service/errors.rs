//! Service error taxonomy, error collector and façade recovery policy.
//!
//! # Responsibility
//! - Define `ServiceError`, the single failure signal of actions and runners.
//! - Accumulate recoverable failures as field-scoped `FieldError`s.
//! - Decide per operation which failures are recoverable and which are fatal.
//!
//! # Invariants
//! - `ErrorCollector::has_errors()` is `true` iff `errors()` is non-empty.
//! - A recovered failure adds exactly one field error.
//! - Fatal failures are returned unchanged.

use crate::model::geo::RangeError;
use crate::model::validation::FieldError;
use crate::repo::unit_of_work::{ConstraintKind, ConstraintViolation, RepoError};
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Constraint identities SQLite reports for the active tag-name index.
const TAG_NAME_UNIQUE_IDENTITIES: [&str; 2] =
    ["tags.name_key", "index 'ux_tags_name_key_active'"];

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure signal raised by actions, runners and data access.
#[derive(Debug)]
pub enum ServiceError {
    /// Identifier does not resolve; `field` names the request field.
    NotFound {
        field: &'static str,
        entity: &'static str,
        id: Uuid,
    },
    /// Argument outside its accepted range.
    Range(RangeError),
    /// Commit rejected by a store constraint.
    Constraint(ConstraintViolation),
    /// Any other persistence failure.
    Repo(RepoError),
}

impl ServiceError {
    /// Renames the field of a not-found failure; other variants pass through.
    pub fn with_not_found_field(self, field: &'static str) -> Self {
        match self {
            Self::NotFound { entity, id, .. } => Self::NotFound { field, entity, id },
            other => other,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id, .. } => write!(f, "there is no {entity} with id {id}"),
            Self::Range(err) => write!(f, "{err}"),
            Self::Constraint(violation) => write!(f, "{violation}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Range(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound { .. } | Self::Constraint(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound {
                field: "id",
                entity,
                id,
            },
            RepoError::Constraint(violation) => Self::Constraint(violation),
            other => Self::Repo(other),
        }
    }
}

/// Maps a data-access failure, naming `field` when the id did not resolve.
pub(crate) fn not_found_as(field: &'static str) -> impl FnOnce(RepoError) -> ServiceError {
    move |err| ServiceError::from(err).with_not_found_field(field)
}

impl From<RangeError> for ServiceError {
    fn from(value: RangeError) -> Self {
        Self::Range(value)
    }
}

/// Ordered list of recoverable failures.
///
/// Never reset implicitly; callers use `clear`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorCollector {
    errors: Vec<FieldError>,
}

impl ErrorCollector {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = FieldError>) {
        self.errors.extend(errors);
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }
}

/// Which failures one façade operation converts into field errors.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Recovery {
    pub(crate) operation: &'static str,
    pub(crate) range_fields: &'static [&'static str],
    pub(crate) not_found: bool,
    pub(crate) unique_tag_name: bool,
}

impl Recovery {
    /// Records `err` in `errors` when recoverable, returns it otherwise.
    pub(crate) fn recover(&self, err: ServiceError, errors: &mut ErrorCollector) -> ServiceResult<()> {
        match &err {
            ServiceError::Range(range) if self.range_fields.contains(&range.field) => {
                errors.add(range.field, range.message.clone());
                return Ok(());
            }
            ServiceError::NotFound { field, .. } if self.not_found => {
                errors.add(*field, err.to_string());
                return Ok(());
            }
            ServiceError::Constraint(violation)
                if self.unique_tag_name && is_tag_name_unique(violation) =>
            {
                errors.add("name", "name is not unique");
                return Ok(());
            }
            _ => {}
        }

        error!(
            "event=service_fatal module=service status=error operation={} error={}",
            self.operation, err
        );
        Err(err)
    }

    /// Settles one runner outcome into the façade's result shape.
    ///
    /// Runner errors are copied into `errors` and suppress the value.
    pub(crate) fn settle<T>(
        &self,
        outcome: ServiceResult<T>,
        runner_errors: &[FieldError],
        errors: &mut ErrorCollector,
    ) -> ServiceResult<Option<T>> {
        match outcome {
            Ok(value) if runner_errors.is_empty() => Ok(Some(value)),
            Ok(_) => {
                errors.extend(runner_errors.iter().cloned());
                Ok(None)
            }
            Err(err) => {
                self.recover(err, errors)?;
                Ok(None)
            }
        }
    }
}

fn is_tag_name_unique(violation: &ConstraintViolation) -> bool {
    violation.kind == ConstraintKind::Unique
        && TAG_NAME_UNIQUE_IDENTITIES.contains(&violation.identity.as_str())
}

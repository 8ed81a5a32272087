//! Single-purpose operation contract run by read and write runners.
//!
//! # Invariants
//! - Actions mutate tracked entities or stage additions/removals; they never
//!   commit.
//! - `persistence_required` starts `true`; an action clears it only when it
//!   changed nothing.

use crate::model::validation::FieldError;
use crate::service::errors::ServiceResult;

/// Error list and persistence flag an action reports to its runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionStatus {
    errors: Vec<FieldError>,
    persistence_required: bool,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self {
            errors: Vec::new(),
            persistence_required: true,
        }
    }
}

impl ActionStatus {
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn persistence_required(&self) -> bool {
        self.persistence_required
    }

    /// Marks the run as a no-op so the write runner skips the save.
    pub fn skip_persistence(&mut self) {
        self.persistence_required = false;
    }
}

/// One domain read or mutation over store `S`.
pub trait Action<S> {
    type Input;
    type Output;

    /// Stable name used in `action_run` log events.
    const NAME: &'static str;

    fn execute(&mut self, store: &mut S, input: Self::Input) -> ServiceResult<Self::Output>;

    fn status(&self) -> &ActionStatus;

    fn errors(&self) -> &[FieldError] {
        self.status().errors()
    }

    fn has_errors(&self) -> bool {
        self.status().has_errors()
    }

    fn persistence_required(&self) -> bool {
        self.status().persistence_required()
    }
}

#[cfg(test)]
mod tests {
    use super::ActionStatus;

    #[test]
    fn default_status_requires_persistence_without_errors() {
        let status = ActionStatus::default();
        assert!(status.persistence_required());
        assert!(!status.has_errors());
    }

    #[test]
    fn has_errors_follows_error_list() {
        let mut status = ActionStatus::default();
        status.add_error("tag_id", "tag is deleted");
        assert!(status.has_errors());
        assert_eq!(status.errors()[0].field, "tag_id");
    }
}

//! Read and write runners around one action.
//!
//! # Responsibility
//! - Execute an action and surface its errors.
//! - For writes, trigger one store-wide validated save when the action
//!   succeeded and changed something.
//!
//! # Invariants
//! - At most one save per run; none when the action failed or reported errors.
//! - A write run that does not commit discards the store's staged changes.
//! - `has_errors()` is `true` iff `errors()` is non-empty.

use crate::model::validation::FieldError;
use crate::repo::unit_of_work::UnitOfWork;
use crate::service::action::Action;
use crate::service::errors::{ServiceError, ServiceResult};
use log::{debug, error, info, warn};
use std::time::Instant;

/// Runs an action without persistence.
#[derive(Debug)]
pub struct ReadRunner<A> {
    action: A,
    errors: Vec<FieldError>,
}

impl<A> ReadRunner<A> {
    pub fn new(action: A) -> Self {
        Self {
            action,
            errors: Vec::new(),
        }
    }

    pub fn run<S>(
        &mut self,
        store: &mut S,
        input: <A as Action<S>>::Input,
    ) -> ServiceResult<<A as Action<S>>::Output>
    where
        A: Action<S>,
    {
        let started_at = Instant::now();
        self.errors.clear();

        let output = self.action.execute(store, input).map_err(|err| {
            log_failure(<A as Action<S>>::NAME, "read", started_at, &err);
            err
        })?;
        self.errors.extend_from_slice(self.action.errors());

        debug!(
            "event=action_run module=service status=ok mode=read action={} duration_ms={} error_count={}",
            <A as Action<S>>::NAME,
            started_at.elapsed().as_millis(),
            self.errors.len()
        );
        Ok(output)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Runs an action, then saves the whole unit of work when warranted.
#[derive(Debug)]
pub struct WriteRunner<A> {
    action: A,
    errors: Vec<FieldError>,
}

impl<A> WriteRunner<A> {
    pub fn new(action: A) -> Self {
        Self {
            action,
            errors: Vec::new(),
        }
    }

    /// Executes the action and commits its changes.
    ///
    /// Returns the action output even when errors were collected; callers
    /// check `has_errors()` before trusting it. Fatal failures are `Err`.
    pub fn run<S>(
        &mut self,
        store: &mut S,
        input: <A as Action<S>>::Input,
    ) -> ServiceResult<<A as Action<S>>::Output>
    where
        A: Action<S>,
        S: UnitOfWork,
    {
        let name = <A as Action<S>>::NAME;
        let started_at = Instant::now();
        self.errors.clear();

        let output = match self.action.execute(store, input) {
            Ok(output) => output,
            Err(err) => {
                store.discard_changes();
                log_failure(name, "write", started_at, &err);
                return Err(err);
            }
        };

        if self.action.has_errors() {
            self.errors.extend_from_slice(self.action.errors());
            store.discard_changes();
            warn!(
                "event=action_run module=service status=rejected mode=write action={} duration_ms={} error_count={}",
                name,
                started_at.elapsed().as_millis(),
                self.errors.len()
            );
            return Ok(output);
        }

        if !self.action.persistence_required() {
            store.discard_changes();
            info!(
                "event=action_run module=service status=skip mode=write action={} duration_ms={} reason=no_changes",
                name,
                started_at.elapsed().as_millis()
            );
            return Ok(output);
        }

        let invalid = match store.save_with_validation() {
            Ok(invalid) => invalid,
            Err(err) => {
                let err = ServiceError::from(err);
                log_failure(name, "write", started_at, &err);
                return Err(err);
            }
        };
        self.errors.extend(invalid);

        info!(
            "event=action_run module=service status={} mode=write action={} duration_ms={} error_count={}",
            if self.errors.is_empty() { "ok" } else { "rejected" },
            name,
            started_at.elapsed().as_millis(),
            self.errors.len()
        );
        Ok(output)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

fn log_failure(action: &str, mode: &str, started_at: Instant, err: &ServiceError) {
    match err {
        ServiceError::Repo(_) => error!(
            "event=action_run module=service status=error mode={} action={} duration_ms={} error={}",
            mode,
            action,
            started_at.elapsed().as_millis(),
            err
        ),
        _ => debug!(
            "event=action_run module=service status=failed mode={} action={} duration_ms={} error={}",
            mode,
            action,
            started_at.elapsed().as_millis(),
            err
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadRunner, WriteRunner};
    use crate::model::geo::RangeError;
    use crate::model::validation::FieldError;
    use crate::repo::unit_of_work::{RepoResult, UnitOfWork};
    use crate::service::action::{Action, ActionStatus};
    use crate::service::errors::{ServiceError, ServiceResult};

    #[derive(Default)]
    struct CountingStore {
        staged: u32,
        saves: u32,
        discards: u32,
        invalid: Vec<FieldError>,
    }

    impl UnitOfWork for CountingStore {
        fn save_with_validation(&mut self) -> RepoResult<Vec<FieldError>> {
            self.saves += 1;
            if !self.invalid.is_empty() {
                self.staged = 0;
            }
            Ok(self.invalid.clone())
        }

        fn discard_changes(&mut self) {
            self.discards += 1;
            self.staged = 0;
        }
    }

    enum Plan {
        Change,
        NoChange,
        ReportError,
        Fail,
    }

    #[derive(Default)]
    struct ScriptedAction {
        status: ActionStatus,
    }

    impl Action<CountingStore> for ScriptedAction {
        type Input = Plan;
        type Output = u32;

        const NAME: &'static str = "scripted";

        fn execute(&mut self, store: &mut CountingStore, input: Plan) -> ServiceResult<u32> {
            match input {
                Plan::Change => store.staged += 1,
                Plan::NoChange => self.status.skip_persistence(),
                Plan::ReportError => {
                    store.staged += 1;
                    self.status.add_error("tag_id", "tag is deleted");
                }
                Plan::Fail => {
                    store.staged += 1;
                    return Err(ServiceError::Range(RangeError::new(
                        "latitude",
                        "latitude must be between -90 and 90",
                    )));
                }
            }
            Ok(store.staged)
        }

        fn status(&self) -> &ActionStatus {
            &self.status
        }
    }

    #[test]
    fn successful_write_saves_exactly_once() {
        let mut store = CountingStore::default();
        let mut runner = WriteRunner::new(ScriptedAction::default());
        assert_eq!(runner.run(&mut store, Plan::Change).unwrap(), 1);
        assert_eq!(store.saves, 1);
        assert!(!runner.has_errors());
    }

    #[test]
    fn skipped_persistence_never_saves() {
        let mut store = CountingStore::default();
        let mut runner = WriteRunner::new(ScriptedAction::default());
        runner.run(&mut store, Plan::NoChange).unwrap();
        assert_eq!(store.saves, 0);
        assert!(!runner.has_errors());
    }

    #[test]
    fn action_errors_block_save_and_discard_changes() {
        let mut store = CountingStore::default();
        let mut runner = WriteRunner::new(ScriptedAction::default());
        runner.run(&mut store, Plan::ReportError).unwrap();
        assert_eq!(store.saves, 0);
        assert_eq!(store.staged, 0);
        assert_eq!(runner.errors()[0].field, "tag_id");
        assert!(runner.has_errors());
    }

    #[test]
    fn failing_action_propagates_and_discards() {
        let mut store = CountingStore::default();
        let mut runner = WriteRunner::new(ScriptedAction::default());
        let err = runner.run(&mut store, Plan::Fail).unwrap_err();
        assert!(matches!(err, ServiceError::Range(_)));
        assert_eq!(store.saves, 0);
        assert_eq!(store.discards, 1);
        assert_eq!(store.staged, 0);
    }

    #[test]
    fn save_validation_failures_become_runner_errors() {
        let mut store = CountingStore {
            invalid: vec![FieldError::new("description", "too long")],
            ..CountingStore::default()
        };
        let mut runner = WriteRunner::new(ScriptedAction::default());
        runner.run(&mut store, Plan::Change).unwrap();
        assert_eq!(store.saves, 1);
        assert_eq!(runner.errors(), &[FieldError::new("description", "too long")]);
    }

    #[test]
    fn read_runner_never_touches_persistence() {
        let mut store = CountingStore::default();
        let mut runner = ReadRunner::new(ScriptedAction::default());
        runner.run(&mut store, Plan::Change).unwrap();
        assert_eq!(store.saves, 0);
        assert_eq!(store.discards, 0);
        assert!(!runner.has_errors());
    }
}

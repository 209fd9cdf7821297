//! Periodic background task registration contract.
//!
//! # Responsibility
//! - Describe the recurring work the core asks a host to run
//!   (`PeriodicTaskRequest`).
//! - Define the `TaskScheduler` seam the reminder service registers through.
//!
//! # Invariants
//! - At most one registration exists per task name.
//! - `ExistingTaskPolicy::Replace` swaps the registration (new id);
//!   `ExistingTaskPolicy::Keep` leaves an existing one untouched.
//! - Periods below `MIN_PERIODIC_INTERVAL` are rejected, matching the
//!   platform floor of mobile job schedulers.
//!
//! The core never runs the registered callback itself; hosts do.

use crate::db::DbError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryTaskScheduler;
pub use sqlite::SqliteTaskRegistry;

/// Smallest accepted repeat period.
pub const MIN_PERIODIC_INTERVAL: Duration = Duration::from_secs(15 * 60);

pub type TaskResult<T> = Result<T, TaskError>;

/// Task registration errors.
#[derive(Debug)]
pub enum TaskError {
    PeriodTooShort { name: String, period_secs: u64 },
    InvalidName(String),
    Db(DbError),
    LockPoisoned,
    InvalidData(String),
}

impl Display for TaskError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PeriodTooShort { name, period_secs } => write!(
                f,
                "task `{name}` period {period_secs}s is below the {}s minimum",
                MIN_PERIODIC_INTERVAL.as_secs()
            ),
            Self::InvalidName(name) => write!(f, "invalid task name: `{name}`"),
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "task registry lock poisoned"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TaskError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TaskError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Network condition required before the task may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkRequirement {
    #[default]
    NotRequired,
    Connected,
}

/// Run constraints attached to a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskConstraints {
    pub network: NetworkRequirement,
}

/// What to do when a registration with the same name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingTaskPolicy {
    Replace,
    Keep,
}

/// Recurring work request handed to a `TaskScheduler`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicTaskRequest {
    /// Unique registration name.
    pub name: String,
    /// Host-side identifier of the callback to invoke.
    pub callback_id: String,
    pub period: Duration,
    /// Delay before the first run.
    pub initial_delay: Duration,
    pub constraints: TaskConstraints,
    pub tags: Vec<String>,
}

impl PeriodicTaskRequest {
    pub fn new(name: impl Into<String>, callback_id: impl Into<String>, period: Duration) -> Self {
        Self {
            name: name.into(),
            callback_id: callback_id.into(),
            period,
            initial_delay: Duration::ZERO,
            constraints: TaskConstraints::default(),
            tags: Vec::new(),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_constraints(mut self, constraints: TaskConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Checks name and period before any backend mutation.
    pub fn validate(&self) -> TaskResult<()> {
        if self.name.trim().is_empty() || self.name.trim() != self.name {
            return Err(TaskError::InvalidName(self.name.clone()));
        }
        if self.period < MIN_PERIODIC_INTERVAL {
            return Err(TaskError::PeriodTooShort {
                name: self.name.clone(),
                period_secs: self.period.as_secs(),
            });
        }
        Ok(())
    }
}

/// Active registration as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRegistration {
    /// Fresh for every accepted registration, including replacements.
    pub id: Uuid,
    pub request: PeriodicTaskRequest,
    /// Unix epoch milliseconds.
    pub registered_at_ms: i64,
}

impl TaskRegistration {
    fn new(request: PeriodicTaskRequest, registered_at_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            registered_at_ms,
        }
    }
}

/// Host facility that runs named recurring work.
pub trait TaskScheduler {
    /// Registers `request` under its name, honoring `policy` on conflict.
    ///
    /// `registered_at_ms` is the caller's clock reading; `Keep` returns the
    /// existing registration with its original timestamp.
    fn register_periodic(
        &self,
        request: &PeriodicTaskRequest,
        policy: ExistingTaskPolicy,
        registered_at_ms: i64,
    ) -> TaskResult<TaskRegistration>;

    /// Cancels the registration named `name`. Returns whether one existed.
    fn cancel(&self, name: &str) -> TaskResult<bool>;

    fn registration(&self, name: &str) -> TaskResult<Option<TaskRegistration>>;

    /// Every active registration, ordered by name.
    fn registrations(&self) -> TaskResult<Vec<TaskRegistration>>;
}

impl<T: TaskScheduler + ?Sized> TaskScheduler for &T {
    fn register_periodic(
        &self,
        request: &PeriodicTaskRequest,
        policy: ExistingTaskPolicy,
        registered_at_ms: i64,
    ) -> TaskResult<TaskRegistration> {
        (**self).register_periodic(request, policy, registered_at_ms)
    }

    fn cancel(&self, name: &str) -> TaskResult<bool> {
        (**self).cancel(name)
    }

    fn registration(&self, name: &str) -> TaskResult<Option<TaskRegistration>> {
        (**self).registration(name)
    }

    fn registrations(&self) -> TaskResult<Vec<TaskRegistration>> {
        (**self).registrations()
    }
}

#[cfg(test)]
mod tests {
    use super::{PeriodicTaskRequest, TaskError, MIN_PERIODIC_INTERVAL};
    use std::time::Duration;

    #[test]
    fn validate_rejects_short_period() {
        let request = PeriodicTaskRequest::new("work", "cb", Duration::from_secs(60));
        let err = request.validate().expect_err("one minute is too short");
        assert!(matches!(err, TaskError::PeriodTooShort { period_secs: 60, .. }));
    }

    #[test]
    fn validate_rejects_padded_or_empty_names() {
        for name in ["", "  ", " work"] {
            let request = PeriodicTaskRequest::new(name, "cb", MIN_PERIODIC_INTERVAL);
            assert!(matches!(request.validate(), Err(TaskError::InvalidName(_))));
        }
    }

    #[test]
    fn builder_sets_delay_and_tags() {
        let request = PeriodicTaskRequest::new("work", "cb", Duration::from_secs(3600))
            .with_initial_delay(Duration::from_secs(120))
            .with_tag("work");
        assert_eq!(request.initial_delay, Duration::from_secs(120));
        assert_eq!(request.tags, vec!["work".to_string()]);
        assert!(request.validate().is_ok());
    }
}

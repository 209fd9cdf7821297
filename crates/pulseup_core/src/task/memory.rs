//! In-process task scheduler that only records registrations.

use super::{
    ExistingTaskPolicy, PeriodicTaskRequest, TaskError, TaskRegistration, TaskResult,
    TaskScheduler,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Records registrations without running anything. Not durable.
#[derive(Debug, Default)]
pub struct InMemoryTaskScheduler {
    tasks: Mutex<BTreeMap<String, TaskRegistration>>,
}

impl InMemoryTaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskScheduler for InMemoryTaskScheduler {
    fn register_periodic(
        &self,
        request: &PeriodicTaskRequest,
        policy: ExistingTaskPolicy,
        registered_at_ms: i64,
    ) -> TaskResult<TaskRegistration> {
        request.validate()?;
        let mut tasks = self.tasks.lock().map_err(|_| TaskError::LockPoisoned)?;

        if policy == ExistingTaskPolicy::Keep {
            if let Some(existing) = tasks.get(&request.name) {
                return Ok(existing.clone());
            }
        }

        let registration = TaskRegistration::new(request.clone(), registered_at_ms);
        tasks.insert(request.name.clone(), registration.clone());
        Ok(registration)
    }

    fn cancel(&self, name: &str) -> TaskResult<bool> {
        let mut tasks = self.tasks.lock().map_err(|_| TaskError::LockPoisoned)?;
        Ok(tasks.remove(name).is_some())
    }

    fn registration(&self, name: &str) -> TaskResult<Option<TaskRegistration>> {
        let tasks = self.tasks.lock().map_err(|_| TaskError::LockPoisoned)?;
        Ok(tasks.get(name).cloned())
    }

    fn registrations(&self) -> TaskResult<Vec<TaskRegistration>> {
        let tasks = self.tasks.lock().map_err(|_| TaskError::LockPoisoned)?;
        Ok(tasks.values().cloned().collect())
    }
}

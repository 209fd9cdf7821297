//! Durable task registry over the `periodic_tasks` table.
//!
//! # Responsibility
//! - Persist the desired registration per name so it survives restarts.
//! - Let a host read back what it must mirror into the OS job scheduler.
//!
//! # Invariants
//! - `name` is the primary key; replacement is a single upsert.
//! - Durations are stored in whole seconds.

use super::{
    ExistingTaskPolicy, NetworkRequirement, PeriodicTaskRequest, TaskConstraints, TaskError,
    TaskRegistration, TaskResult, TaskScheduler,
};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Duration;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    name,
    registration_id,
    callback_id,
    period_secs,
    initial_delay_secs,
    requires_network,
    tags,
    registered_at
FROM periodic_tasks";

/// SQLite-backed `TaskScheduler` that records registrations durably.
pub struct SqliteTaskRegistry<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRegistry<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskScheduler for SqliteTaskRegistry<'_> {
    fn register_periodic(
        &self,
        request: &PeriodicTaskRequest,
        policy: ExistingTaskPolicy,
        registered_at_ms: i64,
    ) -> TaskResult<TaskRegistration> {
        request.validate()?;

        if policy == ExistingTaskPolicy::Keep {
            if let Some(existing) = self.registration(&request.name)? {
                return Ok(existing);
            }
        }

        let registration = TaskRegistration::new(request.clone(), registered_at_ms);
        let tags = serde_json::to_string(&request.tags)
            .map_err(|err| TaskError::InvalidData(format!("tags encode failed: {err}")))?;

        self.conn.execute(
            "INSERT INTO periodic_tasks (
                name,
                registration_id,
                callback_id,
                period_secs,
                initial_delay_secs,
                requires_network,
                tags,
                registered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(name) DO UPDATE SET
                registration_id = excluded.registration_id,
                callback_id = excluded.callback_id,
                period_secs = excluded.period_secs,
                initial_delay_secs = excluded.initial_delay_secs,
                requires_network = excluded.requires_network,
                tags = excluded.tags,
                registered_at = excluded.registered_at;",
            params![
                request.name.as_str(),
                registration.id.to_string(),
                request.callback_id.as_str(),
                secs_to_db(request.period)?,
                secs_to_db(request.initial_delay)?,
                i64::from(request.constraints.network == NetworkRequirement::Connected),
                tags,
                registration.registered_at_ms,
            ],
        )?;

        info!(
            "event=task_register module=task status=ok name={} period_secs={} delay_secs={}",
            request.name,
            request.period.as_secs(),
            request.initial_delay.as_secs()
        );
        Ok(registration)
    }

    fn cancel(&self, name: &str) -> TaskResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM periodic_tasks WHERE name = ?1;", [name])?;
        Ok(removed > 0)
    }

    fn registration(&self, name: &str) -> TaskResult<Option<TaskRegistration>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE name = ?1;"))?;
        let raw = stmt.query_row([name], read_raw_row).optional()?;
        raw.map(RawTaskRow::into_registration).transpose()
    }

    fn registrations(&self) -> TaskResult<Vec<TaskRegistration>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY name ASC;"))?;
        let rows = stmt
            .query_map([], read_raw_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawTaskRow::into_registration).collect()
    }
}

struct RawTaskRow {
    name: String,
    registration_id: String,
    callback_id: String,
    period_secs: i64,
    initial_delay_secs: i64,
    requires_network: i64,
    tags: String,
    registered_at: i64,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawTaskRow> {
    Ok(RawTaskRow {
        name: row.get("name")?,
        registration_id: row.get("registration_id")?,
        callback_id: row.get("callback_id")?,
        period_secs: row.get("period_secs")?,
        initial_delay_secs: row.get("initial_delay_secs")?,
        requires_network: row.get("requires_network")?,
        tags: row.get("tags")?,
        registered_at: row.get("registered_at")?,
    })
}

impl RawTaskRow {
    fn into_registration(self) -> TaskResult<TaskRegistration> {
        let id = Uuid::parse_str(&self.registration_id).map_err(|_| {
            TaskError::InvalidData(format!(
                "invalid registration_id `{}` for task `{}`",
                self.registration_id, self.name
            ))
        })?;
        let tags: Vec<String> = serde_json::from_str(&self.tags).map_err(|err| {
            TaskError::InvalidData(format!("invalid tags for task `{}`: {err}", self.name))
        })?;
        let network = match self.requires_network {
            0 => NetworkRequirement::NotRequired,
            1 => NetworkRequirement::Connected,
            other => {
                return Err(TaskError::InvalidData(format!(
                    "invalid requires_network value `{other}` for task `{}`",
                    self.name
                )));
            }
        };

        Ok(TaskRegistration {
            id,
            request: PeriodicTaskRequest {
                period: secs_from_db(&self.name, self.period_secs)?,
                initial_delay: secs_from_db(&self.name, self.initial_delay_secs)?,
                name: self.name,
                callback_id: self.callback_id,
                constraints: TaskConstraints { network },
                tags,
            },
            registered_at_ms: self.registered_at,
        })
    }
}

fn secs_to_db(duration: Duration) -> TaskResult<i64> {
    i64::try_from(duration.as_secs())
        .map_err(|_| TaskError::InvalidData(format!("duration {duration:?} overflows storage")))
}

fn secs_from_db(name: &str, secs: i64) -> TaskResult<Duration> {
    u64::try_from(secs)
        .map(Duration::from_secs)
        .map_err(|_| TaskError::InvalidData(format!("negative duration for task `{name}`")))
}

//! SQLite preference backend over the `prefs` table.
//!
//! # Invariants
//! - Rows are keyed by `(scope, key)`; a handle only sees its own scope.
//! - `value_type` always matches the stored value's SQLite storage class:
//!   bool/int/long are INTEGER, string is TEXT.
//! - Each `commit` runs in its own transaction.

use super::{KeyValueStore, KvError, KvResult, PrefKind, PrefOp, PrefValue, PrefsEdit};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed scoped preference store.
pub struct SqlitePrefs<'conn> {
    conn: &'conn Connection,
    scope: String,
}

impl<'conn> SqlitePrefs<'conn> {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: &'conn Connection, scope: impl Into<String>) -> Self {
        Self {
            conn,
            scope: scope.into(),
        }
    }
}

impl KeyValueStore for SqlitePrefs<'_> {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn get(&self, key: &str) -> KvResult<Option<PrefValue>> {
        let row = self
            .conn
            .query_row(
                "SELECT value_type, value FROM prefs WHERE scope = ?1 AND key = ?2;",
                params![self.scope.as_str(), key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Value>(1)?)),
            )
            .optional()?;

        match row {
            Some((value_type, value)) => decode_value(key, &value_type, value).map(Some),
            None => Ok(None),
        }
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM prefs WHERE scope = ?1 ORDER BY key ASC;")?;
        let keys = stmt
            .query_map([self.scope.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn commit(&self, edit: PrefsEdit) -> KvResult<()> {
        if edit.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for op in edit.into_ops() {
            match op {
                PrefOp::Put(key, value) => {
                    let kind = value.kind();
                    tx.execute(
                        "INSERT INTO prefs (scope, key, value_type, value, updated_at)
                         VALUES (?1, ?2, ?3, ?4, (strftime('%s', 'now') * 1000))
                         ON CONFLICT(scope, key) DO UPDATE SET
                            value_type = excluded.value_type,
                            value = excluded.value,
                            updated_at = excluded.updated_at;",
                        params![self.scope.as_str(), key, kind.as_str(), encode_value(value)],
                    )?;
                }
                PrefOp::Remove(key) => {
                    tx.execute(
                        "DELETE FROM prefs WHERE scope = ?1 AND key = ?2;",
                        params![self.scope.as_str(), key],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn encode_value(value: PrefValue) -> Value {
    match value {
        PrefValue::Bool(flag) => Value::Integer(i64::from(flag)),
        PrefValue::Int(number) => Value::Integer(i64::from(number)),
        PrefValue::Long(number) => Value::Integer(number),
        PrefValue::String(text) => Value::Text(text),
    }
}

fn decode_value(key: &str, value_type: &str, value: Value) -> KvResult<PrefValue> {
    let kind = PrefKind::parse(value_type).ok_or_else(|| {
        KvError::InvalidData(format!("unknown value_type `{value_type}` for key `{key}`"))
    })?;

    match (kind, value) {
        (PrefKind::Bool, Value::Integer(0)) => Ok(PrefValue::Bool(false)),
        (PrefKind::Bool, Value::Integer(1)) => Ok(PrefValue::Bool(true)),
        (PrefKind::Int, Value::Integer(number)) => i32::try_from(number)
            .map(PrefValue::Int)
            .map_err(|_| KvError::InvalidData(format!("int overflow for key `{key}`"))),
        (PrefKind::Long, Value::Integer(number)) => Ok(PrefValue::Long(number)),
        (PrefKind::String, Value::Text(text)) => Ok(PrefValue::String(text)),
        (kind, _) => Err(KvError::InvalidData(format!(
            "stored value for key `{key}` does not match value_type `{}`",
            kind.as_str()
        ))),
    }
}

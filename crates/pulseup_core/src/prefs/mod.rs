//! Scoped, typed key-value preference storage.
//!
//! # Responsibility
//! - Define the `KeyValueStore` contract both preference domains sit on.
//! - Provide typed reads with defaults and batched writes (`PrefsEdit`).
//!
//! # Invariants
//! - One store handle addresses exactly one scope (`hydration_prefs`,
//!   `mood_prefs`); keys never leak across scopes.
//! - `commit` is durable once it returns `Ok`. `apply` never fails loudly:
//!   errors are logged and dropped.
//! - A batch is applied in insertion order and all-or-nothing.
//! - Reading a key with the wrong typed accessor is `KvError::TypeMismatch`.

use crate::db::DbError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryPrefs;
pub use sqlite::SqlitePrefs;

pub type KvResult<T> = Result<T, KvError>;

/// Preference storage errors.
#[derive(Debug)]
pub enum KvError {
    /// Backend transport failure.
    Db(DbError),
    /// Stored value kind differs from the requested accessor.
    TypeMismatch {
        key: String,
        expected: PrefKind,
        found: PrefKind,
    },
    /// In-memory backend lock was poisoned by a panicking writer.
    LockPoisoned,
    /// Persisted row cannot be decoded into a `PrefValue`.
    InvalidData(String),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TypeMismatch {
                key,
                expected,
                found,
            } => write!(
                f,
                "preference `{key}` holds a {} value, expected {}",
                found.as_str(),
                expected.as_str()
            ),
            Self::LockPoisoned => write!(f, "preference store lock poisoned"),
            Self::InvalidData(message) => write!(f, "invalid persisted preference: {message}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage kind of a preference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefKind {
    Bool,
    Int,
    Long,
    String,
}

impl PrefKind {
    /// Stable lowercase name, also used as the SQLite `value_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::String => "string",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bool" => Some(Self::Bool),
            "int" => Some(Self::Int),
            "long" => Some(Self::Long),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// One typed preference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    String(String),
}

impl PrefValue {
    pub fn kind(&self) -> PrefKind {
        match self {
            Self::Bool(_) => PrefKind::Bool,
            Self::Int(_) => PrefKind::Int,
            Self::Long(_) => PrefKind::Long,
            Self::String(_) => PrefKind::String,
        }
    }
}

/// Single mutation inside a `PrefsEdit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefOp {
    Put(String, PrefValue),
    Remove(String),
}

/// Ordered batch of preference writes, applied atomically by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefsEdit {
    ops: Vec<PrefOp>,
}

impl PrefsEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(mut self, key: impl Into<String>, value: PrefValue) -> Self {
        self.ops.push(PrefOp::Put(key.into(), value));
        self
    }

    pub fn put_bool(self, key: impl Into<String>, value: bool) -> Self {
        self.put(key, PrefValue::Bool(value))
    }

    pub fn put_int(self, key: impl Into<String>, value: i32) -> Self {
        self.put(key, PrefValue::Int(value))
    }

    pub fn put_long(self, key: impl Into<String>, value: i64) -> Self {
        self.put(key, PrefValue::Long(value))
    }

    pub fn put_string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put(key, PrefValue::String(value.into()))
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.ops.push(PrefOp::Remove(key.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[PrefOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<PrefOp> {
        self.ops
    }
}

/// Scoped synchronous preference store.
///
/// Backends implement the four required methods; typed accessors and the
/// fire-and-forget `apply` are derived from them.
pub trait KeyValueStore {
    /// Namespace this handle reads and writes.
    fn scope(&self) -> &str;

    /// Raw read of one key. `None` when absent.
    fn get(&self, key: &str) -> KvResult<Option<PrefValue>>;

    /// All keys currently stored in this scope, sorted ascending.
    fn keys(&self) -> KvResult<Vec<String>>;

    /// Applies `edit` atomically and durably before returning.
    fn commit(&self, edit: PrefsEdit) -> KvResult<()>;

    /// Applies `edit` without reporting failure to the caller.
    fn apply(&self, edit: PrefsEdit) {
        let ops = edit.len();
        if let Err(err) = self.commit(edit) {
            warn!(
                "event=prefs_apply module=prefs status=error scope={} ops={} error={}",
                self.scope(),
                ops,
                err
            );
        }
    }

    fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn get_bool(&self, key: &str, default: bool) -> KvResult<bool> {
        match self.get(key)? {
            None => Ok(default),
            Some(PrefValue::Bool(value)) => Ok(value),
            Some(other) => Err(type_mismatch(key, PrefKind::Bool, &other)),
        }
    }

    fn get_int(&self, key: &str, default: i32) -> KvResult<i32> {
        match self.get(key)? {
            None => Ok(default),
            Some(PrefValue::Int(value)) => Ok(value),
            Some(other) => Err(type_mismatch(key, PrefKind::Int, &other)),
        }
    }

    fn get_long(&self, key: &str, default: i64) -> KvResult<i64> {
        match self.get(key)? {
            None => Ok(default),
            Some(PrefValue::Long(value)) => Ok(value),
            Some(other) => Err(type_mismatch(key, PrefKind::Long, &other)),
        }
    }

    fn get_string(&self, key: &str) -> KvResult<Option<String>> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::String(value)) => Ok(Some(value)),
            Some(other) => Err(type_mismatch(key, PrefKind::String, &other)),
        }
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn scope(&self) -> &str {
        (**self).scope()
    }

    fn get(&self, key: &str) -> KvResult<Option<PrefValue>> {
        (**self).get(key)
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        (**self).keys()
    }

    fn commit(&self, edit: PrefsEdit) -> KvResult<()> {
        (**self).commit(edit)
    }

    fn apply(&self, edit: PrefsEdit) {
        (**self).apply(edit)
    }
}

fn type_mismatch(key: &str, expected: PrefKind, found: &PrefValue) -> KvError {
    KvError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

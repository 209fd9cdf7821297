//! In-memory preference backend.
//!
//! Thread-safe and lost on drop. Used by tests, the CLI probe and hosts that
//! keep their own persistence.

use super::{KeyValueStore, KvError, KvResult, PrefOp, PrefValue, PrefsEdit};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// `KeyValueStore` backed by a mutex-guarded ordered map.
#[derive(Debug)]
pub struct InMemoryPrefs {
    scope: String,
    entries: Mutex<BTreeMap<String, PrefValue>>,
}

impl InMemoryPrefs {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Copy of every stored entry, for diagnostics and assertions.
    pub fn snapshot(&self) -> KvResult<BTreeMap<String, PrefValue>> {
        let entries = self.entries.lock().map_err(|_| KvError::LockPoisoned)?;
        Ok(entries.clone())
    }
}

impl KeyValueStore for InMemoryPrefs {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn get(&self, key: &str) -> KvResult<Option<PrefValue>> {
        let entries = self.entries.lock().map_err(|_| KvError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn keys(&self) -> KvResult<Vec<String>> {
        let entries = self.entries.lock().map_err(|_| KvError::LockPoisoned)?;
        Ok(entries.keys().cloned().collect())
    }

    fn commit(&self, edit: PrefsEdit) -> KvResult<()> {
        let mut entries = self.entries.lock().map_err(|_| KvError::LockPoisoned)?;
        for op in edit.into_ops() {
            match op {
                PrefOp::Put(key, value) => {
                    entries.insert(key, value);
                }
                PrefOp::Remove(key) => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryPrefs;
    use crate::prefs::{KeyValueStore, PrefValue, PrefsEdit};

    #[test]
    fn later_ops_in_one_batch_win() {
        let store = InMemoryPrefs::new("mood_prefs");
        store
            .commit(
                PrefsEdit::new()
                    .put_string("k", "first")
                    .put_string("k", "second")
                    .put_bool("gone", true)
                    .remove("gone"),
            )
            .expect("commit should succeed");

        let snapshot = store.snapshot().expect("snapshot");
        assert_eq!(
            snapshot.get("k"),
            Some(&PrefValue::String("second".to_string()))
        );
        assert!(!snapshot.contains_key("gone"));
    }

    #[test]
    fn keys_are_sorted() {
        let store = InMemoryPrefs::new("s");
        store.apply(PrefsEdit::new().put_int("b", 1).put_int("a", 2));
        assert_eq!(store.keys().expect("keys"), vec!["a", "b"]);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::KeyValue;

/// JSON documents on top of a [`KeyValue`] backend.
///
/// The first backend failure flips the handle into memory-only mode for the
/// rest of the session. Callers keep their in-memory state and the failure is
/// logged once.
pub struct Persisted {
    backend: Arc<dyn KeyValue>,
    degraded: AtomicBool,
}

impl Persisted {
    pub fn new(backend: Arc<dyn KeyValue>) -> Self {
        Self {
            backend,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        if self.is_degraded() {
            return T::default();
        }
        match self.backend.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key, error = %err, "setting aside unreadable stored value");
                    self.set_aside(key, &raw);
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(err) => {
                self.degrade(&err);
                T::default()
            }
        }
    }

    /// Loads a JSON array one entry at a time, skipping entries that no longer
    /// decode. Skipped entries are set aside rather than dropped.
    pub fn load_entries<T>(&self, key: &str) -> Vec<T>
    where
        T: DeserializeOwned,
    {
        let entries: Vec<Value> = self.load(key);
        let mut decoded = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();
        for entry in entries {
            match T::deserialize(&entry) {
                Ok(value) => decoded.push(value),
                Err(err) => {
                    tracing::warn!(key, error = %err, "skipping unreadable stored entry");
                    skipped.push(entry);
                }
            }
        }
        if !skipped.is_empty() {
            self.set_aside(key, &Value::Array(skipped).to_string());
        }
        decoded
    }

    pub fn save<T>(&self, key: &str, value: &T)
    where
        T: Serialize + ?Sized,
    {
        if self.is_degraded() {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "failed to encode value for storage");
                return;
            }
        };
        if let Err(err) = self.backend.put(key, &raw) {
            self.degrade(&err);
        }
    }

    pub fn clear(&self, key: &str) {
        if self.is_degraded() {
            return;
        }
        if let Err(err) = self.backend.remove(key) {
            self.degrade(&err);
        }
    }

    // Copies data that failed to decode under `<key>.unreadable` before the
    // next save replaces it.
    fn set_aside(&self, key: &str, raw: &str) {
        if let Err(err) = self.backend.put(&unreadable_key(key), raw) {
            self.degrade(&err);
        }
    }

    fn degrade(&self, err: &anyhow::Error) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                error = ?err,
                "local storage unavailable; changes will only last for this session"
            );
        }
    }
}

pub fn unreadable_key(key: &str) -> String {
    format!("{key}.unreadable")
}

#[cfg(test)]
pub(crate) mod testing {
    use anyhow::{bail, Result};

    use crate::storage::KeyValue;

    /// Backend whose every call fails, standing in for a full or locked disk.
    #[derive(Default)]
    pub struct Unavailable;

    impl KeyValue for Unavailable {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            bail!("storage: unavailable")
        }

        fn put(&self, _key: &str, _value: &str) -> Result<()> {
            bail!("storage: unavailable")
        }

        fn remove(&self, _key: &str) -> Result<()> {
            bail!("storage: unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Unavailable;
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn round_trips_through_backend() {
        let backend = Arc::new(MemoryStore::new());
        let persisted = Persisted::new(backend.clone());
        persisted.save("liked_videos", &vec!["a".to_string()]);

        assert_eq!(
            backend.get("liked_videos").unwrap().as_deref(),
            Some(r#"["a"]"#)
        );
        let loaded: Vec<String> = persisted.load("liked_videos");
        assert_eq!(loaded, vec!["a"]);
    }

    #[test]
    fn corrupt_value_loads_as_default_without_degrading() {
        let backend = Arc::new(MemoryStore::new());
        backend.put("saved_videos", "{not json").unwrap();
        let persisted = Persisted::new(backend.clone());

        let loaded: Vec<String> = persisted.load("saved_videos");
        assert!(loaded.is_empty());
        assert!(!persisted.is_degraded());
        assert_eq!(
            backend.get("saved_videos.unreadable").unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn load_entries_skips_bad_entries_and_keeps_a_copy() {
        let backend = Arc::new(MemoryStore::new());
        backend.put("liked_videos", r#"["a", 7, "b"]"#).unwrap();
        let persisted = Persisted::new(backend.clone());

        let loaded: Vec<String> = persisted.load_entries("liked_videos");
        assert_eq!(loaded, vec!["a", "b"]);
        assert_eq!(
            backend.get(&unreadable_key("liked_videos")).unwrap().as_deref(),
            Some("[7]")
        );
    }

    #[test]
    fn failing_backend_degrades_once() {
        let persisted = Persisted::new(Arc::new(Unavailable));
        let loaded: Vec<String> = persisted.load("liked_videos");
        assert!(loaded.is_empty());
        assert!(persisted.is_degraded());

        persisted.save("liked_videos", &vec!["a".to_string()]);
        persisted.clear("liked_videos");
        assert!(persisted.is_degraded());
    }
}

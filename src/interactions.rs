use std::sync::Arc;

use parking_lot::RwLock;

use crate::persist::Persisted;

pub const LIKED_KEY: &str = "liked_videos";
pub const SAVED_KEY: &str = "saved_videos";

/// Liked and saved video ids, kept in the order they were added.
pub struct InteractionStore {
    persisted: Arc<Persisted>,
    liked: RwLock<Vec<String>>,
    saved: RwLock<Vec<String>>,
}

impl InteractionStore {
    pub fn load(persisted: Arc<Persisted>) -> Self {
        let liked = dedup(persisted.load_entries(LIKED_KEY));
        let saved = dedup(persisted.load_entries(SAVED_KEY));
        Self {
            persisted,
            liked: RwLock::new(liked),
            saved: RwLock::new(saved),
        }
    }

    pub fn is_liked(&self, video_id: &str) -> bool {
        self.liked.read().iter().any(|id| id == video_id)
    }

    pub fn is_saved(&self, video_id: &str) -> bool {
        self.saved.read().iter().any(|id| id == video_id)
    }

    /// Flips membership and returns whether the video is now liked.
    pub fn toggle_like(&self, video_id: &str) -> bool {
        toggle(&self.persisted, LIKED_KEY, &self.liked, video_id)
    }

    /// Flips membership and returns whether the video is now saved.
    pub fn toggle_save(&self, video_id: &str) -> bool {
        toggle(&self.persisted, SAVED_KEY, &self.saved, video_id)
    }

    pub fn liked(&self) -> Vec<String> {
        self.liked.read().clone()
    }

    pub fn saved(&self) -> Vec<String> {
        self.saved.read().clone()
    }
}

fn toggle(persisted: &Persisted, key: &str, set: &RwLock<Vec<String>>, video_id: &str) -> bool {
    let mut ids = set.write();
    let present = match ids.iter().position(|id| id == video_id) {
        Some(index) => {
            ids.remove(index);
            false
        }
        None => {
            ids.push(video_id.to_string());
            true
        }
    };
    persisted.save(key, &*ids);
    present
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::testing::Unavailable;
    use crate::storage::{KeyValue, MemoryStore};

    fn store_with(backend: Arc<MemoryStore>) -> InteractionStore {
        InteractionStore::load(Arc::new(Persisted::new(backend)))
    }

    #[test]
    fn toggle_like_twice_restores_state() {
        let store = store_with(Arc::new(MemoryStore::new()));
        assert!(!store.is_liked("x"));

        assert!(store.toggle_like("x"));
        assert!(store.is_liked("x"));

        assert!(!store.toggle_like("x"));
        assert!(!store.is_liked("x"));
    }

    #[test]
    fn liked_and_saved_are_independent() {
        let store = store_with(Arc::new(MemoryStore::new()));
        store.toggle_like("a");
        store.toggle_save("b");
        store.toggle_save("a");

        assert!(store.is_liked("a"));
        assert!(store.is_saved("a"));
        assert!(!store.is_liked("b"));
        assert_eq!(store.saved(), vec!["b", "a"]);
    }

    #[test]
    fn toggles_write_through_and_reload() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_with(backend.clone());
        store.toggle_like("a");
        store.toggle_like("b");
        store.toggle_like("a");
        store.toggle_save("c");

        assert_eq!(backend.get(LIKED_KEY).unwrap().as_deref(), Some(r#"["b"]"#));

        let reloaded = store_with(backend);
        assert_eq!(reloaded.liked(), vec!["b"]);
        assert!(reloaded.is_saved("c"));
    }

    #[test]
    fn duplicate_ids_in_storage_collapse() {
        let backend = Arc::new(MemoryStore::new());
        backend.put(LIKED_KEY, r#"["a","a","b"]"#).unwrap();
        let store = store_with(backend);
        assert_eq!(store.liked(), vec!["a", "b"]);
        store.toggle_like("a");
        assert!(!store.is_liked("a"));
    }

    #[test]
    fn unavailable_storage_keeps_session_state() {
        let persisted = Arc::new(Persisted::new(Arc::new(Unavailable)));
        let store = InteractionStore::load(persisted.clone());

        store.toggle_save("x");
        assert!(store.is_saved("x"));
        assert!(persisted.is_degraded());
    }
}

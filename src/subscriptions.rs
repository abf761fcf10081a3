use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::catalog::Channel;
use crate::persist::Persisted;

pub const SUBSCRIPTIONS_KEY: &str = "subscribed_channels";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("channel id required")]
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribedChannel {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "image")]
    pub image_url: String,
}

impl From<&Channel> for SubscribedChannel {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.clone(),
            name: channel.name.clone(),
            image_url: channel.profile_image_url.clone(),
        }
    }
}

pub struct SubscriptionStore {
    persisted: Arc<Persisted>,
    channels: RwLock<Vec<SubscribedChannel>>,
}

impl SubscriptionStore {
    pub fn load(persisted: Arc<Persisted>) -> Self {
        let stored: Vec<SubscribedChannel> = persisted.load_entries(SUBSCRIPTIONS_KEY);
        let mut channels: Vec<SubscribedChannel> = Vec::with_capacity(stored.len());
        for channel in stored {
            if !channels.iter().any(|existing| existing.id == channel.id) {
                channels.push(channel);
            }
        }
        Self {
            persisted,
            channels: RwLock::new(channels),
        }
    }

    pub fn is_subscribed(&self, channel_id: &str) -> bool {
        self.channels.read().iter().any(|c| c.id == channel_id)
    }

    /// Adds the full record or removes the existing one. Returns whether the
    /// channel is subscribed afterwards.
    pub fn toggle_subscribe(&self, channel: SubscribedChannel) -> Result<bool, SubscriptionError> {
        if channel.id.trim().is_empty() {
            return Err(SubscriptionError::Validation);
        }
        let mut channels = self.channels.write();
        let subscribed = match channels.iter().position(|c| c.id == channel.id) {
            Some(index) => {
                channels.remove(index);
                false
            }
            None => {
                channels.push(channel);
                true
            }
        };
        self.persisted.save(SUBSCRIPTIONS_KEY, &*channels);
        Ok(subscribed)
    }

    pub fn list_subscriptions(&self) -> Vec<SubscribedChannel> {
        self.channels.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValue, MemoryStore};

    fn channel(id: &str, name: &str) -> SubscribedChannel {
        SubscribedChannel {
            id: id.into(),
            name: name.into(),
            image_url: format!("https://img.example/{id}.png"),
        }
    }

    fn store_with(backend: Arc<MemoryStore>) -> SubscriptionStore {
        SubscriptionStore::load(Arc::new(Persisted::new(backend)))
    }

    #[test]
    fn toggle_adds_then_removes_full_record() {
        let store = store_with(Arc::new(MemoryStore::new()));
        assert_eq!(store.toggle_subscribe(channel("c1", "One")), Ok(true));
        assert!(store.is_subscribed("c1"));
        assert_eq!(store.list_subscriptions(), vec![channel("c1", "One")]);

        assert_eq!(store.toggle_subscribe(channel("c1", "One")), Ok(false));
        assert!(!store.is_subscribed("c1"));
        assert!(store.list_subscriptions().is_empty());
    }

    #[test]
    fn keeps_insertion_order() {
        let store = store_with(Arc::new(MemoryStore::new()));
        store.toggle_subscribe(channel("b", "B")).unwrap();
        store.toggle_subscribe(channel("a", "A")).unwrap();
        store.toggle_subscribe(channel("c", "C")).unwrap();
        store.toggle_subscribe(channel("a", "A")).unwrap();

        let ids: Vec<_> = store.list_subscriptions().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn empty_id_is_rejected_without_writing() {
        let backend = Arc::new(MemoryStore::new());
        let store = store_with(backend.clone());
        assert_eq!(
            store.toggle_subscribe(channel("  ", "Nobody")),
            Err(SubscriptionError::Validation)
        );
        assert!(backend.is_empty());
    }

    #[test]
    fn reads_legacy_image_field() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .put(
                SUBSCRIPTIONS_KEY,
                r#"[{"id":"c1","name":"One","image":"https://img/1.png"}]"#,
            )
            .unwrap();
        let store = store_with(backend);
        assert_eq!(store.list_subscriptions()[0].image_url, "https://img/1.png");
    }
}

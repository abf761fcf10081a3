use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog::{self, CatalogError, Category, Video};
use crate::comments::{Comment, CommentStore};
use crate::interactions::InteractionStore;
use crate::persist::Persisted;
use crate::settings::SettingsStore;
use crate::storage::KeyValue;
use crate::subscriptions::{SubscribedChannel, SubscriptionStore};

pub trait VideoService: Send + Sync {
    fn list_by_category(&self, category: Category) -> Result<Vec<Video>, CatalogError>;
    fn search(&self, term: &str) -> Result<Vec<Video>, CatalogError>;
    fn get_by_id(&self, id: &str) -> Result<Video, CatalogError>;
    fn get_many_by_ids(&self, ids: &[String]) -> Vec<Video>;
}

impl VideoService for catalog::Client {
    fn list_by_category(&self, category: Category) -> Result<Vec<Video>, CatalogError> {
        catalog::Client::list_by_category(self, category)
    }

    fn search(&self, term: &str) -> Result<Vec<Video>, CatalogError> {
        catalog::Client::search(self, term)
    }

    fn get_by_id(&self, id: &str) -> Result<Video, CatalogError> {
        catalog::Client::get_by_id(self, id)
    }

    fn get_many_by_ids(&self, ids: &[String]) -> Vec<Video> {
        catalog::Client::get_many_by_ids(self, ids)
    }
}

/// Every local store, sharing one storage handle.
pub struct Library {
    persisted: Arc<Persisted>,
    pub interactions: InteractionStore,
    pub subscriptions: SubscriptionStore,
    pub comments: CommentStore,
    pub settings: SettingsStore,
}

impl Library {
    pub fn open(backend: Arc<dyn KeyValue>, default_author: &str) -> Self {
        let persisted = Arc::new(Persisted::new(backend));
        Self {
            interactions: InteractionStore::load(persisted.clone()),
            subscriptions: SubscriptionStore::load(persisted.clone()),
            comments: CommentStore::new(persisted.clone(), default_author),
            settings: SettingsStore::load(persisted.clone()),
            persisted,
        }
    }

    /// True once storage has failed and changes only live in memory.
    pub fn is_degraded(&self) -> bool {
        self.persisted.is_degraded()
    }
}

#[derive(Debug, Clone)]
pub struct VideoPage {
    pub video: Video,
    pub liked: bool,
    pub saved: bool,
    pub subscribed: bool,
    pub comments: Vec<Comment>,
}

pub fn video_page(
    service: &dyn VideoService,
    library: &Library,
    video_id: &str,
) -> Result<VideoPage, CatalogError> {
    let video = service.get_by_id(video_id)?;
    Ok(VideoPage {
        liked: library.interactions.is_liked(&video.id),
        saved: library.interactions.is_saved(&video.id),
        subscribed: library.subscriptions.is_subscribed(&video.channel.id),
        comments: library.comments.list(&video.id),
        video,
    })
}

pub fn liked_videos(service: &dyn VideoService, library: &Library) -> Vec<Video> {
    service.get_many_by_ids(&library.interactions.liked())
}

pub fn saved_videos(service: &dyn VideoService, library: &Library) -> Vec<Video> {
    service.get_many_by_ids(&library.interactions.saved())
}

/// Looks up the video's channel and flips the subscription to it.
pub fn toggle_channel_of(
    service: &dyn VideoService,
    library: &Library,
    video_id: &str,
) -> Result<(SubscribedChannel, bool)> {
    let video = service
        .get_by_id(video_id)
        .with_context(|| format!("load video {video_id}"))?;
    let channel = SubscribedChannel::from(&video.channel);
    let subscribed = library
        .subscriptions
        .toggle_subscribe(channel.clone())
        .context("toggle subscription")?;
    Ok((channel, subscribed))
}

#[derive(Default)]
pub struct MockVideoService {
    pub videos: Vec<Video>,
}

impl MockVideoService {
    pub fn with_videos(videos: Vec<Video>) -> Self {
        Self { videos }
    }
}

impl VideoService for MockVideoService {
    fn list_by_category(&self, _category: Category) -> Result<Vec<Video>, CatalogError> {
        Ok(self.videos.clone())
    }

    fn search(&self, term: &str) -> Result<Vec<Video>, CatalogError> {
        let needle = term.trim().to_lowercase();
        Ok(self
            .videos
            .iter()
            .filter(|video| needle.is_empty() || video.title.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn get_by_id(&self, id: &str) -> Result<Video, CatalogError> {
        self.videos
            .iter()
            .find(|video| video.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    fn get_many_by_ids(&self, ids: &[String]) -> Vec<Video> {
        ids.iter().filter_map(|id| self.get_by_id(id).ok()).collect()
    }
}

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::persist::Persisted;

pub const DEFAULT_AUTHOR: &str = "You";

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CommentError {
    #[error("comment text must not be empty")]
    Validation,
    #[error("comment {comment_id} not found on video {video_id}")]
    NotFound { video_id: String, comment_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub text: String,
    pub author: String,
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub dislikes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

#[derive(Debug, Default)]
struct Thread {
    comments: Vec<Comment>,
    reactions: BTreeMap<u64, Reaction>,
}

impl Thread {
    fn position(&self, video_id: &str, comment_id: u64) -> Result<usize, CommentError> {
        self.comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or_else(|| CommentError::NotFound {
                video_id: video_id.to_string(),
                comment_id,
            })
    }

    fn next_id(&self, now: DateTime<Utc>) -> u64 {
        let stamp = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let newest = self.comments.iter().map(|c| c.id).max().unwrap_or(0);
        stamp.max(newest.saturating_add(1))
    }
}

/// Per-video comment threads and the viewer's reaction to each comment.
pub struct CommentStore {
    persisted: Arc<Persisted>,
    default_author: String,
    threads: RwLock<HashMap<String, Thread>>,
}

pub fn comments_key(video_id: &str) -> String {
    format!("video_comments_{video_id}")
}

pub fn reactions_key(video_id: &str) -> String {
    format!("video_reactions_{video_id}")
}

impl CommentStore {
    pub fn new(persisted: Arc<Persisted>, default_author: impl Into<String>) -> Self {
        let default_author = default_author.into();
        let default_author = if default_author.trim().is_empty() {
            DEFAULT_AUTHOR.to_string()
        } else {
            default_author
        };
        Self {
            persisted,
            default_author,
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// Comments on a video, newest first.
    pub fn list(&self, video_id: &str) -> Vec<Comment> {
        self.with_thread(video_id, |thread| Ok(thread.comments.clone()))
            .unwrap_or_default()
    }

    pub fn reaction(&self, video_id: &str, comment_id: u64) -> Option<Reaction> {
        self.with_thread(video_id, |thread| Ok(thread.reactions.get(&comment_id).copied()))
            .unwrap_or_default()
    }

    pub fn add(&self, video_id: &str, text: &str, author: &str) -> Result<Comment, CommentError> {
        let text = validate(text)?;
        let author = match author.trim() {
            "" => self.default_author.clone(),
            name => name.to_string(),
        };
        let comment = self.with_thread(video_id, |thread| {
            let now = Utc::now();
            let comment = Comment {
                id: thread.next_id(now),
                text,
                author,
                created_at: now,
                updated_at: None,
                likes: 0,
                dislikes: 0,
            };
            thread.comments.insert(0, comment.clone());
            Ok(comment)
        })?;
        self.flush_comments(video_id);
        Ok(comment)
    }

    pub fn edit(&self, video_id: &str, comment_id: u64, text: &str) -> Result<(), CommentError> {
        self.with_thread(video_id, |thread| {
            let index = thread.position(video_id, comment_id)?;
            let text = validate(text)?;
            let comment = &mut thread.comments[index];
            comment.text = text;
            comment.updated_at = Some(Utc::now());
            Ok(())
        })?;
        self.flush_comments(video_id);
        Ok(())
    }

    pub fn delete(&self, video_id: &str, comment_id: u64) -> Result<(), CommentError> {
        self.with_thread(video_id, |thread| {
            let index = thread.position(video_id, comment_id)?;
            thread.comments.remove(index);
            thread.reactions.remove(&comment_id);
            Ok(())
        })?;
        self.flush_comments(video_id);
        self.flush_reactions(video_id);
        Ok(())
    }

    /// Applies the viewer's reaction and returns the resulting state.
    ///
    /// Repeating the current reaction clears it; switching moves one count
    /// from the old counter to the new one.
    pub fn react(
        &self,
        video_id: &str,
        comment_id: u64,
        kind: Reaction,
    ) -> Result<Option<Reaction>, CommentError> {
        let state = self.with_thread(video_id, |thread| {
            let index = thread.position(video_id, comment_id)?;
            let current = thread.reactions.get(&comment_id).copied();
            let comment = &mut thread.comments[index];
            let next = match (current, kind) {
                (None, Reaction::Like) => {
                    comment.likes = comment.likes.saturating_add(1);
                    Some(Reaction::Like)
                }
                (None, Reaction::Dislike) => {
                    comment.dislikes = comment.dislikes.saturating_add(1);
                    Some(Reaction::Dislike)
                }
                (Some(Reaction::Like), Reaction::Like) => {
                    comment.likes = comment.likes.saturating_sub(1);
                    None
                }
                (Some(Reaction::Dislike), Reaction::Dislike) => {
                    comment.dislikes = comment.dislikes.saturating_sub(1);
                    None
                }
                (Some(Reaction::Like), Reaction::Dislike) => {
                    comment.likes = comment.likes.saturating_sub(1);
                    comment.dislikes = comment.dislikes.saturating_add(1);
                    Some(Reaction::Dislike)
                }
                (Some(Reaction::Dislike), Reaction::Like) => {
                    comment.dislikes = comment.dislikes.saturating_sub(1);
                    comment.likes = comment.likes.saturating_add(1);
                    Some(Reaction::Like)
                }
            };
            match next {
                Some(reaction) => thread.reactions.insert(comment_id, reaction),
                None => thread.reactions.remove(&comment_id),
            };
            Ok(next)
        })?;
        self.flush_comments(video_id);
        self.flush_reactions(video_id);
        Ok(state)
    }

    fn with_thread<T>(
        &self,
        video_id: &str,
        f: impl FnOnce(&mut Thread) -> Result<T, CommentError>,
    ) -> Result<T, CommentError> {
        let mut threads = self.threads.write();
        let thread = threads
            .entry(video_id.to_string())
            .or_insert_with(|| self.load_thread(video_id));
        f(thread)
    }

    fn load_thread(&self, video_id: &str) -> Thread {
        let mut comments: Vec<Comment> = self.persisted.load_entries(&comments_key(video_id));
        comments.sort_by(|a, b| b.id.cmp(&a.id));
        let mut reactions: BTreeMap<u64, Reaction> = self.persisted.load(&reactions_key(video_id));
        reactions.retain(|id, _| comments.iter().any(|c| c.id == *id));
        Thread {
            comments,
            reactions,
        }
    }

    fn flush_comments(&self, video_id: &str) {
        let threads = self.threads.read();
        if let Some(thread) = threads.get(video_id) {
            let key = comments_key(video_id);
            if thread.comments.is_empty() {
                self.persisted.clear(&key);
            } else {
                self.persisted.save(&key, &thread.comments);
            }
        }
    }

    fn flush_reactions(&self, video_id: &str) {
        let threads = self.threads.read();
        if let Some(thread) = threads.get(video_id) {
            let key = reactions_key(video_id);
            if thread.reactions.is_empty() {
                self.persisted.clear(&key);
            } else {
                self.persisted.save(&key, &thread.reactions);
            }
        }
    }
}

fn validate(text: &str) -> Result<String, CommentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CommentError::Validation);
    }
    Ok(trimmed.to_string())
}

//! Data-access collaborator.
//!
//! The engine is transport-agnostic: anything that can answer these calls
//! (HTTP client, local database, test double) can back a viewer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::BackendError;
use crate::model::{Comment, Profile, SocialState, StoryItem};

#[async_trait::async_trait]
pub trait StoryBackend: Send + Sync + 'static {
    /// Stories not yet expired at `now`, in any order.
    async fn list_active_stories(&self, now: DateTime<Utc>) -> Result<Vec<StoryItem>, BackendError>;

    /// Batched profile lookup. Unknown ids are simply absent.
    async fn profiles(&self, author_ids: &[String]) -> Result<HashMap<String, Profile>, BackendError>;

    /// Fire-and-forget view record.
    async fn record_view(&self, story_id: &str) -> Result<(), BackendError>;

    async fn social_state(&self, story_id: &str, author_id: &str) -> Result<SocialState, BackendError>;

    async fn set_like(&self, story_id: &str, liked: bool) -> Result<(), BackendError>;

    async fn set_follow(&self, author_id: &str, following: bool) -> Result<(), BackendError>;

    async fn list_comments(&self, story_id: &str) -> Result<Vec<Comment>, BackendError>;

    async fn add_comment(&self, story_id: &str, body: &str) -> Result<Comment, BackendError>;
}

//! In-memory collaborator with failure injection and artificial latency.
//!
//! Backs the terminal player and the tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::StoryBackend;
use crate::comments::ViewerIdentity;
use crate::error::BackendError;
use crate::model::{Comment, Profile, SocialState, StoryItem};

/// Collaborator operations, for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    ListStories,
    Profiles,
    RecordView,
    SocialState,
    SetLike,
    SetFollow,
    ListComments,
    AddComment,
}

/// Seed counters for one story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSeed {
    pub story_id: String,
    #[serde(default)]
    pub like_count: u32,
    #[serde(default)]
    pub view_count: u32,
    #[serde(default)]
    pub liked: bool,
}

/// JSON fixture for a whole session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub viewer: Option<ViewerIdentity>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    #[serde(default)]
    pub stories: Vec<StoryItem>,
    #[serde(default)]
    pub social: Vec<SocialSeed>,
    /// Authors the viewer already follows.
    #[serde(default)]
    pub following: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Default)]
struct Inner {
    viewer: Option<ViewerIdentity>,
    stories: Vec<StoryItem>,
    profiles: HashMap<String, Profile>,
    like_counts: HashMap<String, u32>,
    view_counts: HashMap<String, u32>,
    liked: HashSet<String>,
    following: HashSet<String>,
    comments: Vec<Comment>,
    next_comment: u64,
    failing: HashSet<Op>,
    delays: HashMap<Op, Duration>,
    story_delays: HashMap<String, Duration>,
    calls: Vec<(Op, String)>,
}

#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let backend = Self::new();
        {
            let mut inner = backend.inner.lock().unwrap();
            inner.viewer = fixture.viewer;
            inner.profiles = fixture.profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
            inner.stories = fixture.stories;
            for seed in fixture.social {
                inner.like_counts.insert(seed.story_id.clone(), seed.like_count);
                inner.view_counts.insert(seed.story_id.clone(), seed.view_count);
                if seed.liked {
                    inner.liked.insert(seed.story_id);
                }
            }
            inner.following = fixture.following.into_iter().collect();
            inner.comments = fixture.comments;
        }
        backend
    }

    pub fn with_viewer(self, viewer: ViewerIdentity) -> Self {
        self.inner.lock().unwrap().viewer = Some(viewer);
        self
    }

    pub fn add_story(&self, story: StoryItem) {
        self.inner.lock().unwrap().stories.push(story);
    }

    pub fn add_profile(&self, profile: Profile) {
        self.inner.lock().unwrap().profiles.insert(profile.id.clone(), profile);
    }

    pub fn seed_likes(&self, story_id: &str, count: u32) {
        self.inner.lock().unwrap().like_counts.insert(story_id.to_string(), count);
    }

    /// Make every call of `op` fail (or succeed again).
    pub fn set_failing(&self, op: Op, failing: bool) {
        let mut inner = self.inner.lock().unwrap();
        if failing {
            inner.failing.insert(op);
        } else {
            inner.failing.remove(&op);
        }
    }

    /// Delay every call of `op`.
    pub fn set_delay(&self, op: Op, delay: Duration) {
        self.inner.lock().unwrap().delays.insert(op, delay);
    }

    /// Extra delay for social and comment fetches of one story.
    pub fn set_story_delay(&self, story_id: &str, delay: Duration) {
        self.inner
            .lock()
            .unwrap()
            .story_delays
            .insert(story_id.to_string(), delay);
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.inner.lock().unwrap().calls.iter().filter(|(o, _)| *o == op).count()
    }

    pub fn is_liked(&self, story_id: &str) -> bool {
        self.inner.lock().unwrap().liked.contains(story_id)
    }

    pub fn is_following(&self, author_id: &str) -> bool {
        self.inner.lock().unwrap().following.contains(author_id)
    }

    pub fn view_count(&self, story_id: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .view_counts
            .get(story_id)
            .copied()
            .unwrap_or(0)
    }

    /// Record the call, wait out any configured latency, then fail if
    /// `op` is marked failing.
    async fn enter(&self, op: Op, key: &str) -> Result<(), BackendError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push((op, key.to_string()));
            let base = inner.delays.get(&op).copied().unwrap_or_default();
            let per_story = match op {
                Op::SocialState | Op::ListComments => {
                    inner.story_delays.get(key).copied().unwrap_or_default()
                }
                _ => Duration::ZERO,
            };
            base + per_story
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.lock().unwrap().failing.contains(&op) {
            debug!(?op, key, "memory backend: injected failure");
            return Err(BackendError::Network(format!("{:?} unavailable", op)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl StoryBackend for MemoryBackend {
    async fn list_active_stories(&self, now: DateTime<Utc>) -> Result<Vec<StoryItem>, BackendError> {
        self.enter(Op::ListStories, "").await?;
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .stories
            .iter()
            .filter(|s| s.is_active_at(now))
            .cloned()
            .collect())
    }

    async fn profiles(&self, author_ids: &[String]) -> Result<HashMap<String, Profile>, BackendError> {
        self.enter(Op::Profiles, &author_ids.join(",")).await?;
        let inner = self.inner.lock().unwrap();
        Ok(author_ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    async fn record_view(&self, story_id: &str) -> Result<(), BackendError> {
        self.enter(Op::RecordView, story_id).await?;
        let mut inner = self.inner.lock().unwrap();
        *inner.view_counts.entry(story_id.to_string()).or_default() += 1;
        Ok(())
    }

    async fn social_state(&self, story_id: &str, author_id: &str) -> Result<SocialState, BackendError> {
        self.enter(Op::SocialState, story_id).await?;
        let inner = self.inner.lock().unwrap();
        Ok(SocialState {
            is_liked: inner.liked.contains(story_id),
            like_count: inner.like_counts.get(story_id).copied().unwrap_or(0),
            is_following_author: inner.following.contains(author_id),
            view_count: inner.view_counts.get(story_id).copied().unwrap_or(0),
        })
    }

    async fn set_like(&self, story_id: &str, liked: bool) -> Result<(), BackendError> {
        self.enter(Op::SetLike, story_id).await?;
        let mut inner = self.inner.lock().unwrap();
        let changed = if liked {
            inner.liked.insert(story_id.to_string())
        } else {
            inner.liked.remove(story_id)
        };
        if changed {
            let count = inner.like_counts.entry(story_id.to_string()).or_default();
            *count = if liked {
                count.saturating_add(1)
            } else {
                count.saturating_sub(1)
            };
        }
        Ok(())
    }

    async fn set_follow(&self, author_id: &str, following: bool) -> Result<(), BackendError> {
        self.enter(Op::SetFollow, author_id).await?;
        let mut inner = self.inner.lock().unwrap();
        if following {
            inner.following.insert(author_id.to_string());
        } else {
            inner.following.remove(author_id);
        }
        Ok(())
    }

    async fn list_comments(&self, story_id: &str) -> Result<Vec<Comment>, BackendError> {
        self.enter(Op::ListComments, story_id).await?;
        let inner = self.inner.lock().unwrap();
        let mut comments: Vec<Comment> = inner
            .comments
            .iter()
            .filter(|c| c.story_id == story_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn add_comment(&self, story_id: &str, body: &str) -> Result<Comment, BackendError> {
        self.enter(Op::AddComment, story_id).await?;
        let mut inner = self.inner.lock().unwrap();
        let viewer = inner.viewer.clone().ok_or(BackendError::Unauthenticated)?;
        inner.next_comment += 1;
        let comment = Comment {
            id: format!("c{}", inner.next_comment),
            story_id: story_id.to_string(),
            author_id: viewer.id,
            author_display: viewer.display_name,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }
}

//! Story domain types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback display time for images without a duration hint.
pub const DEFAULT_IMAGE_SECONDS: f64 = 6.0;

/// Upper bound on an image's display time.
pub const MAX_IMAGE_SECONDS: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// One piece of playable media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    pub id: String,
    pub author_id: String,
    pub media_url: String,
    pub media_kind: MediaKind,
    pub created_at: DateTime<Utc>,
    /// Display time for images. Ignored for video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoryItem {
    /// Whether the item is still playable at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Display duration for an image, falling back to `default_seconds`
    /// when the hint is missing or not a positive finite number. Capped at
    /// [`MAX_IMAGE_SECONDS`].
    pub fn image_duration(&self, default_seconds: f64) -> Duration {
        let usable = |s: &f64| s.is_finite() && *s > 0.0;
        let secs = self
            .duration_hint_seconds
            .filter(usable)
            .or(Some(default_seconds).filter(usable))
            .unwrap_or(DEFAULT_IMAGE_SECONDS);
        Duration::from_secs_f64(secs.clamp(0.001, MAX_IMAGE_SECONDS))
    }
}

/// Author profile summary shown in the viewer header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Profile {
    /// Placeholder for an author missing from the profile lookup.
    pub fn unknown(author_id: &str) -> Self {
        Self {
            id: author_id.to_string(),
            display_name: author_id.to_string(),
            avatar: None,
        }
    }
}

/// All active stories of one author, oldest first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorGroup {
    pub author_id: String,
    pub profile: Profile,
    pub items: Vec<StoryItem>,
}

impl AuthorGroup {
    /// `created_at` of the newest item; the catalog sort key.
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        self.items.last().map(|item| item.created_at)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Position of the displayed story. Ordered lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub author_index: usize,
    pub story_index: usize,
}

impl Cursor {
    pub const START: Cursor = Cursor {
        author_index: 0,
        story_index: 0,
    };

    pub fn new(author_index: usize, story_index: usize) -> Self {
        Self {
            author_index,
            story_index,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.author_index, self.story_index)
    }
}

/// Playback state of the active story.
///
/// Precedence when surfaces overlap: `Suspended` over `Paused` over
/// `Playing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackState {
    Playing,
    /// Paused by the user.
    Paused,
    /// Paused because another surface (comments) is covering the story.
    Suspended,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }
}

/// Per-story, per-viewer social counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialState {
    pub is_liked: bool,
    pub like_count: u32,
    pub is_following_author: bool,
    pub view_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub story_id: String,
    pub author_id: String,
    pub author_display: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

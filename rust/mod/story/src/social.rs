//! SocialStateStore: like / follow / view state for the session.
//!
//! Like and view counters are keyed by story; the follow flag is keyed by
//! author and therefore shared by all of that author's stories.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::BackendError;
use crate::model::SocialState;
use crate::optimistic::{Ledger, Mutation, MutationId, Settlement};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StoryCounters {
    is_liked: bool,
    like_count: u32,
    view_count: u32,
}

/// Session cache partitioned by story id and author id.
#[derive(Debug, Default)]
pub struct SocialCache {
    stories: HashMap<String, StoryCounters>,
    follows: HashMap<String, bool>,
}

/// Optimistic social change. Holds the pre-toggle value for rollback.
#[derive(Debug, Clone, PartialEq)]
pub enum SocialMutation {
    Like {
        story_id: String,
        liked: bool,
        before: (bool, u32),
    },
    Follow {
        author_id: String,
        following: bool,
        before: bool,
    },
}

impl Mutation<SocialCache> for SocialMutation {
    type Output = ();

    fn apply(&self, cache: &mut SocialCache) {
        match self {
            SocialMutation::Like { story_id, liked, before } => {
                let entry = cache.stories.entry(story_id.clone()).or_default();
                entry.is_liked = *liked;
                entry.like_count = if *liked {
                    before.1.saturating_add(1)
                } else {
                    before.1.saturating_sub(1)
                };
            }
            SocialMutation::Follow { author_id, following, .. } => {
                cache.follows.insert(author_id.clone(), *following);
            }
        }
    }

    fn revert(&self, cache: &mut SocialCache) {
        match self {
            SocialMutation::Like { story_id, before, .. } => {
                let entry = cache.stories.entry(story_id.clone()).or_default();
                entry.is_liked = before.0;
                entry.like_count = before.1;
            }
            SocialMutation::Follow { author_id, before, .. } => {
                cache.follows.insert(author_id.clone(), *before);
            }
        }
    }
}

/// Request to send after an optimistic toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocialRequest {
    SetLike { id: MutationId, story_id: String, liked: bool },
    SetFollow { id: MutationId, author_id: String, following: bool },
}

#[derive(Debug, Default)]
pub struct SocialStateStore {
    cache: SocialCache,
    ledger: Ledger<SocialMutation>,
    loading: HashSet<String>,
    viewed: HashSet<String>,
}

impl SocialStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ====================================================================
    // Loading
    // ====================================================================

    /// Mark a fetch for `story_id` as started. Returns false when the
    /// story is already cached or a fetch is in flight.
    pub fn begin_load(&mut self, story_id: &str, author_id: &str) -> bool {
        if self.loading.contains(story_id) {
            return false;
        }
        if self.cache.stories.contains_key(story_id) && self.cache.follows.contains_key(author_id) {
            return false;
        }
        self.loading.insert(story_id.to_string());
        true
    }

    /// Apply a fetch result. Values with an in-flight toggle keep their
    /// optimistic state; a failure leaves the story uncached.
    pub fn apply_loaded(&mut self, story_id: &str, author_id: &str, result: Result<SocialState, BackendError>) {
        self.loading.remove(story_id);
        let state = match result {
            Ok(state) => state,
            Err(e) => {
                warn!(story_id, error = %e, "social: load failed");
                return;
            }
        };
        if !self.like_pending(story_id) {
            self.cache.stories.insert(
                story_id.to_string(),
                StoryCounters {
                    is_liked: state.is_liked,
                    like_count: state.like_count,
                    view_count: state.view_count,
                },
            );
        }
        if !self.follow_pending(author_id) {
            self.cache.follows.insert(author_id.to_string(), state.is_following_author);
        }
    }

    /// Forget an in-flight fetch whose response is stale.
    pub fn discard_load(&mut self, story_id: &str) {
        if self.loading.remove(story_id) {
            debug!(story_id, "social: stale load discarded");
        }
    }

    pub fn is_loading(&self, story_id: &str) -> bool {
        self.loading.contains(story_id)
    }

    /// Record the first activation of a story. True only the first time.
    pub fn mark_viewed(&mut self, story_id: &str) -> bool {
        self.viewed.insert(story_id.to_string())
    }

    /// Cached state for a story, if loaded.
    pub fn state_for(&self, story_id: &str, author_id: &str) -> Option<SocialState> {
        let counters = self.cache.stories.get(story_id)?;
        Some(SocialState {
            is_liked: counters.is_liked,
            like_count: counters.like_count,
            is_following_author: self.cache.follows.get(author_id).copied().unwrap_or(false),
            view_count: counters.view_count,
        })
    }

    // ====================================================================
    // Optimistic toggles
    // ====================================================================

    /// Flip the like on `story_id`. `None` if the story is not loaded or a
    /// like request for it is already in flight.
    pub fn toggle_like(&mut self, story_id: &str) -> Option<SocialRequest> {
        if self.like_pending(story_id) {
            debug!(story_id, "social: like already in flight");
            return None;
        }
        let counters = *self.cache.stories.get(story_id)?;
        let liked = !counters.is_liked;
        let id = self.ledger.begin(
            &mut self.cache,
            SocialMutation::Like {
                story_id: story_id.to_string(),
                liked,
                before: (counters.is_liked, counters.like_count),
            },
        );
        Some(SocialRequest::SetLike {
            id,
            story_id: story_id.to_string(),
            liked,
        })
    }

    /// Flip the follow on `author_id`. `None` if not loaded or in flight.
    pub fn toggle_follow(&mut self, author_id: &str) -> Option<SocialRequest> {
        if self.follow_pending(author_id) {
            debug!(author_id, "social: follow already in flight");
            return None;
        }
        let before = *self.cache.follows.get(author_id)?;
        let id = self.ledger.begin(
            &mut self.cache,
            SocialMutation::Follow {
                author_id: author_id.to_string(),
                following: !before,
                before,
            },
        );
        Some(SocialRequest::SetFollow {
            id,
            author_id: author_id.to_string(),
            following: !before,
        })
    }

    /// Settle a like/follow request. Failures revert to the pre-toggle
    /// value; success keeps the optimistic value without reconciling
    /// counts.
    pub fn settle(&mut self, id: MutationId, result: Result<(), BackendError>) -> Settlement {
        self.ledger.settle(&mut self.cache, id, result)
    }

    pub fn like_pending(&self, story_id: &str) -> bool {
        self.ledger
            .any(|m| matches!(m, SocialMutation::Like { story_id: s, .. } if s == story_id))
    }

    pub fn follow_pending(&self, author_id: &str) -> bool {
        self.ledger
            .any(|m| matches!(m, SocialMutation::Follow { author_id: a, .. } if a == author_id))
    }
}

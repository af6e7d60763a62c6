//! CommentThreadController: comment list and composer for the active
//! story.
//!
//! Only the active story's thread is held in memory; switching stories
//! discards it and a later return reloads from the collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BackendError, CommentRejected};
use crate::model::Comment;
use crate::optimistic::{Ledger, Mutation, MutationId, Settlement};

/// Authenticated identity of the person watching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerIdentity {
    pub id: String,
    pub display_name: String,
}

/// A comment as shown in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentEntry {
    pub comment: Comment,
    /// Appended locally, not yet confirmed by the collaborator.
    pub pending: bool,
}

/// Optimistic append of one comment, identified by its local id.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendComment {
    pub local: Comment,
}

impl Mutation<Vec<CommentEntry>> for AppendComment {
    type Output = Comment;

    fn apply(&self, entries: &mut Vec<CommentEntry>) {
        entries.push(CommentEntry {
            comment: self.local.clone(),
            pending: true,
        });
    }

    fn revert(&self, entries: &mut Vec<CommentEntry>) {
        entries.retain(|e| e.comment.id != self.local.id);
    }

    /// Swap the local entry for the server echo. If the echo is already
    /// listed (a reload raced the submit) the local entry is dropped.
    fn confirm(&self, entries: &mut Vec<CommentEntry>, echo: Comment) {
        if entries.iter().any(|e| e.comment.id == echo.id) {
            entries.retain(|e| e.comment.id != self.local.id);
            return;
        }
        match entries.iter_mut().find(|e| e.comment.id == self.local.id) {
            Some(entry) => {
                entry.comment = echo;
                entry.pending = false;
            }
            None => entries.push(CommentEntry {
                comment: echo,
                pending: false,
            }),
        }
    }
}

/// A submission to send to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: MutationId,
    pub story_id: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct CommentThread {
    story_id: Option<String>,
    entries: Vec<CommentEntry>,
    loading: bool,
    draft: String,
    busy: bool,
    ledger: Ledger<AppendComment>,
    next_local: u64,
}

impl CommentThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn story_id(&self) -> Option<&str> {
        self.story_id.as_deref()
    }

    pub fn entries(&self) -> &[CommentEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Composer disabled while a submission is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Point the thread at `story_id`, discarding the previous list, draft
    /// and in-flight submissions. Returns true if a fetch must be issued.
    pub fn load_for(&mut self, story_id: &str) -> bool {
        self.story_id = Some(story_id.to_string());
        self.entries.clear();
        self.ledger.clear();
        self.draft.clear();
        self.busy = false;
        self.loading = true;
        true
    }

    /// Drop everything (viewer closed).
    pub fn reset(&mut self) {
        self.story_id = None;
        self.entries.clear();
        self.ledger.clear();
        self.draft.clear();
        self.busy = false;
        self.loading = false;
    }

    /// Apply a list fetch. Returns false for a stale response.
    pub fn apply_loaded(&mut self, story_id: &str, result: Result<Vec<Comment>, BackendError>) -> bool {
        if self.story_id.as_deref() != Some(story_id) {
            debug!(story_id, "comments: stale load discarded");
            return false;
        }
        self.loading = false;
        let mut fetched = match result {
            Ok(comments) => comments,
            Err(e) => {
                warn!(story_id, error = %e, "comments: load failed");
                Vec::new()
            }
        };
        fetched.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        // Keep optimistic entries that the server list does not echo yet.
        let pending: Vec<CommentEntry> = self
            .entries
            .drain(..)
            .filter(|e| e.pending)
            .collect();
        self.entries = fetched
            .into_iter()
            .map(|comment| CommentEntry {
                comment,
                pending: false,
            })
            .collect();
        self.entries.extend(pending);
        true
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Submit the current draft. On success the draft is cleared, the
    /// comment is appended optimistically and the composer is disabled.
    pub fn submit(
        &mut self,
        viewer: Option<&ViewerIdentity>,
        now: DateTime<Utc>,
    ) -> Result<Submission, CommentRejected> {
        let story_id = self.story_id.clone().ok_or(CommentRejected::NoActiveStory)?;
        if self.busy {
            return Err(CommentRejected::Busy);
        }
        let body = self.draft.trim().to_string();
        if body.is_empty() {
            return Err(CommentRejected::EmptyBody);
        }
        let viewer = viewer.ok_or(CommentRejected::Unauthenticated)?;

        self.next_local += 1;
        let local = Comment {
            id: format!("local-{}", self.next_local),
            story_id: story_id.clone(),
            author_id: viewer.id.clone(),
            author_display: viewer.display_name.clone(),
            body: body.clone(),
            created_at: now,
        };
        let id = self.ledger.begin(&mut self.entries, AppendComment { local });
        self.draft.clear();
        self.busy = true;
        Ok(Submission { id, story_id, body })
    }

    /// Settle a submission. Failure removes the optimistic entry and
    /// re-enables the composer; the draft is not restored.
    pub fn settle(&mut self, story_id: &str, id: MutationId, result: Result<Comment, BackendError>) -> Settlement {
        if self.story_id.as_deref() != Some(story_id) {
            debug!(story_id, "comments: stale submission result discarded");
            return Settlement::Unknown;
        }
        let settlement = self.ledger.settle(&mut self.entries, id, result);
        if settlement != Settlement::Unknown {
            self.busy = false;
        }
        settlement
    }
}

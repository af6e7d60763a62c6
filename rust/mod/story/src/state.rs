//! Render-facing state published to the flux store.
//!
//! Host surfaces subscribe to `viewer/#` and render whatever arrives;
//! they never read engine internals.

use reel_flux_derive::state;
use serde::Serialize;

use crate::comments::CommentEntry;
use crate::model::{Cursor, PlaybackState, Profile, SocialState, StoryItem};
use crate::navigation::CloseReason;

/// Viewer frame: stored at `viewer/state`.
#[state("viewer/state")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerView {
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story: Option<StoryItem>,
    pub author_count: usize,
    pub group_len: usize,
    /// `None` while the viewer is closed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback: Option<PlaybackState>,
    pub comments_open: bool,
    /// One value per story in the active group.
    pub indicators: Vec<f64>,
}

impl ViewerView {
    /// Frame published while no viewer session is open.
    pub fn closed() -> Self {
        Self {
            open: false,
            cursor: None,
            profile: None,
            story: None,
            author_count: 0,
            group_len: 0,
            playback: None,
            comments_open: false,
            indicators: Vec::new(),
        }
    }
}

/// Live progress of the active story: stored at `viewer/progress`.
#[state("viewer/progress")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub story_id: String,
    pub progress: f64,
}

/// Social counters of the active story: stored at `viewer/social`.
#[state("viewer/social")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialView {
    pub story_id: String,
    pub author_id: String,
    /// `None` until the first load lands (or after it failed).
    pub state: Option<SocialState>,
    pub loading: bool,
    pub like_pending: bool,
    pub follow_pending: bool,
}

/// Comment surface: stored at `viewer/comments`.
#[state("viewer/comments")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsView {
    pub story_id: Option<String>,
    pub entries: Vec<CommentEntry>,
    pub loading: bool,
    pub draft: String,
    pub busy: bool,
    pub open: bool,
}

/// Desired state of the host media element: stored at `viewer/media`.
///
/// Published for video items only.
#[state("viewer/media")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaControl {
    pub story_id: String,
    pub playing: bool,
}

/// Emitted once per close: stored at `viewer/closed`.
#[state("viewer/closed")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedEvent {
    pub reason: CloseReason,
}

/// Progress bar values for a group: full before `story_index`, live at
/// it, empty after.
pub fn progress_indicators(story_index: usize, group_len: usize, progress: f64) -> Vec<f64> {
    let live = progress.clamp(0.0, 1.0);
    (0..group_len)
        .map(|i| match i.cmp(&story_index) {
            std::cmp::Ordering::Less => 1.0,
            std::cmp::Ordering::Equal => live,
            std::cmp::Ordering::Greater => 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_flux::State;

    #[test]
    fn indicators_fill_left_of_cursor() {
        assert_eq!(progress_indicators(1, 3, 0.25), vec![1.0, 0.25, 0.0]);
        assert_eq!(progress_indicators(0, 1, 1.5), vec![1.0]);
        assert!(progress_indicators(0, 0, 0.5).is_empty());
    }

    #[test]
    fn paths() {
        assert_eq!(ViewerView::PATH, "viewer/state");
        assert_eq!(ProgressView::PATH, "viewer/progress");
        assert_eq!(SocialView::PATH, "viewer/social");
        assert_eq!(CommentsView::PATH, "viewer/comments");
        assert_eq!(MediaControl::PATH, "viewer/media");
        assert_eq!(ClosedEvent::PATH, "viewer/closed");
    }

    #[test]
    fn closed_frame_has_no_playback() {
        let frame = ViewerView::closed();
        assert!(!frame.open);
        assert_eq!(frame.playback, None);
        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("playback").is_none());
        assert_eq!(json["open"], false);
    }

    #[test]
    fn closed_event_json() {
        let json = serde_json::to_value(ClosedEvent {
            reason: CloseReason::EndOfStories,
        })
        .unwrap();
        assert_eq!(json["reason"], "endOfStories");
    }
}

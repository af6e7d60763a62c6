//! StoryViewer: the sans-IO playback engine.
//!
//! Composes navigation, the playback clock, social state and the comment
//! thread. Time is injected by the caller; collaborator calls leave as
//! [`Effect`]s and come back as [`Completion`]s. Every change a host can
//! render is published to the flux store under `viewer/*`.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use reel_flux::{State, StateStore};
use tracing::{debug, info, warn};

use crate::catalog::StoryCatalog;
use crate::clock::{ClockSignal, PlaybackClock};
use crate::comments::{CommentThread, ViewerIdentity};
use crate::config::ViewerConfig;
use crate::error::{BackendError, CommentRejected, ViewerError};
use crate::model::{AuthorGroup, Comment, Cursor, MediaKind, PlaybackState, SocialState, StoryItem};
use crate::navigation::{CloseReason, NavigationController, Transition};
use crate::optimistic::{MutationId, Settlement};
use crate::shell::{resolve_key, Key, MediaEvent, ShellCommand, TapZones};
use crate::social::{SocialRequest, SocialStateStore};
use crate::state::{
    progress_indicators, ClosedEvent, CommentsView, MediaControl, ProgressView, SocialView,
    ViewerView,
};

/// Collaborator work requested by the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LoadSocial { story_id: String, author_id: String },
    RecordView { story_id: String },
    LoadComments { story_id: String },
    SetLike { id: MutationId, story_id: String, liked: bool },
    SetFollow { id: MutationId, author_id: String, following: bool },
    AddComment { id: MutationId, story_id: String, body: String },
    /// Rebuild the catalog from the collaborator (explicit refresh).
    ReloadCatalog,
}

/// Result of an [`Effect`], fed back through [`StoryViewer::complete`].
#[derive(Debug, Clone)]
pub enum Completion {
    SocialLoaded {
        story_id: String,
        author_id: String,
        result: Result<SocialState, BackendError>,
    },
    CommentsLoaded {
        story_id: String,
        result: Result<Vec<Comment>, BackendError>,
    },
    LikeSettled {
        id: MutationId,
        story_id: String,
        result: Result<(), BackendError>,
    },
    FollowSettled {
        id: MutationId,
        author_id: String,
        result: Result<(), BackendError>,
    },
    CommentAdded {
        id: MutationId,
        story_id: String,
        result: Result<Comment, BackendError>,
    },
    ViewRecorded {
        story_id: String,
        result: Result<(), BackendError>,
    },
    CatalogLoaded {
        result: Result<StoryCatalog, BackendError>,
    },
}

pub struct StoryViewer {
    config: ViewerConfig,
    zones: TapZones,
    identity: Option<ViewerIdentity>,
    store: Arc<StateStore>,
    nav: Option<NavigationController>,
    clock: Option<PlaybackClock>,
    social: SocialStateStore,
    comments: CommentThread,
    comments_open: bool,
    effects: Vec<Effect>,
    closed: Option<CloseReason>,
    last_progress: f64,
}

impl StoryViewer {
    pub fn new(config: ViewerConfig, store: Arc<StateStore>) -> Self {
        let (left, right) = config.zones();
        let identity = config.viewer();
        store.set_state(ViewerView::closed());
        Self {
            config,
            zones: TapZones::new(left, right),
            identity,
            store,
            nav: None,
            clock: None,
            social: SocialStateStore::new(),
            comments: CommentThread::new(),
            comments_open: false,
            effects: Vec::new(),
            closed: None,
            last_progress: 0.0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn is_open(&self) -> bool {
        self.nav.is_some()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.nav.as_ref().map(|nav| nav.cursor())
    }

    pub fn playback(&self) -> Option<PlaybackState> {
        self.nav.as_ref().map(|nav| nav.playback())
    }

    pub fn progress(&self) -> f64 {
        self.clock.as_ref().map(|c| c.progress()).unwrap_or(0.0)
    }

    pub fn active_story(&self) -> Option<&StoryItem> {
        let nav = self.nav.as_ref()?;
        nav.catalog().item(nav.cursor())
    }

    pub fn active_group(&self) -> Option<&AuthorGroup> {
        let nav = self.nav.as_ref()?;
        nav.catalog().group(nav.cursor().author_index)
    }

    /// Cached social state of the active story.
    pub fn social_state(&self) -> Option<SocialState> {
        let story = self.active_story()?;
        self.social.state_for(&story.id, &story.author_id)
    }

    pub fn comments(&self) -> &CommentThread {
        &self.comments
    }

    pub fn comments_open(&self) -> bool {
        self.comments_open
    }

    /// Why the viewer last closed. Cleared by `open`.
    pub fn closed_reason(&self) -> Option<CloseReason> {
        self.closed
    }

    /// Take the effects queued since the last call.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn active_ids(&self) -> Option<(String, String)> {
        self.active_story()
            .map(|s| (s.id.clone(), s.author_id.clone()))
    }

    // ========================================================================
    // Open / close
    // ========================================================================

    /// Open at `initial`, clamped into the catalog.
    pub fn open(&mut self, catalog: Arc<StoryCatalog>, initial: Cursor, now: Instant) -> Result<(), ViewerError> {
        let nav = NavigationController::new(catalog, initial).ok_or(ViewerError::EmptyCatalog)?;
        info!(
            cursor = %nav.cursor(),
            authors = nav.catalog().len(),
            stories = nav.catalog().story_count(),
            "viewer: open"
        );
        self.nav = Some(nav);
        self.closed = None;
        self.comments_open = false;
        self.activate(now);
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), ViewerError> {
        if self.nav.is_none() {
            return Err(ViewerError::NotOpen);
        }
        self.finish(CloseReason::UserDismissed);
        Ok(())
    }

    fn finish(&mut self, reason: CloseReason) {
        self.clock = None;
        self.nav = None;
        self.comments.reset();
        self.comments_open = false;
        self.closed = Some(reason);
        self.last_progress = 0.0;
        info!(?reason, "viewer: closed");

        self.store.remove(ProgressView::PATH);
        self.store.remove(SocialView::PATH);
        self.store.remove(MediaControl::PATH);
        self.store.set_state(ViewerView::closed());
        self.publish_comments();
        self.store.set_state(ClosedEvent { reason });
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn advance(&mut self, now: Instant) -> Transition {
        self.navigate(now, NavigationController::advance)
    }

    pub fn retreat(&mut self, now: Instant) -> Transition {
        self.navigate(now, NavigationController::retreat)
    }

    pub fn advance_author(&mut self, now: Instant) -> Transition {
        self.navigate(now, NavigationController::advance_author)
    }

    pub fn retreat_author(&mut self, now: Instant) -> Transition {
        self.navigate(now, NavigationController::retreat_author)
    }

    pub fn jump_to_author(&mut self, author_index: usize, now: Instant) -> Transition {
        self.navigate(now, |nav| nav.jump_to_author(author_index))
    }

    fn navigate(&mut self, now: Instant, step: impl FnOnce(&mut NavigationController) -> Transition) -> Transition {
        let Some(nav) = self.nav.as_mut() else {
            return Transition::Stay;
        };
        let transition = step(nav);
        self.apply(transition, now);
        transition
    }

    fn apply(&mut self, transition: Transition, now: Instant) {
        match transition {
            Transition::Moved { .. } => self.activate(now),
            Transition::Close(reason) => self.finish(reason),
            Transition::Stay => {}
        }
    }

    /// Enter the story under the cursor: replace the clock, then request
    /// whatever the story still needs from the collaborator.
    fn activate(&mut self, now: Instant) {
        self.clock = None;
        let Some(nav) = self.nav.as_ref() else {
            return;
        };
        let Some(item) = nav.catalog().item(nav.cursor()) else {
            return;
        };
        let running = nav.playback().is_playing();
        let clock = PlaybackClock::for_item(item, self.config.image_seconds(), running, now);
        let story_id = item.id.clone();
        let author_id = item.author_id.clone();
        self.clock = Some(clock);
        self.last_progress = 0.0;

        if self.social.begin_load(&story_id, &author_id) {
            self.effects.push(Effect::LoadSocial {
                story_id: story_id.clone(),
                author_id: author_id.clone(),
            });
        }
        if self.social.mark_viewed(&story_id) {
            self.effects.push(Effect::RecordView {
                story_id: story_id.clone(),
            });
        }
        if self.comments.load_for(&story_id) {
            self.effects.push(Effect::LoadComments {
                story_id: story_id.clone(),
            });
        }
        debug!(story_id, author_id, "viewer: story active");
        self.publish_all();
    }

    /// Swap in a freshly built catalog. The active story is kept when it
    /// survives, with its progress and playback state as they were;
    /// otherwise playback restarts at the first group. An empty catalog
    /// closes the viewer.
    pub fn refresh(&mut self, catalog: Arc<StoryCatalog>, now: Instant) -> Transition {
        let Some(nav) = self.nav.as_mut() else {
            return Transition::Stay;
        };
        let kept = nav
            .catalog()
            .item(nav.cursor())
            .and_then(|item| catalog.find_story(&item.id));
        let transition = nav.rebase(catalog, kept);
        info!(?transition, kept = kept.is_some(), "viewer: catalog refreshed");

        match transition {
            Transition::Moved { .. } if kept.is_some() => self.publish_all(),
            _ => self.apply(transition, now),
        }
        transition
    }

    /// Queue a catalog reload. Ignored while closed.
    pub fn request_refresh(&mut self) -> bool {
        if self.nav.is_none() {
            return false;
        }
        self.effects.push(Effect::ReloadCatalog);
        true
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Sample the image timer. Advances when the active story finishes.
    pub fn tick(&mut self, now: Instant) {
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        if clock.tick(now) == Some(ClockSignal::Advance) {
            debug!(story_id = clock.story_id(), "viewer: timer finished");
            self.advance(now);
            return;
        }
        self.publish_progress_if_changed();
    }

    pub fn toggle_pause(&mut self, now: Instant) -> Option<PlaybackState> {
        let state = self.nav.as_mut()?.toggle_pause()?;
        self.playback_changed(state, now);
        Some(state)
    }

    pub fn pause(&mut self, now: Instant) -> Option<PlaybackState> {
        let state = self.nav.as_mut()?.pause()?;
        self.playback_changed(state, now);
        Some(state)
    }

    pub fn resume(&mut self, now: Instant) -> Option<PlaybackState> {
        let state = self.nav.as_mut()?.resume()?;
        self.playback_changed(state, now);
        Some(state)
    }

    fn playback_changed(&mut self, state: PlaybackState, now: Instant) {
        debug!(?state, "viewer: playback");
        self.sync_clock(now);
        self.publish_viewer();
        self.publish_media();
    }

    fn sync_clock(&mut self, now: Instant) {
        let playing = self.playback().map(PlaybackState::is_playing).unwrap_or(false);
        if let Some(clock) = self.clock.as_mut() {
            clock.set_running(playing, now);
        }
    }

    /// Report from the host media element. Events for any story other
    /// than the active video are dropped.
    pub fn media_event(&mut self, story_id: &str, event: MediaEvent, now: Instant) {
        let Some(clock) = self.clock.as_mut() else {
            return;
        };
        if clock.story_id() != story_id || !clock.is_media_driven() {
            debug!(story_id, ?event, "viewer: stale media event dropped");
            return;
        }
        match event {
            MediaEvent::TimeUpdate { current, duration } => {
                clock.on_media_time(current, duration);
                self.publish_progress_if_changed();
            }
            MediaEvent::Ended => {
                if clock.on_media_ended().is_some() {
                    self.advance(now);
                }
            }
            MediaEvent::Paused => {
                if self.playback() == Some(PlaybackState::Playing) {
                    self.pause(now);
                }
            }
            MediaEvent::Playing => {
                if self.playback() == Some(PlaybackState::Paused) {
                    self.resume(now);
                }
            }
        }
    }

    // ========================================================================
    // Shell input
    // ========================================================================

    /// Tap at `x`, a fraction of the media width. Ignored while the comment
    /// surface covers the media.
    pub fn tap(&mut self, x: f64, now: Instant) {
        if self.comments_open {
            return;
        }
        let command = self.zones.resolve(x);
        self.run_command(command, now);
    }

    pub fn key(&mut self, key: Key, now: Instant) {
        if let Some(command) = resolve_key(key, self.comments_open) {
            self.run_command(command, now);
        }
    }

    fn run_command(&mut self, command: ShellCommand, now: Instant) {
        match command {
            ShellCommand::Retreat => {
                self.retreat(now);
            }
            ShellCommand::Advance => {
                self.advance(now);
            }
            ShellCommand::TogglePause => {
                self.toggle_pause(now);
            }
            ShellCommand::Close => {
                let _ = self.close();
            }
        }
    }

    // ========================================================================
    // Social
    // ========================================================================

    /// Optimistically flip the like on the active story.
    pub fn toggle_like(&mut self) -> bool {
        let Some((story_id, _)) = self.active_ids() else {
            return false;
        };
        let request = self.social.toggle_like(&story_id);
        self.queue_social(request)
    }

    /// Optimistically flip the follow on the active author.
    pub fn toggle_follow(&mut self) -> bool {
        let Some((_, author_id)) = self.active_ids() else {
            return false;
        };
        let request = self.social.toggle_follow(&author_id);
        self.queue_social(request)
    }

    fn queue_social(&mut self, request: Option<SocialRequest>) -> bool {
        let Some(request) = request else {
            return false;
        };
        self.effects.push(match request {
            SocialRequest::SetLike { id, story_id, liked } => Effect::SetLike { id, story_id, liked },
            SocialRequest::SetFollow {
                id,
                author_id,
                following,
            } => Effect::SetFollow {
                id,
                author_id,
                following,
            },
        });
        self.publish_social();
        true
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Show the comment surface. Playback is suspended while it is open.
    pub fn open_comments(&mut self, now: Instant) -> Result<(), ViewerError> {
        let nav = self.nav.as_mut().ok_or(ViewerError::NotOpen)?;
        if self.comments_open {
            return Ok(());
        }
        self.comments_open = true;
        if let Some(state) = nav.suspend() {
            self.playback_changed(state, now);
        }
        self.publish_viewer();
        self.publish_comments();
        Ok(())
    }

    /// Hide the comment surface and return to the pre-open playback state.
    pub fn close_comments(&mut self, now: Instant) -> Result<(), ViewerError> {
        let nav = self.nav.as_mut().ok_or(ViewerError::NotOpen)?;
        if !self.comments_open {
            return Ok(());
        }
        self.comments_open = false;
        if let Some(state) = nav.unsuspend() {
            self.playback_changed(state, now);
        }
        self.publish_viewer();
        self.publish_comments();
        Ok(())
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.comments.set_draft(text);
        self.publish_comments();
    }

    /// Submit the composer draft for the active story.
    pub fn submit_comment(&mut self, now: DateTime<Utc>) -> Result<(), CommentRejected> {
        if self.nav.is_none() {
            return Err(CommentRejected::NoActiveStory);
        }
        let submission = match self.comments.submit(self.identity.as_ref(), now) {
            Ok(submission) => submission,
            Err(rejected) => {
                debug!(%rejected, "viewer: comment rejected");
                return Err(rejected);
            }
        };
        self.effects.push(Effect::AddComment {
            id: submission.id,
            story_id: submission.story_id,
            body: submission.body,
        });
        self.publish_comments();
        Ok(())
    }

    // ========================================================================
    // Completions
    // ========================================================================

    /// Fold a collaborator result into the viewer. Results for stories that
    /// are no longer active are dropped.
    pub fn complete(&mut self, completion: Completion, now: Instant) {
        match completion {
            Completion::SocialLoaded {
                story_id,
                author_id,
                result,
            } => {
                if !self.is_active_story(&story_id) {
                    self.social.discard_load(&story_id);
                    return;
                }
                self.social.apply_loaded(&story_id, &author_id, result);
                self.publish_social();
            }
            Completion::CommentsLoaded { story_id, result } => {
                if self.comments.apply_loaded(&story_id, result) {
                    self.publish_comments();
                }
            }
            Completion::LikeSettled { id, story_id, result } => {
                self.social.settle(id, result);
                if self.is_active_story(&story_id) {
                    self.publish_social();
                }
            }
            Completion::FollowSettled { id, author_id, result } => {
                self.social.settle(id, result);
                if self.active_story().map(|s| s.author_id == author_id).unwrap_or(false) {
                    self.publish_social();
                }
            }
            Completion::CommentAdded { id, story_id, result } => {
                if self.comments.settle(&story_id, id, result) != Settlement::Unknown {
                    self.publish_comments();
                }
            }
            Completion::ViewRecorded { story_id, result } => {
                if let Err(e) = result {
                    warn!(story_id, error = %e, "viewer: record view failed");
                }
            }
            Completion::CatalogLoaded { result } => match result {
                Ok(catalog) => {
                    self.refresh(Arc::new(catalog), now);
                }
                Err(e) => warn!(error = %e, "viewer: refresh failed, keeping current catalog"),
            },
        }
    }

    fn is_active_story(&self, story_id: &str) -> bool {
        self.active_story().map(|s| s.id == story_id).unwrap_or(false)
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    fn publish_all(&mut self) {
        self.publish_viewer();
        self.publish_progress();
        self.publish_social();
        self.publish_comments();
        self.publish_media();
    }

    fn publish_viewer(&self) {
        let Some(nav) = self.nav.as_ref() else {
            self.store.set_state(ViewerView::closed());
            return;
        };
        let cursor = nav.cursor();
        let group = nav.catalog().group(cursor.author_index);
        let group_len = group.map(|g| g.len()).unwrap_or(0);
        self.store.set_state(ViewerView {
            open: true,
            cursor: Some(cursor),
            profile: group.map(|g| g.profile.clone()),
            story: nav.catalog().item(cursor).cloned(),
            author_count: nav.catalog().len(),
            group_len,
            playback: Some(nav.playback()),
            comments_open: self.comments_open,
            indicators: progress_indicators(cursor.story_index, group_len, self.progress()),
        });
    }

    fn publish_progress(&mut self) {
        if let Some(clock) = self.clock.as_ref() {
            self.last_progress = clock.progress();
            self.store.set_state(ProgressView {
                story_id: clock.story_id().to_string(),
                progress: clock.progress(),
            });
        }
    }

    fn publish_progress_if_changed(&mut self) {
        if (self.progress() - self.last_progress).abs() > f64::EPSILON {
            self.publish_progress();
            self.publish_viewer();
        }
    }

    fn publish_social(&self) {
        let Some((story_id, author_id)) = self.active_ids() else {
            return;
        };
        self.store.set_state(SocialView {
            state: self.social.state_for(&story_id, &author_id),
            loading: self.social.is_loading(&story_id),
            like_pending: self.social.like_pending(&story_id),
            follow_pending: self.social.follow_pending(&author_id),
            story_id,
            author_id,
        });
    }

    fn publish_comments(&self) {
        self.store.set_state(CommentsView {
            story_id: self.comments.story_id().map(str::to_string),
            entries: self.comments.entries().to_vec(),
            loading: self.comments.is_loading(),
            draft: self.comments.draft().to_string(),
            busy: self.comments.is_busy(),
            open: self.comments_open,
        });
    }

    fn publish_media(&self) {
        match (self.active_story(), self.playback()) {
            (Some(story), Some(playback)) if story.media_kind == MediaKind::Video => {
                self.store.set_state(MediaControl {
                    story_id: story.id.clone(),
                    playing: playback.is_playing(),
                });
            }
            _ => {
                self.store.remove(MediaControl::PATH);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::catalog::tests::{at, profiles, story, two_author_catalog};

    fn viewer_with(config: ViewerConfig, catalog: StoryCatalog) -> (StoryViewer, Instant) {
        let mut viewer = StoryViewer::new(config, Arc::new(StateStore::new()));
        let t0 = Instant::now();
        viewer.open(Arc::new(catalog), Cursor::START, t0).unwrap();
        (viewer, t0)
    }

    fn open_viewer() -> (StoryViewer, Instant) {
        let config = ViewerConfig {
            viewer_id: Some("me".into()),
            ..Default::default()
        };
        viewer_with(config, two_author_catalog())
    }

    fn secs(t0: Instant, s: f64) -> Instant {
        t0 + Duration::from_secs_f64(s)
    }

    fn active_id(viewer: &StoryViewer) -> String {
        viewer.active_story().unwrap().id.clone()
    }

    fn social(likes: u32, liked: bool) -> SocialState {
        SocialState {
            is_liked: liked,
            like_count: likes,
            is_following_author: false,
            view_count: 0,
        }
    }

    fn load_social(viewer: &mut StoryViewer, state: SocialState, now: Instant) {
        let (story_id, author_id) = viewer.active_ids().unwrap();
        viewer.complete(
            Completion::SocialLoaded {
                story_id,
                author_id,
                result: Ok(state),
            },
            now,
        );
    }

    fn video_catalog() -> StoryCatalog {
        let mut v = story("V1", "U1", 100);
        v.media_kind = MediaKind::Video;
        StoryCatalog::build(vec![v, story("S2", "U1", 200)], &profiles(&["U1"]), at(1_000))
    }

    // ========================================================================
    // Open / close
    // ========================================================================

    #[test]
    fn open_empty_catalog_fails() {
        let mut viewer = StoryViewer::new(ViewerConfig::default(), Arc::new(StateStore::new()));
        assert_eq!(
            viewer.open(Arc::new(StoryCatalog::default()), Cursor::START, Instant::now()),
            Err(ViewerError::EmptyCatalog)
        );
        assert!(!viewer.is_open());
        assert_eq!(viewer.close(), Err(ViewerError::NotOpen));
    }

    #[test]
    fn open_requests_loads_for_first_story() {
        let (mut viewer, _) = open_viewer();
        assert_eq!(
            viewer.drain_effects(),
            vec![
                Effect::LoadSocial { story_id: "S1".into(), author_id: "U1".into() },
                Effect::RecordView { story_id: "S1".into() },
                Effect::LoadComments { story_id: "S1".into() },
            ]
        );
        let view = viewer.store().get_state::<ViewerView>().unwrap();
        assert!(view.open);
        assert_eq!(view.story.unwrap().id, "S1");
        assert_eq!(view.group_len, 2);
        assert_eq!(view.playback, Some(PlaybackState::Playing));
    }

    #[test]
    fn open_clamps_cursor() {
        let mut viewer = StoryViewer::new(ViewerConfig::default(), Arc::new(StateStore::new()));
        viewer
            .open(Arc::new(two_author_catalog()), Cursor::new(9, 9), Instant::now())
            .unwrap();
        assert_eq!(viewer.cursor(), Some(Cursor::new(1, 0)));
    }

    #[test]
    fn user_close_publishes_event() {
        let (mut viewer, _) = open_viewer();
        viewer.close().unwrap();
        assert!(!viewer.is_open());
        let event = viewer.store().get_state::<ClosedEvent>().unwrap();
        assert_eq!(event.reason, CloseReason::UserDismissed);
        assert!(!viewer.store().get_state::<ViewerView>().unwrap().open);
        assert!(viewer.store().get(ProgressView::PATH).is_none());
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[test]
    fn walks_through_catalog_then_closes() {
        let (mut viewer, t0) = open_viewer();
        assert_eq!(active_id(&viewer), "S1");
        viewer.advance(t0);
        assert_eq!(active_id(&viewer), "S2");
        viewer.advance(t0);
        assert_eq!(active_id(&viewer), "S3");
        assert_eq!(viewer.cursor(), Some(Cursor::new(1, 0)));
        assert_eq!(viewer.advance(t0), Transition::Close(CloseReason::EndOfStories));
        assert_eq!(viewer.closed_reason(), Some(CloseReason::EndOfStories));
    }

    #[test]
    fn retreat_from_first_story_closes() {
        let (mut viewer, t0) = open_viewer();
        assert_eq!(viewer.retreat(t0), Transition::Close(CloseReason::StartOfStories));
    }

    #[test]
    fn transition_resets_playback_and_progress() {
        let (mut viewer, t0) = open_viewer();
        viewer.tick(secs(t0, 3.0));
        viewer.toggle_pause(secs(t0, 3.0));
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
        viewer.advance(secs(t0, 4.0));
        assert_eq!(viewer.playback(), Some(PlaybackState::Playing));
        assert_eq!(viewer.progress(), 0.0);
    }

    #[test]
    fn jump_out_of_range_is_ignored() {
        let (mut viewer, t0) = open_viewer();
        assert_eq!(viewer.jump_to_author(5, t0), Transition::Stay);
        assert_eq!(active_id(&viewer), "S1");
        viewer.jump_to_author(1, t0);
        assert_eq!(active_id(&viewer), "S3");
    }

    // ========================================================================
    // Clock
    // ========================================================================

    #[test]
    fn image_timer_advances_once() {
        let (mut viewer, t0) = open_viewer();
        viewer.tick(secs(t0, 3.0));
        assert!((viewer.progress() - 0.5).abs() < 0.02);
        viewer.tick(secs(t0, 5.95));
        assert_eq!(active_id(&viewer), "S1");
        viewer.tick(secs(t0, 6.0));
        assert_eq!(active_id(&viewer), "S2");
        // The new story's clock started at t=6.
        viewer.tick(secs(t0, 6.05));
        assert_eq!(active_id(&viewer), "S2");
        assert!(viewer.progress() < 0.02);
    }

    #[test]
    fn pause_preserves_progress() {
        let (mut viewer, t0) = open_viewer();
        viewer.tick(secs(t0, 3.0));
        viewer.tap(0.5, secs(t0, 3.0));
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
        viewer.tick(secs(t0, 100.0));
        assert_eq!(active_id(&viewer), "S1");
        assert!((viewer.progress() - 0.5).abs() < 0.02);

        viewer.tap(0.5, secs(t0, 100.0));
        viewer.tick(secs(t0, 100.0));
        assert!((viewer.progress() - 0.5).abs() < 0.02);
        viewer.tick(secs(t0, 103.0));
        assert_eq!(active_id(&viewer), "S2");
    }

    #[test]
    fn progress_is_published() {
        let (mut viewer, t0) = open_viewer();
        viewer.tick(secs(t0, 1.5));
        let progress = viewer.store().get_state::<ProgressView>().unwrap();
        assert_eq!(progress.story_id, "S1");
        assert!((progress.progress - 0.25).abs() < 0.02);
        let view = viewer.store().get_state::<ViewerView>().unwrap();
        assert_eq!(view.indicators.len(), 2);
        assert!((view.indicators[0] - 0.25).abs() < 0.02);
        assert_eq!(view.indicators[1], 0.0);
    }

    // ========================================================================
    // Video
    // ========================================================================

    #[test]
    fn video_follows_media_element() {
        let (mut viewer, t0) = viewer_with(ViewerConfig::default(), video_catalog());
        assert_eq!(active_id(&viewer), "V1");
        let media = viewer.store().get_state::<MediaControl>().unwrap();
        assert!(media.playing);

        // Wall-clock ticks do not move a video.
        viewer.tick(secs(t0, 60.0));
        assert_eq!(viewer.progress(), 0.0);

        viewer.media_event("V1", MediaEvent::TimeUpdate { current: 2.0, duration: 8.0 }, t0);
        assert!((viewer.progress() - 0.25).abs() < 1e-9);

        viewer.media_event("V1", MediaEvent::Ended, t0);
        assert_eq!(active_id(&viewer), "S2");
        assert!(viewer.store().get(MediaControl::PATH).is_none());
    }

    #[test]
    fn media_event_for_other_story_is_dropped() {
        let (mut viewer, t0) = viewer_with(ViewerConfig::default(), video_catalog());
        viewer.media_event("OLD", MediaEvent::Ended, t0);
        assert_eq!(active_id(&viewer), "V1");
    }

    #[test]
    fn element_pause_and_play_track_user_pause() {
        let (mut viewer, t0) = viewer_with(ViewerConfig::default(), video_catalog());
        viewer.media_event("V1", MediaEvent::Paused, t0);
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
        assert!(!viewer.store().get_state::<MediaControl>().unwrap().playing);
        viewer.media_event("V1", MediaEvent::Playing, t0);
        assert_eq!(viewer.playback(), Some(PlaybackState::Playing));

        viewer.open_comments(t0).unwrap();
        viewer.media_event("V1", MediaEvent::Playing, t0);
        assert_eq!(viewer.playback(), Some(PlaybackState::Suspended));
    }

    // ========================================================================
    // Shell input
    // ========================================================================

    #[test]
    fn tap_zones_and_keys() {
        let (mut viewer, t0) = open_viewer();
        viewer.tap(0.9, t0);
        assert_eq!(active_id(&viewer), "S2");
        viewer.tap(0.1, t0);
        assert_eq!(active_id(&viewer), "S1");
        viewer.key(Key::Right, t0);
        assert_eq!(active_id(&viewer), "S2");
        viewer.key(Key::Space, t0);
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
        viewer.key(Key::Escape, t0);
        assert_eq!(viewer.closed_reason(), Some(CloseReason::UserDismissed));
    }

    #[test]
    fn input_suppressed_while_comments_open() {
        let (mut viewer, t0) = open_viewer();
        viewer.open_comments(t0).unwrap();
        viewer.key(Key::Right, t0);
        viewer.key(Key::Escape, t0);
        viewer.tap(0.9, t0);
        assert_eq!(active_id(&viewer), "S1");
        assert!(viewer.is_open());
    }

    // ========================================================================
    // Comment surface and suspension
    // ========================================================================

    #[test]
    fn comments_suspend_then_restore_playing() {
        let (mut viewer, t0) = open_viewer();
        viewer.open_comments(t0).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Suspended));
        viewer.tick(secs(t0, 30.0));
        assert_eq!(active_id(&viewer), "S1");
        viewer.close_comments(secs(t0, 30.0)).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Playing));
    }

    #[test]
    fn comments_restore_user_pause() {
        let (mut viewer, t0) = open_viewer();
        viewer.toggle_pause(t0);
        viewer.open_comments(t0).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Suspended));
        assert_eq!(viewer.toggle_pause(t0), None);
        viewer.close_comments(t0).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
    }

    #[test]
    fn jump_while_suspended_stays_suspended() {
        let (mut viewer, t0) = open_viewer();
        viewer.toggle_pause(t0);
        viewer.open_comments(t0).unwrap();
        viewer.jump_to_author(1, t0);
        assert_eq!(viewer.playback(), Some(PlaybackState::Suspended));
        viewer.close_comments(t0).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Playing));
    }

    // ========================================================================
    // Social
    // ========================================================================

    #[test]
    fn like_is_optimistic_and_reverts_on_failure() {
        let (mut viewer, t0) = open_viewer();
        viewer.drain_effects();
        assert!(!viewer.toggle_like(), "unloaded story cannot be liked");

        load_social(&mut viewer, social(3, false), t0);
        assert!(viewer.toggle_like());
        assert_eq!(viewer.social_state(), Some(social(4, true)));
        let view = viewer.store().get_state::<SocialView>().unwrap();
        assert!(view.like_pending);

        let Some(Effect::SetLike { id, story_id, liked }) = viewer.drain_effects().pop() else {
            panic!("expected like effect");
        };
        assert!(liked);
        viewer.complete(
            Completion::LikeSettled {
                id,
                story_id,
                result: Err(BackendError::Network("down".into())),
            },
            t0,
        );
        assert_eq!(viewer.social_state(), Some(social(3, false)));
        assert!(!viewer.store().get_state::<SocialView>().unwrap().like_pending);
    }

    #[test]
    fn stale_social_load_is_discarded() {
        let (mut viewer, t0) = open_viewer();
        viewer.advance(t0);
        assert_eq!(active_id(&viewer), "S2");
        load_social(&mut viewer, social(9, true), t0);

        viewer.complete(
            Completion::SocialLoaded {
                story_id: "S1".into(),
                author_id: "U1".into(),
                result: Ok(social(1, false)),
            },
            t0,
        );
        assert_eq!(viewer.social_state(), Some(social(9, true)));
        let view = viewer.store().get_state::<SocialView>().unwrap();
        assert_eq!(view.story_id, "S2");
        assert_eq!(view.state, Some(social(9, true)));
    }

    #[test]
    fn revisit_uses_cache_and_records_view_once() {
        let (mut viewer, t0) = open_viewer();
        load_social(&mut viewer, social(2, false), t0);
        viewer.advance(t0);
        viewer.retreat(t0);
        let effects = viewer.drain_effects();
        let s1_social = effects
            .iter()
            .filter(|e| matches!(e, Effect::LoadSocial { story_id, .. } if story_id == "S1"))
            .count();
        let s1_views = effects
            .iter()
            .filter(|e| matches!(e, Effect::RecordView { story_id } if story_id == "S1"))
            .count();
        assert_eq!(s1_social, 1);
        assert_eq!(s1_views, 1);
        assert_eq!(viewer.social_state(), Some(social(2, false)));
    }

    // ========================================================================
    // Comments
    // ========================================================================

    #[test]
    fn submit_appends_then_reconciles() {
        let (mut viewer, t0) = open_viewer();
        viewer.complete(
            Completion::CommentsLoaded {
                story_id: "S1".into(),
                result: Ok(vec![]),
            },
            t0,
        );
        viewer.drain_effects();
        viewer.set_draft("hi");
        viewer.submit_comment(at(500)).unwrap();
        assert_eq!(viewer.comments().entries().len(), 1);
        assert_eq!(viewer.comments().entries()[0].comment.body, "hi");
        let view = viewer.store().get_state::<CommentsView>().unwrap();
        assert!(view.busy);
        assert_eq!(view.draft, "");

        let Some(Effect::AddComment { id, story_id, body }) = viewer.drain_effects().pop() else {
            panic!("expected add comment effect");
        };
        assert_eq!(body, "hi");
        let echo = Comment {
            id: "c1".into(),
            story_id: story_id.clone(),
            author_id: "me".into(),
            author_display: "me".into(),
            body,
            created_at: at(500),
        };
        viewer.complete(Completion::CommentAdded { id, story_id, result: Ok(echo) }, t0);
        assert_eq!(viewer.comments().entries().len(), 1);
        assert!(!viewer.comments().entries()[0].pending);
    }

    #[test]
    fn anonymous_submit_is_rejected_locally() {
        let (mut viewer, _) = viewer_with(ViewerConfig::default(), two_author_catalog());
        viewer.drain_effects();
        viewer.set_draft("hi");
        assert_eq!(viewer.submit_comment(at(0)), Err(CommentRejected::Unauthenticated));
        assert!(viewer.drain_effects().is_empty());
    }

    #[test]
    fn story_switch_reloads_comments() {
        let (mut viewer, t0) = open_viewer();
        viewer.complete(
            Completion::CommentsLoaded {
                story_id: "S1".into(),
                result: Ok(vec![]),
            },
            t0,
        );
        viewer.drain_effects();
        viewer.advance(t0);
        assert!(viewer
            .drain_effects()
            .contains(&Effect::LoadComments { story_id: "S2".into() }));
        assert_eq!(viewer.comments().story_id(), Some("S2"));
        assert!(viewer.comments().is_loading());
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    #[test]
    fn refresh_keeps_surviving_story() {
        let (mut viewer, t0) = open_viewer();
        viewer.advance(t0);
        viewer.tick(secs(t0, 3.0));
        // S1 expired; S2 is now at index 0 of U1.
        let refreshed = StoryCatalog::build(
            vec![story("S2", "U1", 200), story("S3", "U2", 150)],
            &profiles(&["U1", "U2"]),
            at(1_000),
        );
        viewer.refresh(Arc::new(refreshed), secs(t0, 3.0));
        assert_eq!(active_id(&viewer), "S2");
        assert_eq!(viewer.cursor(), Some(Cursor::new(0, 0)));
        assert!((viewer.progress() - 0.5).abs() < 0.02);
    }

    #[test]
    fn oversized_duration_hint_still_plays() {
        let mut long = story("S1", "U1", 100);
        long.duration_hint_seconds = Some(1e20);
        let catalog = StoryCatalog::build(
            vec![long, story("S2", "U1", 200)],
            &profiles(&["U1"]),
            at(1_000),
        );
        let (mut viewer, t0) = viewer_with(ViewerConfig::default(), catalog);
        viewer.tick(secs(t0, 60.0));
        assert_eq!(active_id(&viewer), "S1");
        viewer.advance(secs(t0, 60.0));
        assert_eq!(active_id(&viewer), "S2");
        viewer.close().unwrap();
        assert!(!viewer.is_open());
    }

    #[test]
    fn refresh_keeps_user_pause() {
        let (mut viewer, t0) = open_viewer();
        viewer.tick(secs(t0, 3.0));
        viewer.pause(secs(t0, 3.0));
        viewer.refresh(Arc::new(two_author_catalog()), secs(t0, 3.0));
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));

        viewer.tick(secs(t0, 10.0));
        assert_eq!(active_id(&viewer), "S1");
        assert!((viewer.progress() - 0.5).abs() < 0.02);
    }

    #[test]
    fn refresh_under_comments_keeps_resume_target() {
        let (mut viewer, t0) = open_viewer();
        viewer.pause(t0);
        viewer.open_comments(t0).unwrap();
        viewer.refresh(Arc::new(two_author_catalog()), secs(t0, 1.0));
        assert_eq!(viewer.playback(), Some(PlaybackState::Suspended));
        viewer.close_comments(secs(t0, 2.0)).unwrap();
        assert_eq!(viewer.playback(), Some(PlaybackState::Paused));
    }

    #[test]
    fn refresh_to_empty_closes() {
        let (mut viewer, t0) = open_viewer();
        assert!(viewer.request_refresh());
        assert!(viewer.drain_effects().contains(&Effect::ReloadCatalog));
        viewer.complete(
            Completion::CatalogLoaded {
                result: Ok(StoryCatalog::default()),
            },
            t0,
        );
        assert_eq!(viewer.closed_reason(), Some(CloseReason::EmptyCatalog));
    }

    #[test]
    fn failed_refresh_keeps_catalog() {
        let (mut viewer, t0) = open_viewer();
        viewer.complete(
            Completion::CatalogLoaded {
                result: Err(BackendError::Network("down".into())),
            },
            t0,
        );
        assert!(viewer.is_open());
        assert_eq!(active_id(&viewer), "S1");
    }
}

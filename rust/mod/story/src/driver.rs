//! ViewerDriver: runs a [`StoryViewer`] on tokio.
//!
//! One task owns the viewer. It wakes on the tick interval, on host input
//! and on collaborator completions; every effect the viewer queues is run
//! as its own spawned task whose result comes back over a channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use reel_flux::StateStore;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::backend::StoryBackend;
use crate::catalog::StoryCatalog;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::loader::fetch_catalog;
use crate::model::Cursor;
use crate::navigation::CloseReason;
use crate::shell::{Key, MediaEvent};
use crate::viewer::{Completion, Effect, StoryViewer};

/// Host input forwarded to the driver task.
#[derive(Debug)]
pub enum Input {
    Open {
        catalog: Arc<StoryCatalog>,
        cursor: Cursor,
        reply: oneshot::Sender<Result<(), ViewerError>>,
    },
    Close,
    Tap(f64),
    Key(Key),
    JumpToAuthor(usize),
    ToggleLike,
    ToggleFollow,
    OpenComments,
    CloseComments,
    SetDraft(String),
    SubmitComment {
        reply: oneshot::Sender<Result<(), ViewerError>>,
    },
    Media {
        story_id: String,
        event: MediaEvent,
    },
    Refresh,
}

/// Imperative handle held by the host surface. Dropping every handle
/// stops the driver.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    tx: mpsc::UnboundedSender<Input>,
}

impl ViewerHandle {
    fn send(&self, input: Input) -> Result<(), ViewerError> {
        self.tx.send(input).map_err(|_| ViewerError::NotOpen)
    }

    /// Open at `cursor`. Fails with `EmptyCatalog` for an empty catalog.
    pub async fn open(&self, catalog: StoryCatalog, cursor: Cursor) -> Result<(), ViewerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::Open {
            catalog: Arc::new(catalog),
            cursor,
            reply,
        })?;
        rx.await.map_err(|_| ViewerError::NotOpen)?
    }

    pub fn close(&self) -> Result<(), ViewerError> {
        self.send(Input::Close)
    }

    pub fn tap(&self, x: f64) -> Result<(), ViewerError> {
        self.send(Input::Tap(x))
    }

    pub fn key(&self, key: Key) -> Result<(), ViewerError> {
        self.send(Input::Key(key))
    }

    pub fn jump_to_author(&self, author_index: usize) -> Result<(), ViewerError> {
        self.send(Input::JumpToAuthor(author_index))
    }

    pub fn toggle_like(&self) -> Result<(), ViewerError> {
        self.send(Input::ToggleLike)
    }

    pub fn toggle_follow(&self) -> Result<(), ViewerError> {
        self.send(Input::ToggleFollow)
    }

    pub fn open_comments(&self) -> Result<(), ViewerError> {
        self.send(Input::OpenComments)
    }

    pub fn close_comments(&self) -> Result<(), ViewerError> {
        self.send(Input::CloseComments)
    }

    pub fn set_draft(&self, text: impl Into<String>) -> Result<(), ViewerError> {
        self.send(Input::SetDraft(text.into()))
    }

    /// Submit the current draft. Local rejections come back as
    /// `ViewerError::Comment`.
    pub async fn submit_comment(&self) -> Result<(), ViewerError> {
        let (reply, rx) = oneshot::channel();
        self.send(Input::SubmitComment { reply })?;
        rx.await.map_err(|_| ViewerError::NotOpen)?
    }

    pub fn media(&self, story_id: impl Into<String>, event: MediaEvent) -> Result<(), ViewerError> {
        self.send(Input::Media {
            story_id: story_id.into(),
            event,
        })
    }

    pub fn refresh(&self) -> Result<(), ViewerError> {
        self.send(Input::Refresh)
    }
}

pub struct ViewerDriver<B: StoryBackend> {
    viewer: StoryViewer,
    backend: Arc<B>,
    tick: Duration,
    inputs: mpsc::UnboundedReceiver<Input>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<B: StoryBackend> ViewerDriver<B> {
    pub fn new(backend: Arc<B>, store: Arc<StateStore>, config: ViewerConfig) -> (Self, ViewerHandle) {
        let (tx, inputs) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let tick = config.tick();
        let driver = Self {
            viewer: StoryViewer::new(config, store),
            backend,
            tick,
            inputs,
            done_tx,
            done_rx,
        };
        (driver, ViewerHandle { tx })
    }

    pub fn viewer(&self) -> &StoryViewer {
        &self.viewer
    }

    /// Run until the viewer closes (returning the reason) or every handle
    /// is dropped (returning `None`).
    pub async fn run(mut self) -> Option<CloseReason> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.viewer.tick(now());
                }
                input = self.inputs.recv() => match input {
                    Some(input) => self.handle(input),
                    None => {
                        info!("driver: handle dropped, stopping");
                        return None;
                    }
                },
                Some(done) = self.done_rx.recv() => {
                    self.viewer.complete(done, now());
                }
            }

            self.dispatch();

            if let Some(reason) = self.viewer.closed_reason() {
                info!(?reason, "driver: viewer closed, stopping");
                return Some(reason);
            }
        }
    }

    fn handle(&mut self, input: Input) {
        let now = now();
        let viewer = &mut self.viewer;
        match input {
            Input::Open { catalog, cursor, reply } => {
                let _ = reply.send(viewer.open(catalog, cursor, now));
            }
            Input::Close => {
                if let Err(e) = viewer.close() {
                    debug!(error = %e, "driver: close ignored");
                }
            }
            Input::Tap(x) => viewer.tap(x, now),
            Input::Key(key) => viewer.key(key, now),
            Input::JumpToAuthor(index) => {
                viewer.jump_to_author(index, now);
            }
            Input::ToggleLike => {
                viewer.toggle_like();
            }
            Input::ToggleFollow => {
                viewer.toggle_follow();
            }
            Input::OpenComments => {
                if let Err(e) = viewer.open_comments(now) {
                    debug!(error = %e, "driver: open comments ignored");
                }
            }
            Input::CloseComments => {
                if let Err(e) = viewer.close_comments(now) {
                    debug!(error = %e, "driver: close comments ignored");
                }
            }
            Input::SetDraft(text) => viewer.set_draft(text),
            Input::SubmitComment { reply } => {
                let result = viewer.submit_comment(Utc::now()).map_err(ViewerError::from);
                let _ = reply.send(result);
            }
            Input::Media { story_id, event } => viewer.media_event(&story_id, event, now),
            Input::Refresh => {
                viewer.request_refresh();
            }
        }
    }

    /// Spawn a task per queued effect.
    fn dispatch(&mut self) {
        for effect in self.viewer.drain_effects() {
            debug!(?effect, "driver: dispatch");
            let backend = self.backend.clone();
            let done_tx = self.done_tx.clone();
            tokio::spawn(async move {
                let done = perform(backend.as_ref(), effect).await;
                // The driver may be gone; late results are dropped.
                let _ = done_tx.send(done);
            });
        }
    }
}

/// Run one effect against the collaborator.
pub async fn perform<B: StoryBackend + ?Sized>(backend: &B, effect: Effect) -> Completion {
    match effect {
        Effect::LoadSocial { story_id, author_id } => {
            let result = backend.social_state(&story_id, &author_id).await;
            Completion::SocialLoaded {
                story_id,
                author_id,
                result,
            }
        }
        Effect::RecordView { story_id } => {
            let result = backend.record_view(&story_id).await;
            Completion::ViewRecorded { story_id, result }
        }
        Effect::LoadComments { story_id } => {
            let result = backend.list_comments(&story_id).await;
            Completion::CommentsLoaded { story_id, result }
        }
        Effect::SetLike { id, story_id, liked } => {
            let result = backend.set_like(&story_id, liked).await;
            Completion::LikeSettled { id, story_id, result }
        }
        Effect::SetFollow {
            id,
            author_id,
            following,
        } => {
            let result = backend.set_follow(&author_id, following).await;
            Completion::FollowSettled { id, author_id, result }
        }
        Effect::AddComment { id, story_id, body } => {
            let result = backend.add_comment(&story_id, &body).await;
            Completion::CommentAdded { id, story_id, result }
        }
        Effect::ReloadCatalog => {
            let result = fetch_catalog(backend, Utc::now()).await;
            Completion::CatalogLoaded { result }
        }
    }
}

/// Engine time. Follows tokio's clock so paused-time tests drive it.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

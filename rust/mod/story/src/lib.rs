//! Story playback engine.
//!
//! Plays ephemeral "stories" grouped by author: auto-advancing per-story
//! timers (or media-driven progress for video), two-level navigation,
//! a pause / suspend state machine, and optimistic like / follow / comment
//! mutations with rollback.
//!
//! # Architecture
//!
//! ```text
//!   host surface ──input──▶ ViewerHandle ──▶ ViewerDriver (tokio task)
//!                                               │
//!                                               ▼
//!                                         StoryViewer (sans-IO)
//!                         ┌──────────┬──────────┼───────────┬──────────────┐
//!                    StoryCatalog  Navigation  PlaybackClock  SocialState   CommentThread
//!                                               │
//!                              Effect ──▶ StoryBackend ──▶ Completion
//!                                               │
//!   host surface ◀──subscribe("viewer/#")── reel_flux::StateStore
//! ```
//!
//! [`StoryViewer`] never performs I/O and never reads the clock: both are
//! injected, which keeps every behavior deterministic under test.
//! [`ViewerDriver`] supplies them from tokio.

pub mod backend;
pub mod catalog;
pub mod clock;
pub mod comments;
pub mod config;
pub mod driver;
pub mod error;
pub mod loader;
pub mod memory;
pub mod model;
pub mod navigation;
pub mod optimistic;
pub mod shell;
pub mod social;
pub mod state;
pub mod viewer;

pub use backend::StoryBackend;
pub use catalog::StoryCatalog;
pub use clock::{ClockSignal, PlaybackClock};
pub use comments::{CommentEntry, CommentThread, ViewerIdentity};
pub use config::ViewerConfig;
pub use driver::{ViewerDriver, ViewerHandle};
pub use error::{BackendError, CommentRejected, ViewerError};
pub use loader::{fetch_catalog, load_catalog};
pub use memory::{Fixture, MemoryBackend, Op};
pub use model::{AuthorGroup, Comment, Cursor, MediaKind, PlaybackState, Profile, SocialState, StoryItem};
pub use navigation::{CloseReason, NavigationController, Transition};
pub use shell::{Key, MediaEvent};
pub use social::SocialStateStore;
pub use state::{ClosedEvent, CommentsView, MediaControl, ProgressView, SocialView, ViewerView};
pub use viewer::{Completion, Effect, StoryViewer};

//! NavigationController: owns the cursor and the playback state.
//!
//! Every transition lands on a valid cursor or resolves to `Close`; an
//! out-of-bounds cursor is never produced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::StoryCatalog;
use crate::model::{Cursor, PlaybackState};

/// Why the viewer closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CloseReason {
    /// Advanced past the last story of the last author.
    EndOfStories,
    /// Retreated before the first story of the first author.
    StartOfStories,
    UserDismissed,
    /// A refresh left nothing to show.
    EmptyCatalog,
}

/// Outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Cursor, to: Cursor },
    Close(CloseReason),
    /// Request ignored (e.g. jump to a missing author).
    Stay,
}

pub struct NavigationController {
    catalog: Arc<StoryCatalog>,
    cursor: Cursor,
    playback: PlaybackState,
    /// State to restore when a suspension ends.
    resume_to: PlaybackState,
}

impl NavigationController {
    /// Start at `initial`, clamped into the catalog. `None` for an empty
    /// catalog.
    pub fn new(catalog: Arc<StoryCatalog>, initial: Cursor) -> Option<Self> {
        let cursor = catalog.clamp(initial)?;
        Some(Self {
            catalog,
            cursor,
            playback: PlaybackState::Playing,
            resume_to: PlaybackState::Playing,
        })
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn catalog(&self) -> &Arc<StoryCatalog> {
        &self.catalog
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    fn group_len(&self, author_index: usize) -> usize {
        self.catalog.group(author_index).map(|g| g.len()).unwrap_or(0)
    }

    // ====================================================================
    // Cursor transitions
    // ====================================================================

    pub fn advance(&mut self) -> Transition {
        let next = self.cursor.story_index + 1;
        if next < self.group_len(self.cursor.author_index) {
            self.move_to(Cursor::new(self.cursor.author_index, next))
        } else {
            self.advance_author()
        }
    }

    pub fn advance_author(&mut self) -> Transition {
        let next = self.cursor.author_index + 1;
        if next < self.catalog.len() {
            self.move_to(Cursor::new(next, 0))
        } else {
            Transition::Close(CloseReason::EndOfStories)
        }
    }

    pub fn retreat(&mut self) -> Transition {
        if self.cursor.story_index > 0 {
            self.move_to(Cursor::new(self.cursor.author_index, self.cursor.story_index - 1))
        } else {
            self.retreat_author()
        }
    }

    pub fn retreat_author(&mut self) -> Transition {
        if self.cursor.author_index > 0 {
            self.move_to(Cursor::new(self.cursor.author_index - 1, 0))
        } else {
            Transition::Close(CloseReason::StartOfStories)
        }
    }

    /// Seek to the first story of `author_index`. Out-of-range is ignored.
    pub fn jump_to_author(&mut self, author_index: usize) -> Transition {
        if author_index >= self.catalog.len() {
            debug!(author_index, "nav: jump target out of range, ignored");
            return Transition::Stay;
        }
        self.move_to(Cursor::new(author_index, 0))
    }

    /// Swap in a replacement catalog (refresh). `kept` is the active
    /// story's position in `catalog` when it survived: the cursor follows
    /// it and playback is left alone. Otherwise the first story plays.
    pub fn rebase(&mut self, catalog: Arc<StoryCatalog>, kept: Option<Cursor>) -> Transition {
        let Some(start) = catalog.clamp(Cursor::START) else {
            return Transition::Close(CloseReason::EmptyCatalog);
        };
        let kept = kept.and_then(|cursor| catalog.item(cursor).map(|_| cursor));
        self.catalog = catalog;
        match kept {
            Some(to) => {
                let from = self.cursor;
                self.cursor = to;
                debug!(%from, %to, "nav: rebased");
                Transition::Moved { from, to }
            }
            None => self.move_to(start),
        }
    }

    fn move_to(&mut self, to: Cursor) -> Transition {
        let from = self.cursor;
        self.cursor = to;
        // A covering surface keeps the story suspended; it plays once
        // the surface closes.
        if self.playback == PlaybackState::Suspended {
            self.resume_to = PlaybackState::Playing;
        } else {
            self.playback = PlaybackState::Playing;
        }
        debug!(%from, %to, "nav: moved");
        Transition::Moved { from, to }
    }

    // ====================================================================
    // Playback state
    // ====================================================================

    /// User pause. Returns the new state if it changed.
    pub fn pause(&mut self) -> Option<PlaybackState> {
        self.set_playback(PlaybackState::Playing, PlaybackState::Paused)
    }

    /// User resume. Returns the new state if it changed.
    pub fn resume(&mut self) -> Option<PlaybackState> {
        self.set_playback(PlaybackState::Paused, PlaybackState::Playing)
    }

    /// Playing <-> Paused. No effect while suspended.
    pub fn toggle_pause(&mut self) -> Option<PlaybackState> {
        match self.playback {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Suspended => None,
        }
    }

    /// Force `Suspended`, remembering the state to return to.
    pub fn suspend(&mut self) -> Option<PlaybackState> {
        if self.playback == PlaybackState::Suspended {
            return None;
        }
        self.resume_to = self.playback;
        self.playback = PlaybackState::Suspended;
        Some(self.playback)
    }

    /// Leave `Suspended` for the state held before it.
    pub fn unsuspend(&mut self) -> Option<PlaybackState> {
        if self.playback != PlaybackState::Suspended {
            return None;
        }
        self.playback = self.resume_to;
        Some(self.playback)
    }

    fn set_playback(&mut self, from: PlaybackState, to: PlaybackState) -> Option<PlaybackState> {
        if self.playback != from {
            return None;
        }
        self.playback = to;
        Some(to)
    }
}

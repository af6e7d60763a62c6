//! PlaybackClock: progress of the active story.
//!
//! Images run on a wall-clock timer sampled by `tick`; videos follow the
//! position reported by the host media element. A clock belongs to one
//! story: the viewer drops it and builds a fresh one on every cursor
//! change, so nothing from a previous story can reach the new one.

use std::time::{Duration, Instant};

use crate::model::{MediaKind, StoryItem};

/// Signals produced by the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    /// The story finished. Emitted at most once per clock.
    Advance,
}

#[derive(Debug, Clone)]
enum Source {
    Timer {
        duration: Duration,
        /// Virtual start instant while running: `now - progress * duration`.
        anchor: Option<Instant>,
    },
    Media,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    story_id: String,
    source: Source,
    progress: f64,
    running: bool,
    advance_fired: bool,
}

impl PlaybackClock {
    /// Build the clock for `item`, running from `now` if `running`.
    pub fn for_item(item: &StoryItem, default_image_seconds: f64, running: bool, now: Instant) -> Self {
        let source = match item.media_kind {
            MediaKind::Image => Source::Timer {
                duration: item.image_duration(default_image_seconds),
                anchor: None,
            },
            MediaKind::Video => Source::Media,
        };
        let mut clock = Self {
            story_id: item.id.clone(),
            source,
            progress: 0.0,
            running: false,
            advance_fired: false,
        };
        clock.set_running(running, now);
        clock
    }

    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    /// Last sampled progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_media_driven(&self) -> bool {
        matches!(self.source, Source::Media)
    }

    /// Start or freeze the clock. Freezing keeps progress; restarting
    /// continues from it.
    pub fn set_running(&mut self, running: bool, now: Instant) {
        if running == self.running {
            return;
        }
        if let Source::Timer { duration, anchor } = &mut self.source {
            if running {
                let offset = duration.mul_f64(self.progress);
                *anchor = Some(now.checked_sub(offset).unwrap_or(now));
            } else if let Some(start) = anchor.take() {
                self.progress = timer_progress(*duration, start, now);
            }
        }
        self.running = running;
    }

    /// Sample the timer. Media clocks ignore ticks.
    pub fn tick(&mut self, now: Instant) -> Option<ClockSignal> {
        let Source::Timer { duration, anchor: Some(start) } = self.source else {
            return None;
        };
        if !self.running {
            return None;
        }
        self.progress = timer_progress(duration, start, now);
        if self.progress >= 1.0 {
            return self.fire();
        }
        None
    }

    /// Position report from the media element.
    pub fn on_media_time(&mut self, current_secs: f64, duration_secs: f64) {
        if !self.is_media_driven() || !(duration_secs.is_finite() && duration_secs > 0.0) {
            return;
        }
        if current_secs.is_finite() {
            self.progress = (current_secs / duration_secs).clamp(0.0, 1.0);
        }
    }

    /// The media element reached its end.
    pub fn on_media_ended(&mut self) -> Option<ClockSignal> {
        if !self.is_media_driven() {
            return None;
        }
        self.progress = 1.0;
        self.fire()
    }

    fn fire(&mut self) -> Option<ClockSignal> {
        if self.advance_fired {
            return None;
        }
        self.advance_fired = true;
        Some(ClockSignal::Advance)
    }
}

fn timer_progress(duration: Duration, start: Instant, now: Instant) -> f64 {
    let elapsed = now.saturating_duration_since(start);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::story;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn image_clock(now: Instant) -> PlaybackClock {
        let mut item = story("s1", "u1", 0);
        item.duration_hint_seconds = Some(6.0);
        PlaybackClock::for_item(&item, 6.0, true, now)
    }

    // ========================================================================
    // Image timer
    // ========================================================================

    #[test]
    fn half_way_at_three_seconds() {
        let t0 = Instant::now();
        let mut clock = image_clock(t0);
        assert_eq!(clock.tick(t0 + secs(3.0)), None);
        assert!((clock.progress() - 0.5).abs() <= 0.02);
    }

    #[test]
    fn advance_fires_once_at_duration_never_before() {
        let t0 = Instant::now();
        let mut clock = image_clock(t0);
        let tick = Duration::from_millis(50);
        let mut fired_at = Vec::new();
        let mut t = t0;
        for _ in 0..200 {
            t += tick;
            if clock.tick(t) == Some(ClockSignal::Advance) {
                fired_at.push(t.duration_since(t0));
            }
        }
        assert_eq!(fired_at.len(), 1);
        assert!(fired_at[0] >= secs(6.0));
        assert!(fired_at[0] < secs(6.0) + tick);
        assert_eq!(clock.progress(), 1.0);
    }

    #[test]
    fn default_duration_when_no_hint() {
        let t0 = Instant::now();
        let clock_item = story("s1", "u1", 0);
        let mut clock = PlaybackClock::for_item(&clock_item, 4.0, true, t0);
        clock.tick(t0 + secs(1.0));
        assert!((clock.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn pause_then_resume_preserves_progress() {
        let t0 = Instant::now();
        let mut clock = image_clock(t0);
        clock.tick(t0 + secs(1.5));
        clock.set_running(false, t0 + secs(1.5));
        let frozen = clock.progress();

        // Time passes while paused.
        assert_eq!(clock.tick(t0 + secs(30.0)), None);
        assert_eq!(clock.progress(), frozen);

        clock.set_running(true, t0 + secs(30.0));
        clock.tick(t0 + secs(30.0));
        assert!((clock.progress() - frozen).abs() < 1e-9);

        clock.tick(t0 + secs(31.5));
        assert!((clock.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn freeze_samples_at_pause_instant() {
        let t0 = Instant::now();
        let mut clock = image_clock(t0);
        // No tick in between: the freeze itself records progress.
        clock.set_running(false, t0 + secs(3.0));
        assert!((clock.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn clock_created_paused_does_not_move() {
        let t0 = Instant::now();
        let mut clock = PlaybackClock::for_item(&story("s1", "u1", 0), 6.0, false, t0);
        assert_eq!(clock.tick(t0 + secs(10.0)), None);
        assert_eq!(clock.progress(), 0.0);
    }

    // ========================================================================
    // Media-driven
    // ========================================================================

    #[test]
    fn video_progress_follows_media_position() {
        let t0 = Instant::now();
        let mut item = story("v1", "u1", 0);
        item.media_kind = MediaKind::Video;
        let mut clock = PlaybackClock::for_item(&item, 6.0, true, t0);

        assert!(clock.is_media_driven());
        assert_eq!(clock.tick(t0 + secs(100.0)), None);
        assert_eq!(clock.progress(), 0.0);

        clock.on_media_time(2.5, 10.0);
        assert!((clock.progress() - 0.25).abs() < 1e-9);

        clock.on_media_time(1.0, f64::NAN);
        assert!((clock.progress() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn video_ended_fires_once() {
        let mut item = story("v1", "u1", 0);
        item.media_kind = MediaKind::Video;
        let mut clock = PlaybackClock::for_item(&item, 6.0, true, Instant::now());
        assert_eq!(clock.on_media_ended(), Some(ClockSignal::Advance));
        assert_eq!(clock.on_media_ended(), None);
        assert_eq!(clock.progress(), 1.0);
    }

    #[test]
    fn image_ignores_media_events() {
        let t0 = Instant::now();
        let mut clock = image_clock(t0);
        clock.on_media_time(5.0, 6.0);
        assert_eq!(clock.on_media_ended(), None);
        assert_eq!(clock.progress(), 0.0);
    }
}

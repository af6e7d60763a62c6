//! ViewerShell input mapping.
//!
//! Turns raw host input (taps, keys, media element callbacks) into viewer
//! commands. Holds no state of its own.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Right,
    Escape,
    Space,
}

/// A command resolved from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    Retreat,
    Advance,
    TogglePause,
    Close,
}

/// Report from the host media element for a video story.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaEvent {
    TimeUpdate { current: f64, duration: f64 },
    Ended,
    Paused,
    Playing,
}

/// Horizontal tap zones over the media area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapZones {
    left: f64,
    right: f64,
}

impl TapZones {
    /// `left <= right`, both fractions of the width.
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Resolve a tap at `x` (fraction of the width, 0 = left edge).
    pub fn resolve(&self, x: f64) -> ShellCommand {
        if x < self.left {
            ShellCommand::Retreat
        } else if x > self.right {
            ShellCommand::Advance
        } else {
            ShellCommand::TogglePause
        }
    }
}

impl Default for TapZones {
    fn default() -> Self {
        Self::new(1.0 / 3.0, 2.0 / 3.0)
    }
}

/// Resolve a key binding. Every key is ignored while the comment surface
/// is open.
pub fn resolve_key(key: Key, comments_open: bool) -> Option<ShellCommand> {
    if comments_open {
        return None;
    }
    Some(match key {
        Key::Left => ShellCommand::Retreat,
        Key::Right => ShellCommand::Advance,
        Key::Escape => ShellCommand::Close,
        Key::Space => ShellCommand::TogglePause,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirds() {
        let zones = TapZones::default();
        assert_eq!(zones.resolve(0.1), ShellCommand::Retreat);
        assert_eq!(zones.resolve(0.5), ShellCommand::TogglePause);
        assert_eq!(zones.resolve(0.9), ShellCommand::Advance);
        assert_eq!(zones.resolve(-3.0), ShellCommand::Retreat);
    }

    #[test]
    fn keys_suppressed_under_comments() {
        assert_eq!(resolve_key(Key::Right, false), Some(ShellCommand::Advance));
        assert_eq!(resolve_key(Key::Escape, false), Some(ShellCommand::Close));
        assert_eq!(resolve_key(Key::Space, true), None);
        assert_eq!(resolve_key(Key::Escape, true), None);
    }

    #[test]
    fn media_event_json() {
        let ev: MediaEvent =
            serde_json::from_str(r#"{"type":"timeUpdate","current":1.0,"duration":4.0}"#).unwrap();
        assert_eq!(ev, MediaEvent::TimeUpdate { current: 1.0, duration: 4.0 });
    }
}

use std::time::Duration;

use serde::Deserialize;

use crate::comments::ViewerIdentity;
use crate::model::DEFAULT_IMAGE_SECONDS;

/// Viewer tuning.
///
/// Deserialized from the `[viewer]` table of the host's config file; every
/// field has a default so an empty table is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Image timer sampling period in milliseconds.
    pub tick_ms: u64,

    /// Display time for images without a duration hint.
    pub default_image_seconds: f64,

    /// Authenticated viewer. `None` means anonymous: comments are
    /// rejected locally.
    pub viewer_id: Option<String>,

    /// Display name for `viewer_id`. Defaults to the id.
    pub viewer_name: Option<String>,

    /// Tap zone boundaries as fractions of the media width.
    pub left_zone: f64,
    pub right_zone: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            default_image_seconds: DEFAULT_IMAGE_SECONDS,
            viewer_id: None,
            viewer_name: None,
            left_zone: 1.0 / 3.0,
            right_zone: 2.0 / 3.0,
        }
    }
}

impl ViewerConfig {
    /// Parse overrides from command-line arguments.
    ///
    /// Supported flags:
    /// - `--tick-ms=N`
    /// - `--image-seconds=SECS`
    /// - `--viewer=ID`
    ///
    /// Unparseable values keep the default.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = ViewerConfig::default();
        config.apply_args(args);
        config
    }

    /// Apply `from_args` flags on top of an existing config.
    pub fn apply_args(&mut self, args: &[String]) {
        for arg in args {
            if let Some(val) = arg.strip_prefix("--tick-ms=") {
                if let Ok(ms) = val.parse() {
                    self.tick_ms = ms;
                }
            } else if let Some(val) = arg.strip_prefix("--image-seconds=") {
                if let Ok(secs) = val.parse() {
                    self.default_image_seconds = secs;
                }
            } else if let Some(val) = arg.strip_prefix("--viewer=") {
                self.viewer_id = Some(val.to_string()).filter(|v| !v.is_empty());
            }
        }
    }

    /// Tick period, never zero.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Image fallback duration, sanitized to a positive finite value.
    pub fn image_seconds(&self) -> f64 {
        if self.default_image_seconds.is_finite() && self.default_image_seconds > 0.0 {
            self.default_image_seconds
        } else {
            DEFAULT_IMAGE_SECONDS
        }
    }

    pub fn viewer(&self) -> Option<ViewerIdentity> {
        let id = self.viewer_id.clone()?;
        let display_name = self.viewer_name.clone().unwrap_or_else(|| id.clone());
        Some(ViewerIdentity { id, display_name })
    }

    /// Tap zone bounds, ordered and clamped into `[0, 1]`.
    pub fn zones(&self) -> (f64, f64) {
        let left = sanitize_fraction(self.left_zone, 1.0 / 3.0);
        let right = sanitize_fraction(self.right_zone, 2.0 / 3.0);
        if left <= right {
            (left, right)
        } else {
            (right, left)
        }
    }
}

fn sanitize_fraction(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

//! Player configuration.
//!
//! Reads `reel.toml`:
//!
//! ```toml
//! fixture = "fixtures/demo.json"
//!
//! [viewer]
//! tick_ms = 50
//! default_image_seconds = 6.0
//! viewer_id = "me"
//! ```

use std::path::{Path, PathBuf};

use reel_story::ViewerConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReelConfig {
    /// Story fixture (JSON) loaded into the in-memory collaborator.
    /// Relative paths resolve against the config file's directory.
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    #[serde(default)]
    pub viewer: ViewerConfig,
}

impl ReelConfig {
    /// Load from disk, or return the default if the file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: ReelConfig = toml::from_str(&content)?;
        if let (Some(fixture), Some(dir)) = (config.fixture.as_ref(), path.parent()) {
            if fixture.is_relative() {
                config.fixture = Some(dir.join(fixture));
            }
        }
        Ok(config)
    }
}

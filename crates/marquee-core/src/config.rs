//! Player configuration
//!
//! [`PlayerConfig`] carries every recognized option. Components take the
//! narrower [`CatalogOptions`] / [`SessionOptions`] views.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    /// Skip items that fail validation instead of failing the whole parse
    pub skip_invalid_items: bool,
    /// Skip representations (and variants left empty) that fail validation
    pub skip_invalid_representations: bool,
    /// Accept a descriptor that ends up with no items
    pub skip_empty_data: bool,
    /// Accept every representation without a capability query
    pub disable_play_check: bool,
    /// Accept representations whose mime type cannot be resolved
    pub lenient_play_check: bool,
    /// Accept `blob:`/`data:` sources without a capability query
    pub lenient_play_check_blob: bool,
    pub preferred_quality: Option<u32>,
    pub preferred_language: Option<String>,
    /// Stall detection delay in seconds (0 disables the detector)
    pub stall_timeout: f64,
    pub auto_play: bool,
    /// Retry a rejected autoplay muted
    pub auto_mute: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub muted: bool,
    pub volume: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_invalid_items: false,
            skip_invalid_representations: true,
            skip_empty_data: false,
            disable_play_check: false,
            lenient_play_check: false,
            lenient_play_check_blob: true,
            preferred_quality: None,
            preferred_language: None,
            stall_timeout: 2.0,
            auto_play: false,
            auto_mute: true,
            looping: false,
            muted: false,
            volume: 1.0,
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::InvalidConfig(format!(
                "volume must be within 0..=1, got {}",
                self.volume
            )));
        }
        if self.stall_timeout < 0.0 || Duration::try_from_secs_f64(self.stall_timeout).is_err() {
            return Err(Error::InvalidConfig(format!(
                "stallTimeout must be a non-negative number of seconds, got {}",
                self.stall_timeout
            )));
        }
        Ok(())
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            skip_invalid_items: self.skip_invalid_items,
            skip_invalid_representations: self.skip_invalid_representations,
            skip_empty_data: self.skip_empty_data,
            disable_play_check: self.disable_play_check,
            lenient_play_check: self.lenient_play_check,
            lenient_play_check_blob: self.lenient_play_check_blob,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            stall_timeout: self.stall_timeout_duration(),
            auto_play: self.auto_play,
            auto_mute: self.auto_mute,
            looping: self.looping,
            muted: self.muted,
            volume: self.volume,
        }
    }

    /// `None` when stall detection is disabled or the timeout is not a
    /// representable duration
    pub fn stall_timeout_duration(&self) -> Option<Duration> {
        if self.stall_timeout > 0.0 {
            Duration::try_from_secs_f64(self.stall_timeout).ok()
        } else {
            None
        }
    }
}

/// Validation and play-check policy for [`SourceCatalog`](crate::SourceCatalog)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOptions {
    pub skip_invalid_items: bool,
    pub skip_invalid_representations: bool,
    pub skip_empty_data: bool,
    pub disable_play_check: bool,
    pub lenient_play_check: bool,
    pub lenient_play_check_blob: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        PlayerConfig::default().catalog_options()
    }
}

impl CatalogOptions {
    /// Every validation failure aborts the parse
    pub fn strict() -> Self {
        Self {
            skip_invalid_items: false,
            skip_invalid_representations: false,
            skip_empty_data: false,
            ..Self::default()
        }
    }

    /// Invalid items and representations are dropped silently
    pub fn lenient() -> Self {
        Self {
            skip_invalid_items: true,
            skip_invalid_representations: true,
            ..Self::default()
        }
    }
}

/// Playback behaviour of [`PlaybackSession`](crate::PlaybackSession)
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// `None` disables stall detection
    pub stall_timeout: Option<Duration>,
    pub auto_play: bool,
    pub auto_mute: bool,
    pub looping: bool,
    pub muted: bool,
    pub volume: f64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        PlayerConfig::default().session_options()
    }
}

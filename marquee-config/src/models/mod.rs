use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTO_HIDE_MS, DEFAULT_EVENT_CHANNEL_CAPACITY,
    DEFAULT_HOVER_ACTIVATION_DELAY_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_PLAYBACK_RATE, DEFAULT_MIN_PLAYBACK_RATE,
    DEFAULT_PLAYABLE_EXTENSIONS, DEFAULT_SEEK_STEP_SECONDS,
    DEFAULT_SPEED_PRESETS, DEFAULT_VOLUME, DEFAULT_VOLUME_STEP,
    DEFAULT_YOUTUBE_POLL_MS, DEFAULT_YOUTUBE_SCRIPT_URL,
};

/// Top-level player configuration. Every section falls back to its defaults
/// so partial files only need to name the values they override.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub controls: ControlsConfig,
    pub hover: HoverConfig,
    pub youtube: YouTubeConfig,
    pub torrent: TorrentConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Keyboard, pointer and overlay behaviour of the control surface.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Seconds skipped by the left/right arrow keys. One value for both
    /// directions.
    pub seek_step_seconds: f64,
    /// Volume delta applied by the up/down arrow keys.
    pub volume_step: f64,
    /// Pointer idle time (ms) after which the overlay hides while playing.
    pub auto_hide_ms: u64,
    /// Playback rates cycled by the speed control, ascending.
    pub speed_presets: Vec<f64>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            seek_step_seconds: DEFAULT_SEEK_STEP_SECONDS,
            volume_step: DEFAULT_VOLUME_STEP,
            auto_hide_ms: DEFAULT_AUTO_HIDE_MS,
            speed_presets: DEFAULT_SPEED_PRESETS.to_vec(),
        }
    }
}

impl ControlsConfig {
    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }
}

/// Trailer hover-preview timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HoverConfig {
    /// Time (ms) the pointer has to rest on a card before the preview loads.
    pub activation_delay_ms: u64,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            activation_delay_ms: DEFAULT_HOVER_ACTIVATION_DELAY_MS,
        }
    }
}

impl HoverConfig {
    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }
}

/// IFrame API integration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct YouTubeConfig {
    /// Interval (ms) of the synthesized progress poll while playing. The
    /// IFrame API has no native timeupdate event.
    pub progress_poll_ms: u64,
    pub script_url: String,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            progress_poll_ms: DEFAULT_YOUTUBE_POLL_MS,
            script_url: DEFAULT_YOUTUBE_SCRIPT_URL.to_string(),
        }
    }
}

impl YouTubeConfig {
    pub fn progress_poll_interval(&self) -> Duration {
        Duration::from_millis(self.progress_poll_ms)
    }
}

/// Peer-to-peer streaming.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TorrentConfig {
    /// Extensions (without dot) a torrent file needs to be picked for
    /// playback. The first matching file in torrent order wins.
    pub playable_extensions: Vec<String>,
}

impl Default for TorrentConfig {
    fn default() -> Self {
        Self {
            playable_extensions: DEFAULT_PLAYABLE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Session controller limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Buffer of the public broadcast channel. Slow subscribers past this
    /// many events observe a lag error and skip ahead.
    pub event_channel_capacity: usize,
    /// Volume restored by unmute when the remembered level was zero.
    pub default_volume: f64,
    pub min_playback_rate: f64,
    pub max_playback_rate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            default_volume: DEFAULT_VOLUME,
            min_playback_rate: DEFAULT_MIN_PLAYBACK_RATE,
            max_playback_rate: DEFAULT_MAX_PLAYBACK_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the player modules when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

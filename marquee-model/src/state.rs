use std::fmt::{self, Display, Formatter};

use crate::error::PlaybackError;
use crate::media::{BackendKind, MediaReference};
use crate::swarm::SwarmStats;

/// Lifecycle of a playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Buffering,
    Ended,
    Failed,
}

impl PlaybackState {
    /// `Ended` and `Failed` only leave through a new load
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Ended | PlaybackState::Failed)
    }

    /// States in which an adapter exists and accepts transport commands
    pub fn accepts_commands(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Buffering
        )
    }
}

impl Display for PlaybackState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Loading => "loading",
            PlaybackState::Ready => "ready",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Ended => "ended",
            PlaybackState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Read-only copy of a session's mutable state
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub backend: Option<BackendKind>,
    pub reference: Option<MediaReference>,
    pub current_time_seconds: f64,
    /// Zero until the backend reports a duration
    pub duration_seconds: f64,
    pub volume: f64,
    pub playback_rate: f64,
    pub is_muted: bool,
    pub is_fullscreen: bool,
    pub last_error: Option<PlaybackError>,
    pub swarm: Option<SwarmStats>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            backend: None,
            reference: None,
            current_time_seconds: 0.0,
            duration_seconds: 0.0,
            volume: 1.0,
            playback_rate: 1.0,
            is_muted: false,
            is_fullscreen: false,
            last_error: None,
            swarm: None,
        }
    }
}

impl SessionSnapshot {
    /// Played fraction in `[0, 1]`, zero while the duration is unknown
    pub fn progress_fraction(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            (self.current_time_seconds / self.duration_seconds).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

use crate::error::{PlaybackError, PlaybackErrorKind};
use crate::ids::CardId;
use crate::state::PlaybackState;
use crate::swarm::SwarmStats;

/// Normalised event emitted by a backend adapter after its load settled.
///
/// Load completion itself is reported through the adapter's `load` future,
/// never through this stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterEvent {
    Playing,
    Paused,
    Buffering,
    Progress { current_time: f64, duration: f64 },
    DurationChanged(f64),
    Ended,
    Failed(PlaybackError),
    Swarm(SwarmStats),
}

impl AdapterEvent {
    /// Target state requested by this event, if it drives the state machine
    pub fn requested_state(&self) -> Option<PlaybackState> {
        match self {
            AdapterEvent::Playing => Some(PlaybackState::Playing),
            AdapterEvent::Paused => Some(PlaybackState::Paused),
            AdapterEvent::Buffering => Some(PlaybackState::Buffering),
            AdapterEvent::Ended => Some(PlaybackState::Ended),
            AdapterEvent::Failed(_) => Some(PlaybackState::Failed),
            AdapterEvent::Progress { .. }
            | AdapterEvent::DurationChanged(_)
            | AdapterEvent::Swarm(_) => None,
        }
    }
}

/// Public event stream of a playback session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum PlaybackEvent {
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    Progress {
        current_time: f64,
        duration: f64,
    },
    Error {
        kind: PlaybackErrorKind,
        message: String,
        retryable: bool,
    },
    VolumeChanged {
        volume: f64,
        muted: bool,
    },
    PlaybackRateChanged {
        rate: f64,
    },
    Swarm {
        stats: SwarmStats,
    },
    FullscreenChanged {
        fullscreen: bool,
    },
}

impl From<&PlaybackError> for PlaybackEvent {
    fn from(error: &PlaybackError) -> Self {
        PlaybackEvent::Error {
            kind: error.kind,
            message: error.message.clone(),
            retryable: error.is_retryable(),
        }
    }
}

/// Events published by the hover-preview manager
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum HoverEvent {
    PreviewShown { card_id: CardId },
    PreviewHidden { card_id: CardId },
    PreviewFailed { card_id: CardId, error: PlaybackError },
}

impl HoverEvent {
    pub fn card_id(&self) -> CardId {
        match self {
            HoverEvent::PreviewShown { card_id }
            | HoverEvent::PreviewHidden { card_id }
            | HoverEvent::PreviewFailed { card_id, .. } => *card_id,
        }
    }
}

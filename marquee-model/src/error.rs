use std::fmt::{self, Display};

use thiserror::Error;

/// Classification of playback failures.
///
/// `MediaLoadError` and `NetworkError` are retryable through an explicit user
/// action; the remaining kinds need a different reference to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlaybackErrorKind {
    /// Unparseable url or video id. Fatal to the load attempt only.
    InvalidMediaReference,
    /// The native playback element reported an error.
    MediaLoadError,
    /// The torrent carries no file with a playable video extension.
    NoPlayableFileFound,
    /// Swarm join or script fetch failed.
    NetworkError,
    /// The active backend does not implement the requested operation.
    UnsupportedOperation,
}

impl PlaybackErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaybackErrorKind::MediaLoadError | PlaybackErrorKind::NetworkError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackErrorKind::InvalidMediaReference => {
                "invalid_media_reference"
            }
            PlaybackErrorKind::MediaLoadError => "media_load_error",
            PlaybackErrorKind::NoPlayableFileFound => "no_playable_file_found",
            PlaybackErrorKind::NetworkError => "network_error",
            PlaybackErrorKind::UnsupportedOperation => "unsupported_operation",
        }
    }
}

impl Display for PlaybackErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed playback failure surfaced by adapters and the session controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("{kind}: {message}")]
pub struct PlaybackError {
    pub kind: PlaybackErrorKind,
    pub message: String,
}

impl PlaybackError {
    pub fn new(kind: PlaybackErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_reference(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::InvalidMediaReference, message)
    }

    pub fn media_load(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::MediaLoadError, message)
    }

    pub fn no_playable_file(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::NoPlayableFileFound, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::NetworkError, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(PlaybackErrorKind::UnsupportedOperation, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_load_and_network_errors_are_retryable() {
        assert!(PlaybackError::media_load("decode").is_retryable());
        assert!(PlaybackError::network("swarm").is_retryable());
        assert!(!PlaybackError::no_playable_file("nfo only").is_retryable());
        assert!(!PlaybackError::invalid_reference("??").is_retryable());
        assert!(!PlaybackError::unsupported("rate").is_retryable());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = PlaybackError::network("tracker unreachable");
        assert_eq!(err.to_string(), "network_error: tracker unreachable");
    }
}

use thiserror::Error;

/// Failure reported by a host implementation.
///
/// Adapters convert these into typed playback errors at their boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Media error: {0}")]
    Media(String),

    /// The platform refused the request (autoplay policy, fullscreen
    /// outside a user gesture, ...)
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Host capability unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

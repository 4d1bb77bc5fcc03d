use tokio::sync::mpsc;

use crate::error::Result;

/// Receives every fullscreen change, including exits through browser UI
pub type FullscreenListener = mpsc::UnboundedSender<bool>;

/// Fullscreen control for the player container.
///
/// Implementations run the cross-vendor request/exit sequence
/// (`requestFullscreen`, `webkitRequestFullscreen`, `msRequestFullscreen`
/// and the matching exits). Requests may be rejected outside a user gesture,
/// so callers invoke them synchronously from the input handler.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait FullscreenHost: Send + Sync {
    fn request_fullscreen(&self) -> Result<()>;

    fn exit_fullscreen(&self) -> Result<()>;

    /// Whether the container is the current `document.fullscreenElement`
    fn is_fullscreen(&self) -> bool;

    fn set_change_listener(&self, listener: Option<FullscreenListener>);
}

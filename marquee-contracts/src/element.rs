use std::sync::Arc;

use marquee_model::PreloadHint;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

/// Channel a media element pushes its native events into
pub type ElementListener = mpsc::UnboundedSender<ElementEvent>;

/// Native media element events the core listens to
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    /// Enough data is available to begin playback
    CanPlay,
    Playing,
    Pause,
    /// Playback stalled waiting for data
    Waiting,
    TimeUpdate { current_time: f64, duration: f64 },
    Ended,
    Error { code: Option<u16>, message: String },
}

/// A native video element owned by exactly one adapter.
///
/// Setters are fire-and-forget like their DOM counterparts; results arrive
/// through the listener.
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait MediaElement: Send + Sync {
    /// Attach the single event listener, or detach it with `None`
    fn set_listener(&self, listener: Option<ElementListener>);

    fn set_source(&self, url: &Url);

    /// Remove the source and unload, releasing network and decoder resources
    fn clear_source(&self);

    fn set_preload(&self, preload: PreloadHint);

    fn play(&self) -> Result<()>;

    fn pause(&self);

    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    fn duration(&self) -> Option<f64>;

    fn set_volume(&self, volume: f64);

    fn set_muted(&self, muted: bool);

    fn set_playback_rate(&self, rate: f64);

    fn set_looping(&self, looping: bool);

    fn set_native_controls(&self, enabled: bool);
}

/// Page-level services: origin lookup and element construction
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait MediaHost: Send + Sync {
    /// Origin relative sources are resolved against
    fn origin(&self) -> Url;

    fn create_video_element(&self) -> Arc<dyn MediaElement>;
}

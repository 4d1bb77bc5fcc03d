//! Marquee playback core
//!
//! One playback abstraction over native video files, YouTube embeds and
//! torrent streams:
//!
//! - [`resolver`] classifies raw media strings into typed references.
//! - [`adapters`] implement the common playback contract per backend.
//! - [`session::PlaybackSession`] owns the active adapter and publishes one
//!   event stream.
//! - [`controls::ControlSurface`] renders that stream and maps user input
//!   back onto the session.
//! - [`hover::HoverPreviewManager`] runs muted trailer previews on cards.
//!
//! Host capabilities (video elements, the IFrame API, the peer client,
//! fullscreen) come in through the traits in `marquee-contracts`.

pub mod adapters;
pub mod backends;
pub mod controls;
pub mod hover;
pub mod logging;
pub mod resolver;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backends::PlaybackBackends;
pub use controls::{ControlSurface, ControlsView};
pub use hover::HoverPreviewManager;
pub use resolver::resolve;
pub use session::PlaybackSession;

/// Common imports for embedders
pub mod prelude {
    pub use crate::adapters::{AdapterFactory, AdapterMode, PlaybackAdapter};
    pub use crate::backends::PlaybackBackends;
    pub use crate::controls::{
        ControlAction, ControlSurface, ControlsView, FocusTarget, Key,
    };
    pub use crate::hover::HoverPreviewManager;
    pub use crate::session::PlaybackSession;
    pub use marquee_config::PlayerConfig;
    pub use marquee_model::prelude::*;
}

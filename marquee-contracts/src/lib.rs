//! Trait surfaces that describe the host environment the playback core drives.
//!
//! Every playback technology the core multiplexes lives behind one of these
//! traits: the native video element, the YouTube IFrame API, the peer-to-peer
//! torrent client and the document fullscreen API. Embedders implement them
//! against the real platform; tests implement them with in-process stubs.

pub mod element;
pub mod error;
pub mod fullscreen;
pub mod peer;
pub mod youtube;

pub use error::HostError;

/// Frequently used trait combinators for adapter and UI crates.
pub mod prelude {
    pub use super::element::{
        ElementEvent, ElementListener, MediaElement, MediaHost,
    };
    pub use super::error::HostError;
    pub use super::fullscreen::{FullscreenHost, FullscreenListener};
    pub use super::peer::{PeerClient, PeerNetwork, SwarmEvent, Torrent};
    pub use super::youtube::{
        YouTubeApi, YouTubeEvent, YouTubePlayer, YouTubePlayerState,
        YouTubePlayerVars,
    };
}

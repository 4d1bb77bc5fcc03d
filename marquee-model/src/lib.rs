//! Core data model definitions shared across Marquee crates.
#![allow(missing_docs)]

pub mod error;
pub mod events;
pub mod hover;
pub mod ids;
pub mod media;
pub mod options;
pub mod prelude;
pub mod state;
pub mod swarm;

// Intentionally curated re-exports for downstream consumers.
pub use error::{PlaybackError, PlaybackErrorKind, Result as PlaybackResult};
pub use events::{AdapterEvent, HoverEvent, PlaybackEvent};
pub use hover::{CardView, HoverPhase};
pub use ids::{CardId, ContentId};
pub use media::{BackendKind, ContentItem, MediaKind, MediaLocator, MediaReference};
pub use options::{PlaybackOptions, PreloadHint};
pub use state::{PlaybackState, SessionSnapshot};
pub use swarm::{FileRef, SwarmStats, SwarmStatus, TorrentFile};

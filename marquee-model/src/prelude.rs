//! Convenience re-exports for crates that consume the playback model.

pub use crate::error::{PlaybackError, PlaybackErrorKind};
pub use crate::events::{AdapterEvent, HoverEvent, PlaybackEvent};
pub use crate::hover::{CardView, HoverPhase};
pub use crate::ids::{CardId, ContentId};
pub use crate::media::{
    BackendKind, ContentItem, MediaKind, MediaLocator, MediaReference,
};
pub use crate::options::{PlaybackOptions, PreloadHint};
pub use crate::state::{PlaybackState, SessionSnapshot};
pub use crate::swarm::{FileRef, SwarmStats, SwarmStatus, TorrentFile};

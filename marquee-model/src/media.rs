use std::fmt::{self, Display, Formatter};

use crate::ids::ContentId;

/// Classification of a raw media reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MediaKind {
    /// Origin-relative or uploads-style path served by the platform itself
    Local,
    /// Absolute `http(s)` url on another host
    RemoteUrl,
    /// YouTube watch/short/embed url or a bare video id
    YouTube,
    /// Magnet uri or `.torrent` file url
    Torrent,
}

impl MediaKind {
    /// Playback technology that handles this kind of reference
    pub fn backend(&self) -> BackendKind {
        match self {
            MediaKind::Local | MediaKind::RemoteUrl => BackendKind::Html5,
            MediaKind::YouTube => BackendKind::YouTube,
            MediaKind::Torrent => BackendKind::Torrent,
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Local => write!(f, "Local"),
            MediaKind::RemoteUrl => write!(f, "RemoteUrl"),
            MediaKind::YouTube => write!(f, "YouTube"),
            MediaKind::Torrent => write!(f, "Torrent"),
        }
    }
}

/// Playback technologies behind the adapter contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BackendKind {
    Html5,
    YouTube,
    Torrent,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Html5 => write!(f, "html5"),
            BackendKind::YouTube => write!(f, "youtube"),
            BackendKind::Torrent => write!(f, "torrent"),
        }
    }
}

/// Backend-specific payload extracted while resolving a reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum MediaLocator {
    /// Path or url handed to a native video element. Local paths stay
    /// origin-relative here; the Html5 adapter normalises them.
    Url { url: String },
    YouTube { video_id: String },
    Magnet { uri: String },
    TorrentFile { url: String },
}

/// What to play. Produced by the source resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MediaReference {
    raw_url: String,
    kind: MediaKind,
    locator: MediaLocator,
}

impl MediaReference {
    /// Builds a reference without going through the resolver.
    ///
    /// Callers outside the resolver should only use this in tests; the kind
    /// must always be derivable from `raw_url`.
    #[doc(hidden)]
    pub fn new_unchecked(
        raw_url: impl Into<String>,
        kind: MediaKind,
        locator: MediaLocator,
    ) -> Self {
        Self {
            raw_url: raw_url.into(),
            kind,
            locator,
        }
    }

    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn backend(&self) -> BackendKind {
        self.kind.backend()
    }

    pub fn locator(&self) -> &MediaLocator {
        &self.locator
    }

    /// Extracted video id for YouTube references
    pub fn youtube_id(&self) -> Option<&str> {
        match &self.locator {
            MediaLocator::YouTube { video_id } => Some(video_id),
            _ => None,
        }
    }

    /// Magnet uri or `.torrent` url for torrent references
    pub fn torrent_uri(&self) -> Option<&str> {
        match &self.locator {
            MediaLocator::Magnet { uri } => Some(uri),
            MediaLocator::TorrentFile { url } => Some(url),
            _ => None,
        }
    }

    /// Element source for Html5 references (before origin normalisation)
    pub fn element_source(&self) -> Option<&str> {
        match &self.locator {
            MediaLocator::Url { url } => Some(url),
            _ => None,
        }
    }
}

impl Display for MediaReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.raw_url)
    }
}

/// Content item descriptor supplied by the catalog API
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentItem {
    pub id: ContentId,
    pub title: String,
    pub media_url: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub trailer_url: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub magnet_uri: Option<String>,
    pub poster_url: String,
}

impl ContentItem {
    /// Raw reference for the main session. A magnet wins over the media url.
    pub fn primary_source(&self) -> &str {
        self.magnet_uri
            .as_deref()
            .map(str::trim)
            .filter(|magnet| !magnet.is_empty())
            .unwrap_or(&self.media_url)
    }

    /// Raw reference for the hover preview, if the item has a trailer
    pub fn trailer_source(&self) -> Option<&str> {
        self.trailer_url
            .as_deref()
            .map(str::trim)
            .filter(|trailer| !trailer.is_empty())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use marquee_model::TorrentFile;
use tokio::sync::mpsc;

use crate::element::MediaElement;
use crate::error::Result;

/// Swarm activity reported by the peer client for one torrent
#[derive(Debug, Clone, PartialEq)]
pub enum SwarmEvent {
    Download {
        downloaded_bytes: u64,
        download_speed_bps: u64,
        peer_count: u32,
        progress: f64,
    },
    /// Every piece is local; the client now seeds
    Done,
    Warning(String),
    Error(String),
}

/// Factory for the peer-to-peer client. Called at most once per backends
/// instance; the client is reused for every torrent session.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    async fn create_client(&self) -> Result<Arc<dyn PeerClient>>;
}

/// A running peer-to-peer client
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Join the swarm for `uri` and resolve once torrent metadata (the file
    /// list) is known. Swarm activity flows into `events` from then on.
    async fn add(
        &self,
        uri: &str,
        events: mpsc::UnboundedSender<SwarmEvent>,
    ) -> Result<Arc<dyn Torrent>>;
}

/// A joined torrent
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait Torrent: Send + Sync {
    fn info_hash(&self) -> String;

    fn files(&self) -> Vec<TorrentFile>;

    /// Stream `file_index` into `element` as pieces arrive
    fn render_to(
        &self,
        file_index: usize,
        element: Arc<dyn MediaElement>,
    ) -> Result<()>;

    /// Leave the swarm and stop all network activity for this torrent.
    /// Must take effect before returning.
    fn destroy(&self);
}

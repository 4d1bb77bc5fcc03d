//! Process-wide playback resources.
//!
//! The YouTube IFrame API script and the peer-to-peer client are expensive
//! and must exist at most once. Both are created lazily on first use; the
//! registry itself can be shared through [`PlaybackBackends::install_global`]
//! or passed explicitly, which keeps tests isolated from each other.

use std::fmt;
use std::sync::Arc;

use log::{debug, info, warn};
use marquee_contracts::element::MediaHost;
use marquee_contracts::peer::{PeerClient, PeerNetwork};
use marquee_contracts::youtube::YouTubeApi;
use marquee_model::PlaybackError;
use tokio::sync::OnceCell;

static GLOBAL_BACKENDS: once_cell::sync::OnceCell<Arc<PlaybackBackends>> =
    once_cell::sync::OnceCell::new();

/// Host services plus the lazily created shared backends
pub struct PlaybackBackends {
    media_host: Arc<dyn MediaHost>,
    youtube: Arc<dyn YouTubeApi>,
    peers: Arc<dyn PeerNetwork>,
    youtube_script: OnceCell<()>,
    peer_client: OnceCell<Arc<dyn PeerClient>>,
}

impl fmt::Debug for PlaybackBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackBackends")
            .field("youtube_script_loaded", &self.youtube_script.initialized())
            .field("peer_client_ready", &self.peer_client.initialized())
            .finish_non_exhaustive()
    }
}

impl PlaybackBackends {
    pub fn new(
        media_host: Arc<dyn MediaHost>,
        youtube: Arc<dyn YouTubeApi>,
        peers: Arc<dyn PeerNetwork>,
    ) -> Self {
        Self {
            media_host,
            youtube,
            peers,
            youtube_script: OnceCell::new(),
            peer_client: OnceCell::new(),
        }
    }

    /// Make `backends` the process-wide instance. Fails with the rejected
    /// value if one is already installed.
    pub fn install_global(
        backends: Arc<PlaybackBackends>,
    ) -> Result<(), Arc<PlaybackBackends>> {
        GLOBAL_BACKENDS.set(backends)
    }

    pub fn global() -> Option<Arc<PlaybackBackends>> {
        GLOBAL_BACKENDS.get().cloned()
    }

    pub fn media_host(&self) -> &Arc<dyn MediaHost> {
        &self.media_host
    }

    pub fn youtube_api(&self) -> &Arc<dyn YouTubeApi> {
        &self.youtube
    }

    /// Load the IFrame API script once. Concurrent callers share the pending
    /// load; a failed load is not remembered, so the next caller retries.
    pub async fn ensure_youtube_api(
        &self,
        script_url: &str,
    ) -> Result<(), PlaybackError> {
        self.youtube_script
            .get_or_try_init(|| async {
                info!("loading youtube iframe api from {script_url}");
                self.youtube.load_script(script_url).await.map_err(|err| {
                    warn!("youtube iframe api failed to load: {err}");
                    PlaybackError::network(format!(
                        "youtube iframe api failed to load: {err}"
                    ))
                })
            })
            .await
            .map(|_| ())
    }

    pub fn youtube_api_loaded(&self) -> bool {
        self.youtube_script.initialized()
    }

    /// The shared peer client, created on first use
    pub async fn peer_client(
        &self,
    ) -> Result<Arc<dyn PeerClient>, PlaybackError> {
        self.peer_client
            .get_or_try_init(|| async {
                debug!("starting peer-to-peer client");
                self.peers.create_client().await.map_err(|err| {
                    PlaybackError::network(format!(
                        "peer client failed to start: {err}"
                    ))
                })
            })
            .await
            .map(Arc::clone)
    }

    pub fn peer_client_started(&self) -> bool {
        self.peer_client.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::stubs::{
        CallLog, StubMediaHost, StubPeerNetwork, StubYouTubeApi,
    };

    fn backends(log: &CallLog) -> (PlaybackBackends, Arc<StubYouTubeApi>) {
        let youtube = Arc::new(StubYouTubeApi::new(log.clone()));
        let backends = PlaybackBackends::new(
            Arc::new(StubMediaHost::new(log.clone())),
            youtube.clone(),
            Arc::new(StubPeerNetwork::new(log.clone())),
        );
        (backends, youtube)
    }

    #[tokio::test]
    async fn concurrent_script_loads_share_one_injection() {
        let log = CallLog::new();
        let (backends, _) = backends(&log);
        let url = "https://www.youtube.com/iframe_api";

        let (a, b) = tokio::join!(
            backends.ensure_youtube_api(url),
            backends.ensure_youtube_api(url)
        );
        a.unwrap();
        b.unwrap();
        backends.ensure_youtube_api(url).await.unwrap();

        assert_eq!(log.count("youtube.load_script"), 1);
        assert!(backends.youtube_api_loaded());
    }

    #[tokio::test]
    async fn failed_script_load_can_be_retried() {
        let log = CallLog::new();
        let (backends, youtube) = backends(&log);
        youtube.fail_next_script_loads(1);

        let err = backends.ensure_youtube_api("x").await.unwrap_err();
        assert_eq!(err.kind, marquee_model::PlaybackErrorKind::NetworkError);
        assert!(!backends.youtube_api_loaded());

        backends.ensure_youtube_api("x").await.unwrap();
        assert_eq!(log.count("youtube.load_script"), 2);
    }

    #[tokio::test]
    async fn peer_client_is_created_once() {
        let log = CallLog::new();
        let (backends, _) = backends(&log);

        let first = backends.peer_client().await.unwrap();
        let second = backends.peer_client().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(log.count("peer.create_client"), 1);
    }

    // The only test that touches the process-wide registry
    #[test]
    fn global_registry_keeps_the_first_install() {
        let log = CallLog::new();
        let first = Arc::new(backends(&log).0);
        let second = Arc::new(backends(&log).0);

        PlaybackBackends::install_global(Arc::clone(&first)).unwrap();
        let rejected = PlaybackBackends::install_global(Arc::clone(&second)).unwrap_err();
        assert!(Arc::ptr_eq(&rejected, &second));

        let global = PlaybackBackends::global().unwrap();
        assert!(Arc::ptr_eq(&global, &first));
    }
}

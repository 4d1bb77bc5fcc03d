use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use marquee_config::TorrentConfig;
use marquee_contracts::peer::{SwarmEvent, Torrent};
use marquee_model::{
    AdapterEvent, BackendKind, FileRef, MediaReference, PlaybackError,
    PlaybackOptions, SwarmStats, SwarmStatus, TorrentFile,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::element_bridge::{ElementBridge, ElementGauge, LoadOutcome};
use super::{AdapterEventSink, PlaybackAdapter, TaskGuard, clamp_unit};
use crate::backends::PlaybackBackends;

/// First file, in torrent order, whose extension is playable
pub fn select_playable_file<'a>(
    files: &'a [TorrentFile],
    extensions: &[String],
) -> Option<&'a TorrentFile> {
    files.iter().find(|file| file.has_extension_in(extensions))
}

#[derive(Default)]
struct TorrentInner {
    torrent: Option<Arc<dyn Torrent>>,
    swarm: Option<TaskGuard>,
    selected: Option<FileRef>,
    destroyed: bool,
}

impl TorrentInner {
    /// Leave the swarm and stop forwarding swarm activity
    fn leave_swarm(&mut self) {
        self.swarm.take();
        if let Some(torrent) = self.torrent.take() {
            debug!("leaving swarm {}", torrent.info_hash());
            torrent.destroy();
        }
    }
}

/// Streams the first playable file of a torrent into a native element.
///
/// The peer client is shared through [`PlaybackBackends`]; each adapter owns
/// exactly one joined torrent and leaves its swarm on `destroy`. Until the
/// element plays, swarm downloads are reported as buffering.
pub struct TorrentAdapter {
    backends: Arc<PlaybackBackends>,
    config: TorrentConfig,
    sink: AdapterEventSink,
    bridge: ElementBridge,
    /// Also serialises source changes against `destroy`
    inner: Mutex<TorrentInner>,
}

impl std::fmt::Debug for TorrentAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("TorrentAdapter")
            .field("epoch", &self.sink.epoch())
            .field("selected", &inner.selected)
            .field("destroyed", &inner.destroyed)
            .finish_non_exhaustive()
    }
}

impl TorrentAdapter {
    pub fn new(
        backends: Arc<PlaybackBackends>,
        config: TorrentConfig,
        sink: AdapterEventSink,
    ) -> Self {
        let element = backends.media_host().create_video_element();
        element.set_native_controls(false);
        Self {
            backends,
            config,
            sink,
            bridge: ElementBridge::new(element),
            inner: Mutex::new(TorrentInner::default()),
        }
    }

    /// File chosen for playback once metadata arrived
    pub fn selected_file(&self) -> Option<FileRef> {
        self.inner.lock().selected.clone()
    }

    /// Pick the file and start rendering it. Runs under the adapter lock so
    /// a concurrent `destroy` either precedes it or sees the new source.
    fn start_stream(
        &self,
        inner: &mut TorrentInner,
        torrent: Arc<dyn Torrent>,
        options: &PlaybackOptions,
    ) -> Result<LoadOutcome, PlaybackError> {
        inner.torrent = Some(Arc::clone(&torrent));

        let files = torrent.files();
        let Some(file) =
            select_playable_file(&files, &self.config.playable_extensions)
        else {
            warn!(
                "torrent {} has no playable file among {} entries",
                torrent.info_hash(),
                files.len()
            );
            inner.leave_swarm();
            return Err(PlaybackError::no_playable_file(format!(
                "none of {} files ends in {}",
                files.len(),
                self.config.playable_extensions.join(", ")
            )));
        };

        info!(
            "streaming {} ({} bytes) from torrent {}",
            file.name,
            file.length,
            torrent.info_hash()
        );
        inner.selected = Some(FileRef::from(file));

        let ready = self
            .bridge
            .attach(self.sink.clone(), options.start_time_seconds);
        self.bridge.element().set_preload(options.preload);
        if let Err(err) =
            torrent.render_to(file.index, Arc::clone(self.bridge.element()))
        {
            self.bridge.detach();
            inner.leave_swarm();
            return Err(PlaybackError::media_load(format!(
                "cannot render {}: {err}",
                file.name
            )));
        }
        Ok(ready)
    }
}

#[async_trait]
impl PlaybackAdapter for TorrentAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Torrent
    }

    async fn load(
        &self,
        reference: &MediaReference,
        options: &PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        let uri = reference.torrent_uri().ok_or_else(|| {
            PlaybackError::invalid_reference(format!(
                "{reference} is not a torrent"
            ))
        })?;

        let client = self.backends.peer_client().await?;

        let (swarm_tx, swarm_rx) = mpsc::unbounded_channel();
        {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return Err(PlaybackError::media_load("load cancelled"));
            }
            inner.swarm = Some(TaskGuard::spawn(forward_swarm(
                swarm_rx,
                self.sink.clone(),
                Arc::clone(self.bridge.gauge()),
            )));
        }
        self.sink.emit(AdapterEvent::Swarm(SwarmStats::default()));

        let joined = client.add(uri, swarm_tx).await;

        let ready = {
            let mut inner = self.inner.lock();
            let torrent = match joined {
                Ok(torrent) => torrent,
                Err(err) => {
                    inner.leave_swarm();
                    return Err(PlaybackError::network(format!(
                        "failed to join swarm: {err}"
                    )));
                }
            };
            if inner.destroyed {
                drop(inner);
                // Joined after teardown: nobody else will release it
                torrent.destroy();
                return Err(PlaybackError::media_load("load cancelled"));
            }
            self.start_stream(&mut inner, torrent, options)?
        };

        match ready.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(PlaybackError::media_load("load cancelled")),
        }
    }

    fn play(&self) {
        if let Err(err) = self.bridge.element().play() {
            warn!("torrent play rejected: {err}");
        }
    }

    fn pause(&self) {
        self.bridge.element().pause();
    }

    fn seek(&self, seconds: f64) {
        self.bridge.element().set_current_time(seconds.max(0.0));
    }

    fn set_volume(&self, volume: f64) {
        self.bridge.element().set_volume(clamp_unit(volume));
    }

    fn set_muted(&self, muted: bool) {
        self.bridge.element().set_muted(muted);
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), PlaybackError> {
        Err(PlaybackError::unsupported(format!(
            "torrent streams play at normal speed only (requested {rate})"
        )))
    }

    fn supports_playback_rate(&self) -> bool {
        false
    }

    fn destroy(&self) {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return;
        }
        inner.destroyed = true;
        inner.leave_swarm();
        self.bridge.release();
        debug!("torrent adapter destroyed (epoch {})", self.sink.epoch());
    }
}

/// Forwards swarm activity as stats. A download while the element can play
/// but has no frames flowing means playback waits on the swarm.
async fn forward_swarm(
    mut events: mpsc::UnboundedReceiver<SwarmEvent>,
    sink: AdapterEventSink,
    gauge: Arc<ElementGauge>,
) {
    let mut stats = SwarmStats::default();

    while let Some(event) = events.recv().await {
        match event {
            SwarmEvent::Download {
                downloaded_bytes,
                download_speed_bps,
                peer_count,
                progress,
            } => {
                stats = SwarmStats {
                    status: SwarmStatus::Downloading,
                    downloaded_bytes,
                    download_speed_bps,
                    peer_count,
                    progress: progress.clamp(0.0, 1.0),
                };
                sink.emit(AdapterEvent::Swarm(stats));
                if gauge.is_playable() && gauge.is_starved() {
                    sink.emit(AdapterEvent::Buffering);
                }
            }
            SwarmEvent::Done => {
                stats.status = SwarmStatus::Seeding;
                stats.progress = 1.0;
                stats.download_speed_bps = 0;
                sink.emit(AdapterEvent::Swarm(stats));
            }
            SwarmEvent::Warning(message) => {
                debug!("swarm warning: {message}");
            }
            SwarmEvent::Error(message) => {
                warn!("swarm error: {message}");
                stats.status = SwarmStatus::Error;
                sink.emit(AdapterEvent::Swarm(stats));
                sink.emit(AdapterEvent::Failed(PlaybackError::network(
                    format!("swarm error: {message}"),
                )));
            }
        }
    }
}

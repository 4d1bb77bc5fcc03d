//! Backend adapters: one implementation of [`PlaybackAdapter`] per playback
//! technology, plus the factory the session and hover manager build them
//! through.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::trace;
use marquee_config::PlayerConfig;
use marquee_model::{
    AdapterEvent, BackendKind, MediaKind, MediaReference, PlaybackError,
    PlaybackOptions,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backends::PlaybackBackends;

mod element_bridge;
pub mod hover;
pub mod html5;
pub mod torrent;
pub mod youtube;

pub use hover::HoverAdapter;
pub use html5::Html5Adapter;
pub use torrent::TorrentAdapter;
pub use youtube::YouTubeAdapter;

/// Common contract of every playback backend.
///
/// Methods take `&self`; adapters keep their mutable state behind interior
/// locks so a caller can hold an `Arc<dyn PlaybackAdapter>` and await `load`
/// without holding any lock of its own.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Acquire the media and resolve once playback can start. Failures after
    /// this returns are reported as [`AdapterEvent::Failed`].
    async fn load(
        &self,
        reference: &MediaReference,
        options: &PlaybackOptions,
    ) -> Result<(), PlaybackError>;

    fn play(&self);

    fn pause(&self);

    fn seek(&self, seconds: f64);

    /// Volume in `[0, 1]`
    fn set_volume(&self, volume: f64);

    fn set_muted(&self, muted: bool);

    fn set_playback_rate(&self, rate: f64) -> Result<(), PlaybackError>;

    fn supports_playback_rate(&self) -> bool;

    /// Release every backend resource. Safe to call more than once and
    /// while `load` is pending.
    fn destroy(&self);
}

/// How an adapter presents its media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AdapterMode {
    /// Main player: audible, driven by the control surface
    #[default]
    Main,
    /// Card preview: muted, looping, no native controls
    Hover,
}

/// An adapter event tagged with the load epoch that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct EpochEvent {
    pub epoch: u64,
    pub event: AdapterEvent,
}

/// Where an adapter publishes its runtime events.
///
/// Every event carries the epoch the adapter was created for so the
/// receiver can drop events of adapters it already replaced.
#[derive(Debug, Clone)]
pub struct AdapterEventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<EpochEvent>,
}

impl AdapterEventSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<EpochEvent>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn emit(&self, event: AdapterEvent) {
        let epoch = self.epoch;
        if self.tx.send(EpochEvent { epoch, event }).is_err() {
            trace!("adapter event for epoch {epoch} dropped: receiver gone");
        }
    }
}

/// Builds adapters for resolved references
pub trait AdapterFactory: Send + Sync {
    fn create(
        &self,
        reference: &MediaReference,
        mode: AdapterMode,
        sink: AdapterEventSink,
    ) -> Result<Arc<dyn PlaybackAdapter>, PlaybackError>;
}

/// Dispatches on [`MediaKind`] to the adapters backed by a
/// [`PlaybackBackends`] registry.
#[derive(Clone)]
pub struct BackendAdapterFactory {
    backends: Arc<PlaybackBackends>,
    config: Arc<PlayerConfig>,
}

impl fmt::Debug for BackendAdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendAdapterFactory")
            .field("backends", &self.backends)
            .finish_non_exhaustive()
    }
}

impl BackendAdapterFactory {
    pub fn new(backends: Arc<PlaybackBackends>, config: Arc<PlayerConfig>) -> Self {
        Self { backends, config }
    }

    pub fn backends(&self) -> &Arc<PlaybackBackends> {
        &self.backends
    }
}

impl AdapterFactory for BackendAdapterFactory {
    fn create(
        &self,
        reference: &MediaReference,
        mode: AdapterMode,
        sink: AdapterEventSink,
    ) -> Result<Arc<dyn PlaybackAdapter>, PlaybackError> {
        if mode == AdapterMode::Hover {
            let adapter = HoverAdapter::new(
                reference,
                Arc::clone(&self.backends),
                &self.config,
                sink,
            )?;
            return Ok(Arc::new(adapter));
        }

        let adapter: Arc<dyn PlaybackAdapter> = match reference.kind() {
            MediaKind::Local | MediaKind::RemoteUrl => Arc::new(
                Html5Adapter::new(self.backends.media_host().as_ref(), mode, sink),
            ),
            MediaKind::YouTube => Arc::new(YouTubeAdapter::new(
                Arc::clone(&self.backends),
                self.config.youtube.clone(),
                mode,
                sink,
            )),
            MediaKind::Torrent => Arc::new(TorrentAdapter::new(
                Arc::clone(&self.backends),
                self.config.torrent.clone(),
                sink,
            )),
        };
        Ok(adapter)
    }
}

/// Aborts the wrapped task when dropped
#[derive(Debug)]
pub(crate) struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub(crate) fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self(tokio::spawn(future))
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Volume on the `[0, 1]` scale, NaN treated as silence
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

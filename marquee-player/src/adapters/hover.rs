use std::sync::Arc;

use async_trait::async_trait;
use marquee_config::PlayerConfig;
use marquee_model::{
    BackendKind, MediaKind, MediaReference, PlaybackError, PlaybackOptions,
    PreloadHint,
};

use super::{
    AdapterEventSink, AdapterMode, Html5Adapter, PlaybackAdapter,
    YouTubeAdapter,
};
use crate::backends::PlaybackBackends;

/// Muted, looping trailer preview for a content card.
///
/// Wraps the Html5 or YouTube adapter in hover mode. Previews never join a
/// swarm, so torrent references are refused at construction.
pub struct HoverAdapter {
    inner: Arc<dyn PlaybackAdapter>,
}

impl std::fmt::Debug for HoverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoverAdapter")
            .field("backend", &self.inner.backend())
            .finish()
    }
}

impl HoverAdapter {
    pub fn new(
        reference: &MediaReference,
        backends: Arc<PlaybackBackends>,
        config: &PlayerConfig,
        sink: AdapterEventSink,
    ) -> Result<Self, PlaybackError> {
        let inner: Arc<dyn PlaybackAdapter> = match reference.kind() {
            MediaKind::Local | MediaKind::RemoteUrl => Arc::new(Html5Adapter::new(
                backends.media_host().as_ref(),
                AdapterMode::Hover,
                sink,
            )),
            MediaKind::YouTube => Arc::new(YouTubeAdapter::new(
                backends,
                config.youtube.clone(),
                AdapterMode::Hover,
                sink,
            )),
            MediaKind::Torrent => {
                return Err(PlaybackError::unsupported(format!(
                    "hover previews cannot stream torrents ({reference})"
                )));
            }
        };
        Ok(Self { inner })
    }

    /// Options every preview loads with, whatever the caller asked for
    pub fn preview_options(options: &PlaybackOptions) -> PlaybackOptions {
        PlaybackOptions {
            autoplay: false,
            start_time_seconds: options.start_time_seconds,
            initial_volume: 0.0,
            preload: PreloadHint::Auto,
        }
    }
}

#[async_trait]
impl PlaybackAdapter for HoverAdapter {
    fn backend(&self) -> BackendKind {
        self.inner.backend()
    }

    async fn load(
        &self,
        reference: &MediaReference,
        options: &PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        self.inner.set_muted(true);
        self.inner
            .load(reference, &Self::preview_options(options))
            .await
    }

    fn play(&self) {
        self.inner.play();
    }

    fn pause(&self) {
        self.inner.pause();
    }

    fn seek(&self, seconds: f64) {
        self.inner.seek(seconds);
    }

    fn set_volume(&self, volume: f64) {
        self.inner.set_volume(volume);
    }

    fn set_muted(&self, _muted: bool) {
        self.inner.set_muted(true);
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), PlaybackError> {
        self.inner.set_playback_rate(rate)
    }

    fn supports_playback_rate(&self) -> bool {
        self.inner.supports_playback_rate()
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

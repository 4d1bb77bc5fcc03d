use async_trait::async_trait;
use log::{debug, warn};
use marquee_contracts::element::MediaHost;
use marquee_model::{
    BackendKind, MediaReference, PlaybackError, PlaybackOptions,
};
use parking_lot::Mutex;
use url::Url;

use super::element_bridge::ElementBridge;
use super::{AdapterEventSink, AdapterMode, PlaybackAdapter, clamp_unit};
use crate::resolver::normalize_local_url;

#[derive(Debug, Clone, Copy)]
struct ElementSettings {
    volume: f64,
    muted: bool,
    rate: f64,
    destroyed: bool,
}

/// Plays local and remote files through a native video element
#[derive(Debug)]
pub struct Html5Adapter {
    bridge: ElementBridge,
    origin: Url,
    mode: AdapterMode,
    sink: AdapterEventSink,
    /// Also serialises source changes against `destroy`
    settings: Mutex<ElementSettings>,
}

impl Html5Adapter {
    /// Creates the adapter together with its element
    pub fn new(
        host: &dyn MediaHost,
        mode: AdapterMode,
        sink: AdapterEventSink,
    ) -> Self {
        let element = host.create_video_element();
        let hover = mode == AdapterMode::Hover;
        element.set_native_controls(false);
        element.set_looping(hover);
        element.set_muted(hover);

        Self {
            bridge: ElementBridge::new(element),
            origin: host.origin(),
            mode,
            sink,
            settings: Mutex::new(ElementSettings {
                volume: 1.0,
                muted: hover,
                rate: 1.0,
                destroyed: false,
            }),
        }
    }

    pub fn mode(&self) -> AdapterMode {
        self.mode
    }

    fn apply_settings(&self, settings: &ElementSettings) {
        let element = self.bridge.element();
        element.set_volume(settings.volume);
        element.set_muted(settings.muted);
        element.set_playback_rate(settings.rate);
    }
}

#[async_trait]
impl PlaybackAdapter for Html5Adapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Html5
    }

    async fn load(
        &self,
        reference: &MediaReference,
        options: &PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        let source = reference.element_source().ok_or_else(|| {
            PlaybackError::invalid_reference(format!(
                "{reference} cannot play in a video element"
            ))
        })?;
        let url = normalize_local_url(source, &self.origin)?;

        let ready = {
            let settings = self.settings.lock();
            if settings.destroyed {
                return Err(PlaybackError::media_load("adapter already destroyed"));
            }
            debug!("html5 load {url} ({:?})", self.mode);
            let ready =
                self.bridge.attach(self.sink.clone(), options.start_time_seconds);
            let element = self.bridge.element();
            element.set_preload(options.preload);
            self.apply_settings(&settings);
            element.set_source(&url);
            ready
        };

        match ready.await {
            Ok(Ok(())) => {
                // Some engines reset these when the source changes
                let settings = self.settings.lock();
                if !settings.destroyed {
                    self.apply_settings(&settings);
                }
                Ok(())
            }
            Ok(Err(error)) => Err(error),
            Err(_) => Err(PlaybackError::media_load("load cancelled")),
        }
    }

    fn play(&self) {
        if let Err(err) = self.bridge.element().play() {
            warn!("html5 play rejected: {err}");
        }
    }

    fn pause(&self) {
        self.bridge.element().pause();
    }

    fn seek(&self, seconds: f64) {
        self.bridge.element().set_current_time(seconds.max(0.0));
    }

    fn set_volume(&self, volume: f64) {
        let volume = clamp_unit(volume);
        self.settings.lock().volume = volume;
        self.bridge.element().set_volume(volume);
    }

    fn set_muted(&self, muted: bool) {
        // Previews never make a sound
        let muted = muted || self.mode == AdapterMode::Hover;
        self.settings.lock().muted = muted;
        self.bridge.element().set_muted(muted);
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), PlaybackError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::unsupported(format!(
                "invalid playback rate {rate}"
            )));
        }
        self.settings.lock().rate = rate;
        self.bridge.element().set_playback_rate(rate);
        Ok(())
    }

    fn supports_playback_rate(&self) -> bool {
        true
    }

    fn destroy(&self) {
        let mut settings = self.settings.lock();
        if settings.destroyed {
            return;
        }
        settings.destroyed = true;
        self.bridge.release();
        debug!("html5 adapter destroyed (epoch {})", self.sink.epoch());
    }
}

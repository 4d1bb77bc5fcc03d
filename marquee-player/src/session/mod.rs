//! Playback session controller.
//!
//! A [`PlaybackSession`] owns at most one adapter at a time, mediates every
//! transport command, and republishes adapter activity as one public
//! [`PlaybackEvent`] stream.
//!
//! Loads are numbered by an epoch counter. Every adapter is created with a
//! sink tagged with its epoch; events and load results carrying an older
//! epoch are discarded, so a slow load can never overwrite a newer one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info, trace, warn};
use marquee_config::{PlayerConfig, SessionConfig};
use marquee_model::{
    AdapterEvent, ContentItem, MediaReference, PlaybackError,
    PlaybackErrorKind, PlaybackEvent, PlaybackOptions, PlaybackState,
    SessionSnapshot,
};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};

use crate::adapters::{
    AdapterEventSink, AdapterFactory, AdapterMode, BackendAdapterFactory,
    EpochEvent, PlaybackAdapter, TaskGuard, clamp_unit,
};
use crate::backends::PlaybackBackends;
use crate::resolver;

pub mod state;

pub use state::{SessionStateMachine, Transition};

/// Clamp a seek target into `[0, duration]`. The upper bound applies only
/// once the duration is known.
pub fn clamp_seek(target: f64, duration: f64) -> f64 {
    let target = target.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        target.min(duration)
    } else {
        target
    }
}

struct SessionState {
    machine: SessionStateMachine,
    adapter: Option<Arc<dyn PlaybackAdapter>>,
    reference: Option<MediaReference>,
    last_request: Option<(String, PlaybackOptions)>,
    current_time: f64,
    duration: f64,
    volume: f64,
    muted: bool,
    volume_before_mute: f64,
    playback_rate: f64,
    fullscreen: bool,
    last_error: Option<PlaybackError>,
    swarm: Option<marquee_model::SwarmStats>,
}

impl SessionState {
    fn new(default_volume: f64) -> Self {
        Self {
            machine: SessionStateMachine::new(),
            adapter: None,
            reference: None,
            last_request: None,
            current_time: 0.0,
            duration: 0.0,
            volume: default_volume,
            muted: false,
            volume_before_mute: default_volume,
            playback_rate: 1.0,
            fullscreen: false,
            last_error: None,
            swarm: None,
        }
    }

    fn clear_media(&mut self) {
        self.reference = None;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.last_error = None;
        self.swarm = None;
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.machine.state(),
            backend: self.adapter.as_ref().map(|adapter| adapter.backend()),
            reference: self.reference.clone(),
            current_time_seconds: self.current_time,
            duration_seconds: self.duration,
            volume: self.volume,
            playback_rate: self.playback_rate,
            is_muted: self.muted,
            is_fullscreen: self.fullscreen,
            last_error: self.last_error.clone(),
            swarm: self.swarm,
        }
    }
}

struct SessionInner {
    factory: Arc<dyn AdapterFactory>,
    config: SessionConfig,
    epoch: AtomicU64,
    state: Mutex<SessionState>,
    events: broadcast::Sender<PlaybackEvent>,
    adapter_tx: mpsc::UnboundedSender<EpochEvent>,
    pump: Mutex<Option<TaskGuard>>,
}

impl SessionInner {
    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn publish(&self, event: PlaybackEvent) {
        trace!("session event {event:?}");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn publish_transition(&self, transition: Transition) {
        match transition {
            Transition::Changed { from, to } => {
                debug!("playback state {from} -> {to}");
                self.publish(PlaybackEvent::StateChanged { from, to });
            }
            Transition::Rejected { from, to } => {
                debug!("ignored transition {from} -> {to}");
            }
            Transition::Unchanged => {}
        }
    }

    fn fail(&self, state: &mut SessionState, error: &PlaybackError) {
        warn!("playback failed: {error}");
        state.last_error = Some(error.clone());
        let transition = state.machine.apply(PlaybackState::Failed);
        self.publish_transition(transition);
        self.publish(PlaybackEvent::from(error));
    }

    fn handle_adapter_event(&self, EpochEvent { epoch, event }: EpochEvent) {
        let mut state = self.state.lock();
        if epoch != self.current_epoch() {
            trace!("dropping event of stale epoch {epoch}: {event:?}");
            return;
        }

        match event {
            AdapterEvent::Progress {
                current_time,
                duration,
            } => {
                if current_time.is_finite() {
                    state.current_time = current_time.max(0.0);
                }
                if duration.is_finite() && duration > 0.0 {
                    state.duration = duration;
                }
                self.publish(PlaybackEvent::Progress {
                    current_time: state.current_time,
                    duration: state.duration,
                });
            }
            AdapterEvent::DurationChanged(duration) => {
                if duration.is_finite()
                    && duration > 0.0
                    && duration != state.duration
                {
                    state.duration = duration;
                    self.publish(PlaybackEvent::Progress {
                        current_time: state.current_time,
                        duration,
                    });
                }
            }
            AdapterEvent::Swarm(stats) => {
                state.swarm = Some(stats);
                self.publish(PlaybackEvent::Swarm { stats });
            }
            AdapterEvent::Failed(error) => {
                if state.machine.state() != PlaybackState::Failed {
                    self.fail(&mut state, &error);
                }
            }
            AdapterEvent::Playing
            | AdapterEvent::Paused
            | AdapterEvent::Buffering
            | AdapterEvent::Ended => {
                if let Some(to) = event.requested_state() {
                    let transition = state.machine.apply(to);
                    self.publish_transition(transition);
                }
            }
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(adapter) = self.state.get_mut().adapter.take() {
            adapter.destroy();
        }
    }
}

/// Owns the active adapter of one player and the state it reports.
///
/// Cloning is cheap and yields a handle to the same session. Must be created
/// inside a tokio runtime: construction spawns the task that drains adapter
/// events.
#[derive(Clone)]
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("epoch", &self.inner.current_epoch())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    pub fn new(factory: Arc<dyn AdapterFactory>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        let (adapter_tx, adapter_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(SessionInner {
            factory,
            state: Mutex::new(SessionState::new(clamp_unit(config.default_volume))),
            config,
            epoch: AtomicU64::new(0),
            events,
            adapter_tx,
            pump: Mutex::new(None),
        });

        let pump = TaskGuard::spawn(pump_adapter_events(
            Arc::downgrade(&inner),
            adapter_rx,
        ));
        *inner.pump.lock() = Some(pump);

        Self { inner }
    }

    /// Session over the real backend adapters
    pub fn with_backends(
        backends: Arc<PlaybackBackends>,
        config: Arc<PlayerConfig>,
    ) -> Self {
        let session_config = config.session.clone();
        let factory = BackendAdapterFactory::new(backends, config);
        Self::new(Arc::new(factory), session_config)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().machine.state()
    }

    /// Load `raw_url`, replacing whatever was loaded before.
    ///
    /// The previous adapter is destroyed before the new one is built. If a
    /// newer load or `dispose` supersedes this call while it is pending, the
    /// outcome is discarded and `Ok(())` returned.
    pub async fn load_media(
        &self,
        raw_url: &str,
        options: PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        let options = options.normalized();
        let inner = &self.inner;

        let epoch = {
            let mut state = inner.state.lock();
            let epoch = inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            if let Some(previous) = state.adapter.take() {
                debug!("tearing down {:?} adapter for epoch {epoch}", previous.backend());
                previous.destroy();
            }
            state.clear_media();
            state.last_request = Some((raw_url.to_string(), options));
            let transition = state.machine.begin_load();
            inner.publish_transition(transition);
            epoch
        };

        let reference = match resolver::resolve(raw_url) {
            Ok(reference) => reference,
            Err(error) => return self.settle_failure(epoch, error),
        };

        let sink = AdapterEventSink::new(epoch, inner.adapter_tx.clone());
        let adapter = match inner.factory.create(&reference, AdapterMode::Main, sink) {
            Ok(adapter) => adapter,
            Err(error) => return self.settle_failure(epoch, error),
        };

        {
            let mut state = inner.state.lock();
            if epoch != inner.current_epoch() {
                drop(state);
                adapter.destroy();
                return Ok(());
            }

            let volume_changed = state.volume != options.initial_volume;
            state.volume = options.initial_volume;
            adapter.set_volume(state.volume);
            adapter.set_muted(state.muted);
            if state.playback_rate != 1.0
                && let Err(error) = adapter.set_playback_rate(state.playback_rate)
            {
                debug!("keeping default rate: {error}");
                state.playback_rate = 1.0;
                inner.publish(PlaybackEvent::PlaybackRateChanged { rate: 1.0 });
            }
            if volume_changed {
                inner.publish(PlaybackEvent::VolumeChanged {
                    volume: state.volume,
                    muted: state.muted,
                });
            }

            state.adapter = Some(Arc::clone(&adapter));
            state.reference = Some(reference.clone());
        }

        info!("loading {reference} (epoch {epoch})");
        let result = adapter.load(&reference, &options).await;

        {
            let mut state = inner.state.lock();
            if epoch != inner.current_epoch() {
                drop(state);
                debug!("discarding result of superseded load {epoch}");
                // Idempotent; also reclaims what the load acquired late
                adapter.destroy();
                return Ok(());
            }

            match result {
                Ok(()) => {
                    if state.machine.state() == PlaybackState::Failed {
                        return Err(state.last_error.clone().unwrap_or_else(|| {
                            PlaybackError::media_load("playback failed while loading")
                        }));
                    }
                    let transition = state.machine.apply(PlaybackState::Ready);
                    inner.publish_transition(transition);
                }
                Err(error) => {
                    inner.fail(&mut state, &error);
                    return Err(error);
                }
            }
        }

        if options.autoplay {
            self.play();
        }
        Ok(())
    }

    /// Load the primary source of a catalog item
    pub async fn load_item(
        &self,
        item: &ContentItem,
        options: PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        debug!("loading content item {} ({})", item.id, item.title);
        self.load_media(item.primary_source(), options).await
    }

    /// Reload the last reference after a retryable failure
    pub async fn retry(&self) -> Result<(), PlaybackError> {
        let (raw_url, options) = {
            let state = self.inner.state.lock();
            match (&state.last_error, &state.last_request) {
                (Some(error), Some(request)) if error.is_retryable() => {
                    request.clone()
                }
                (Some(error), _) => return Err(error.clone()),
                _ => {
                    return Err(PlaybackError::new(
                        PlaybackErrorKind::MediaLoadError,
                        "nothing to retry",
                    ));
                }
            }
        };
        info!("retrying {raw_url}");
        self.load_media(&raw_url, options).await
    }

    pub fn play(&self) {
        if let Some(adapter) = self.command_target("play") {
            adapter.play();
        }
    }

    pub fn pause(&self) {
        if let Some(adapter) = self.command_target("pause") {
            adapter.pause();
        }
    }

    pub fn toggle_play_pause(&self) {
        match self.state() {
            PlaybackState::Playing | PlaybackState::Buffering => self.pause(),
            _ => self.play(),
        }
    }

    /// Seek to `value` seconds, or by `value` seconds when `is_relative`
    pub fn seek(&self, value: f64, is_relative: bool) {
        if !value.is_finite() {
            warn!("seek ignored: target {value} is not finite");
            return;
        }
        let (adapter, target) = {
            let mut state = self.inner.state.lock();
            let Some(adapter) = self.command_target_locked(&state, "seek") else {
                return;
            };
            let base = if is_relative {
                state.current_time + value
            } else {
                value
            };
            let target = clamp_seek(base, state.duration);
            state.current_time = target;
            self.inner.publish(PlaybackEvent::Progress {
                current_time: target,
                duration: state.duration,
            });
            (adapter, target)
        };
        adapter.seek(target);
    }

    /// Set the volume, clamped into `[0, 1]`. A positive volume unmutes.
    pub fn set_volume(&self, volume: f64) {
        if volume.is_nan() {
            warn!("volume ignored: NaN");
            return;
        }
        let volume = clamp_unit(volume);
        let mut state = self.inner.state.lock();
        let unmute = volume > 0.0 && state.muted;
        if state.volume == volume && !unmute {
            return;
        }
        state.volume = volume;
        if unmute {
            state.muted = false;
        }
        if let Some(adapter) = &state.adapter {
            adapter.set_volume(volume);
            if unmute {
                adapter.set_muted(false);
            }
        }
        self.inner.publish(PlaybackEvent::VolumeChanged {
            volume,
            muted: state.muted,
        });
    }

    /// Mute remembers the volume; unmute restores it, or the configured
    /// default when the remembered level was zero.
    pub fn toggle_mute(&self) {
        let mut state = self.inner.state.lock();
        if state.muted {
            let restored = if state.volume_before_mute > 0.0 {
                state.volume_before_mute
            } else {
                clamp_unit(self.inner.config.default_volume)
            };
            state.muted = false;
            state.volume = restored;
        } else {
            state.volume_before_mute = state.volume;
            state.muted = true;
        }
        if let Some(adapter) = &state.adapter {
            adapter.set_muted(state.muted);
            adapter.set_volume(state.volume);
        }
        self.inner.publish(PlaybackEvent::VolumeChanged {
            volume: state.volume,
            muted: state.muted,
        });
    }

    /// Change the playback rate, clamped into the configured range. Backends
    /// without rate control keep playing at their current rate.
    pub fn set_playback_rate(&self, rate: f64) {
        if !rate.is_finite() {
            warn!("playback rate ignored: {rate} is not finite");
            return;
        }
        let config = &self.inner.config;
        let rate = rate.clamp(config.min_playback_rate, config.max_playback_rate);

        let mut state = self.inner.state.lock();
        if let Some(adapter) = &state.adapter {
            match adapter.set_playback_rate(rate) {
                Ok(()) => {}
                Err(error) if error.kind == PlaybackErrorKind::UnsupportedOperation => {
                    info!("playback rate unchanged: {error}");
                    return;
                }
                Err(error) => {
                    warn!("playback rate change failed: {error}");
                    return;
                }
            }
        }
        if state.playback_rate != rate {
            state.playback_rate = rate;
            self.inner.publish(PlaybackEvent::PlaybackRateChanged { rate });
        }
    }

    /// Whether the active backend can change its playback rate
    pub fn supports_playback_rate(&self) -> bool {
        self.inner
            .state
            .lock()
            .adapter
            .as_ref()
            .is_some_and(|adapter| adapter.supports_playback_rate())
    }

    /// Mirror the container's fullscreen state
    pub fn set_fullscreen(&self, fullscreen: bool) {
        let mut state = self.inner.state.lock();
        if state.fullscreen != fullscreen {
            state.fullscreen = fullscreen;
            self.inner
                .publish(PlaybackEvent::FullscreenChanged { fullscreen });
        }
    }

    /// Destroy the adapter and return to `Idle`. Safe to call repeatedly.
    pub fn dispose(&self) {
        let mut state = self.inner.state.lock();
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        if let Some(adapter) = state.adapter.take() {
            debug!("disposing {:?} adapter", adapter.backend());
            adapter.destroy();
        }
        state.clear_media();
        let transition = state.machine.reset();
        self.inner.publish_transition(transition);
    }

    /// Record a load failure unless a newer load superseded `epoch`
    fn settle_failure(
        &self,
        epoch: u64,
        error: PlaybackError,
    ) -> Result<(), PlaybackError> {
        let mut state = self.inner.state.lock();
        if epoch != self.inner.current_epoch() {
            debug!("discarding failure of superseded load {epoch}: {error}");
            return Ok(());
        }
        self.inner.fail(&mut state, &error);
        Err(error)
    }

    fn command_target(&self, command: &str) -> Option<Arc<dyn PlaybackAdapter>> {
        let state = self.inner.state.lock();
        self.command_target_locked(&state, command)
    }

    fn command_target_locked(
        &self,
        state: &MutexGuard<'_, SessionState>,
        command: &str,
    ) -> Option<Arc<dyn PlaybackAdapter>> {
        let current = state.machine.state();
        match &state.adapter {
            None => {
                warn!("{command} ignored: no media loaded");
                None
            }
            Some(_) if !current.accepts_commands() => {
                warn!("{command} ignored while {current}");
                None
            }
            Some(adapter) => Some(Arc::clone(adapter)),
        }
    }
}

async fn pump_adapter_events(
    session: Weak<SessionInner>,
    mut events: mpsc::UnboundedReceiver<EpochEvent>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };
        inner.handle_adapter_event(event);
    }
}

//! Backend-agnostic control surface.
//!
//! The surface never talks to an adapter. It mirrors the session's public
//! event stream into a [`ControlsView`] and turns user input into session
//! commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, warn};
use marquee_config::ControlsConfig;
use marquee_contracts::fullscreen::FullscreenHost;
use marquee_model::{
    PlaybackError, PlaybackErrorKind, PlaybackEvent, PlaybackState,
    SessionSnapshot, SwarmStats,
};
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

use crate::adapters::TaskGuard;
use crate::session::PlaybackSession;

pub mod format;
pub mod keyboard;

pub use format::{format_rate, format_time, fraction_at};
pub use keyboard::{ControlAction, FocusTarget, Key, Named, action_for};

/// Error shown over the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBanner {
    pub kind: PlaybackErrorKind,
    pub message: String,
    /// Whether the banner offers a retry button
    pub retryable: bool,
}

/// Everything the controls overlay renders
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsView {
    pub visible: bool,
    pub state: PlaybackState,
    /// Play/pause glyph: shows "pause" while true
    pub is_playing: bool,
    /// Spinner over the video
    pub buffering: bool,
    pub current_time: f64,
    pub duration: f64,
    pub played_fraction: f64,
    pub time_label: String,
    pub duration_label: String,
    pub volume: f64,
    pub muted: bool,
    pub playback_rate: f64,
    pub speed_label: String,
    pub fullscreen: bool,
    pub error: Option<ErrorBanner>,
    pub swarm: Option<SwarmStats>,
}

impl Default for ControlsView {
    fn default() -> Self {
        Self::from_snapshot(&SessionSnapshot::default())
    }
}

impl ControlsView {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let mut view = Self {
            visible: true,
            state: snapshot.state,
            is_playing: false,
            buffering: false,
            current_time: 0.0,
            duration: 0.0,
            played_fraction: 0.0,
            time_label: String::new(),
            duration_label: String::new(),
            volume: snapshot.volume,
            muted: snapshot.is_muted,
            playback_rate: snapshot.playback_rate,
            speed_label: format_rate(snapshot.playback_rate),
            fullscreen: snapshot.is_fullscreen,
            error: snapshot.last_error.as_ref().map(|error| ErrorBanner {
                kind: error.kind,
                message: error.message.clone(),
                retryable: error.is_retryable(),
            }),
            swarm: snapshot.swarm,
        };
        view.set_state(snapshot.state);
        view.set_position(
            snapshot.current_time_seconds,
            snapshot.duration_seconds,
        );
        view
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.is_playing = state == PlaybackState::Playing;
        self.buffering =
            matches!(state, PlaybackState::Loading | PlaybackState::Buffering);
        match state {
            PlaybackState::Loading => self.error = None,
            PlaybackState::Idle => {
                self.error = None;
                self.swarm = None;
                self.set_position(0.0, 0.0);
            }
            _ => {}
        }
    }

    fn set_position(&mut self, current_time: f64, duration: f64) {
        self.current_time = current_time;
        self.duration = duration;
        self.played_fraction = if duration > 0.0 {
            (current_time / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.time_label = format_time(current_time);
        self.duration_label = format_time(duration);
    }

    /// Fold one session event into the view
    pub fn apply(&mut self, event: &PlaybackEvent) {
        match event {
            PlaybackEvent::StateChanged { to, .. } => self.set_state(*to),
            PlaybackEvent::Progress {
                current_time,
                duration,
            } => self.set_position(*current_time, *duration),
            PlaybackEvent::Error {
                kind,
                message,
                retryable,
            } => {
                self.error = Some(ErrorBanner {
                    kind: *kind,
                    message: message.clone(),
                    retryable: *retryable,
                });
            }
            PlaybackEvent::VolumeChanged { volume, muted } => {
                self.volume = *volume;
                self.muted = *muted;
            }
            PlaybackEvent::PlaybackRateChanged { rate } => {
                self.playback_rate = *rate;
                self.speed_label = format_rate(*rate);
            }
            PlaybackEvent::Swarm { stats } => self.swarm = Some(*stats),
            PlaybackEvent::FullscreenChanged { fullscreen } => {
                self.fullscreen = *fullscreen;
            }
        }
    }
}

/// State shared with the mirroring and auto-hide tasks
struct SurfaceShared {
    view: Mutex<ControlsView>,
    hide_timer: Mutex<Option<TaskGuard>>,
    auto_hide: Duration,
}

impl SurfaceShared {
    fn apply(self: &Arc<Self>, event: &PlaybackEvent) {
        let mut view = self.view.lock();
        view.apply(event);
        if let PlaybackEvent::StateChanged { to, .. } = event {
            if *to == PlaybackState::Playing {
                self.schedule_hide();
            } else {
                self.hide_timer.lock().take();
                view.visible = true;
            }
        }
    }

    /// Show the controls and restart the idle countdown while playing
    fn show(self: &Arc<Self>) {
        let mut view = self.view.lock();
        view.visible = true;
        if view.state == PlaybackState::Playing {
            self.schedule_hide();
        } else {
            self.hide_timer.lock().take();
        }
    }

    fn schedule_hide(self: &Arc<Self>) {
        let shared = Arc::downgrade(self);
        let delay = self.auto_hide;
        *self.hide_timer.lock() = Some(TaskGuard::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                let mut view = shared.view.lock();
                if view.state == PlaybackState::Playing {
                    debug!("controls hidden after {delay:?} idle");
                    view.visible = false;
                }
            }
        }));
    }
}

/// Player controls bound to one session and one fullscreen container
pub struct ControlSurface {
    session: PlaybackSession,
    fullscreen: Arc<dyn FullscreenHost>,
    config: ControlsConfig,
    shared: Arc<SurfaceShared>,
    tasks: Mutex<Vec<TaskGuard>>,
    focused: AtomicBool,
}

impl std::fmt::Debug for ControlSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSurface")
            .field("session", &self.session)
            .field("view", &*self.shared.view.lock())
            .finish_non_exhaustive()
    }
}

impl ControlSurface {
    /// Start mirroring `session` and the container's fullscreen state.
    /// Must be called inside a tokio runtime.
    pub fn mount(
        session: PlaybackSession,
        fullscreen: Arc<dyn FullscreenHost>,
        config: ControlsConfig,
    ) -> Self {
        session.set_fullscreen(fullscreen.is_fullscreen());
        let events = session.subscribe();
        let shared = Arc::new(SurfaceShared {
            view: Mutex::new(ControlsView::from_snapshot(&session.snapshot())),
            hide_timer: Mutex::new(None),
            auto_hide: config.auto_hide_delay(),
        });

        let (fullscreen_tx, fullscreen_rx) = mpsc::unbounded_channel();
        let tasks = vec![
            TaskGuard::spawn(mirror_session(
                Arc::downgrade(&shared),
                session.clone(),
                events,
            )),
            TaskGuard::spawn(mirror_fullscreen(session.clone(), fullscreen_rx)),
        ];
        fullscreen.set_change_listener(Some(fullscreen_tx));
        if session.state() == PlaybackState::Playing {
            shared.schedule_hide();
        }

        Self {
            session,
            fullscreen,
            config,
            shared,
            tasks: Mutex::new(tasks),
            focused: AtomicBool::new(false),
        }
    }

    pub fn view(&self) -> ControlsView {
        self.shared.view.lock().clone()
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Keyboard shortcuts only apply while the player has focus
    pub fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Release);
    }

    /// Returns whether the key was consumed
    pub fn handle_key(&self, key: &Key, focus: FocusTarget) -> bool {
        if !self.focused.load(Ordering::Acquire) {
            return false;
        }
        let Some(action) = action_for(key, focus, &self.config) else {
            return false;
        };
        debug!("shortcut {key:?} -> {action:?}");
        self.shared.show();
        self.perform(action);
        true
    }

    pub fn perform(&self, action: ControlAction) {
        match action {
            ControlAction::TogglePlay => self.session.toggle_play_pause(),
            ControlAction::SeekBy(seconds) => self.session.seek(seconds, true),
            ControlAction::VolumeBy(delta) => {
                let volume = self.session.snapshot().volume;
                self.session.set_volume(volume + delta);
            }
            ControlAction::ToggleFullscreen => self.toggle_fullscreen(),
            ControlAction::ExitFullscreen => {
                if self.fullscreen.is_fullscreen()
                    && let Err(err) = self.fullscreen.exit_fullscreen()
                {
                    warn!("leaving fullscreen failed: {err}");
                }
            }
            ControlAction::ToggleMute => self.session.toggle_mute(),
            ControlAction::SpeedUp => self.step_speed(true, false),
            ControlAction::SpeedDown => self.step_speed(false, false),
        }
    }

    pub fn toggle_play_pause(&self) {
        self.shared.show();
        self.session.toggle_play_pause();
    }

    /// Seek to the clicked position of the progress bar
    pub fn progress_clicked(&self, x: f64, width: f64) {
        self.shared.show();
        let Some(fraction) = fraction_at(x, width) else {
            debug!("progress click ignored: bar width {width}");
            return;
        };
        let duration = self.session.snapshot().duration_seconds;
        if duration <= 0.0 {
            debug!("progress click ignored: duration unknown");
            return;
        }
        self.session.seek(fraction * duration, false);
    }

    pub fn set_volume(&self, volume: f64) {
        self.shared.show();
        self.session.set_volume(volume);
    }

    pub fn toggle_mute(&self) {
        self.shared.show();
        self.session.toggle_mute();
    }

    pub fn pointer_moved(&self) {
        self.shared.show();
    }

    /// Whether the speed control is enabled for the current backend
    pub fn speed_enabled(&self) -> bool {
        self.session.supports_playback_rate()
    }

    /// Advance to the next speed preset, wrapping after the fastest
    pub fn cycle_speed(&self) {
        self.shared.show();
        self.step_speed(true, true);
    }

    fn step_speed(&self, faster: bool, wrap: bool) {
        if !self.session.supports_playback_rate() {
            debug!("speed change ignored: backend has a fixed rate");
            return;
        }
        let presets = &self.config.speed_presets;
        let current = self.session.snapshot().playback_rate;
        const EPSILON: f64 = 1e-6;

        let next = if faster {
            presets
                .iter()
                .copied()
                .find(|rate| *rate > current + EPSILON)
                .or_else(|| wrap.then(|| presets.first().copied()).flatten())
        } else {
            presets
                .iter()
                .rev()
                .copied()
                .find(|rate| *rate < current - EPSILON)
                .or_else(|| wrap.then(|| presets.last().copied()).flatten())
        };
        if let Some(rate) = next {
            self.session.set_playback_rate(rate);
        }
    }

    /// Request or leave fullscreen. The resulting state arrives through the
    /// host's change notifications.
    pub fn toggle_fullscreen(&self) {
        self.shared.show();
        let result = if self.fullscreen.is_fullscreen() {
            self.fullscreen.exit_fullscreen()
        } else {
            self.fullscreen.request_fullscreen()
        };
        if let Err(err) = result {
            warn!("fullscreen request rejected: {err}");
        }
    }

    /// Retry from the error banner. No-op unless the banner offers it.
    pub async fn retry(&self) -> Result<(), PlaybackError> {
        let retryable = self
            .shared
            .view
            .lock()
            .error
            .as_ref()
            .is_some_and(|banner| banner.retryable);
        if !retryable {
            debug!("retry ignored: no retryable error shown");
            return Ok(());
        }
        self.session.retry().await
    }

    /// Stop mirroring and timers. Also runs on drop.
    pub fn unmount(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return;
        }
        drop(tasks);
        self.shared.hide_timer.lock().take();
        self.fullscreen.set_change_listener(None);
        debug!("control surface unmounted");
    }
}

impl Drop for ControlSurface {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn mirror_session(
    shared: Weak<SurfaceShared>,
    session: PlaybackSession,
    mut events: broadcast::Receiver<PlaybackEvent>,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!("controls skipped {skipped} events, resyncing");
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                let snapshot = session.snapshot();
                let mut view = shared.view.lock();
                let visible = view.visible;
                *view = ControlsView::from_snapshot(&snapshot);
                view.visible = visible;
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.apply(&event);
    }
}

async fn mirror_fullscreen(
    session: PlaybackSession,
    mut changes: mpsc::UnboundedReceiver<bool>,
) {
    while let Some(fullscreen) = changes.recv().await {
        session.set_fullscreen(fullscreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_follows_session_events() {
        let mut view = ControlsView::default();
        view.apply(&PlaybackEvent::StateChanged {
            from: PlaybackState::Idle,
            to: PlaybackState::Loading,
        });
        assert!(view.buffering);

        view.apply(&PlaybackEvent::Progress {
            current_time: 90.0,
            duration: 360.0,
        });
        assert_eq!(view.played_fraction, 0.25);
        assert_eq!(view.time_label, "1:30");
        assert_eq!(view.duration_label, "6:00");

        view.apply(&PlaybackEvent::PlaybackRateChanged { rate: 1.5 });
        assert_eq!(view.speed_label, "1.5x");
    }

    #[test]
    fn errors_raise_a_banner_until_the_next_load() {
        let mut view = ControlsView::default();
        view.apply(&PlaybackEvent::Error {
            kind: PlaybackErrorKind::NetworkError,
            message: "offline".into(),
            retryable: true,
        });
        assert!(view.error.as_ref().is_some_and(|banner| banner.retryable));

        view.apply(&PlaybackEvent::StateChanged {
            from: PlaybackState::Failed,
            to: PlaybackState::Loading,
        });
        assert_eq!(view.error, None);
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, trace, warn};
use marquee_config::YouTubeConfig;
use marquee_contracts::youtube::{
    YouTubeEvent, YouTubePlayer, YouTubePlayerState, YouTubePlayerVars,
};
use marquee_model::{
    AdapterEvent, BackendKind, MediaReference, PlaybackError, PlaybackOptions,
};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior, interval_at};

use super::{AdapterEventSink, AdapterMode, PlaybackAdapter, TaskGuard, clamp_unit};
use crate::backends::PlaybackBackends;

/// Maps an `onError` code of the IFrame API
pub fn map_error_code(code: i32) -> PlaybackError {
    match code {
        2 => PlaybackError::invalid_reference(
            "youtube rejected the video id (error 2)",
        ),
        5 => PlaybackError::media_load(
            "youtube html5 player could not play the video (error 5)",
        ),
        100 => PlaybackError::media_load(
            "youtube video not found or private (error 100)",
        ),
        101 | 150 => PlaybackError::media_load(format!(
            "youtube video owner disallows embedding (error {code})"
        )),
        other => PlaybackError::media_load(format!("youtube error {other}")),
    }
}

#[derive(Default)]
struct YouTubeInner {
    player: Option<Arc<dyn YouTubePlayer>>,
    listener: Option<TaskGuard>,
    volume: Option<f64>,
    muted: bool,
    destroyed: bool,
}

/// Progress poll shared with the listener task. Once closed by `destroy`
/// it never runs again.
#[derive(Debug, Default)]
struct ProgressPoll {
    task: Option<TaskGuard>,
    closed: bool,
}

type PollSlot = Arc<Mutex<ProgressPoll>>;

fn arm_poll(
    slot: &PollSlot,
    player: &Arc<dyn YouTubePlayer>,
    sink: &AdapterEventSink,
    period: Duration,
) {
    let mut poll = slot.lock();
    if poll.closed {
        trace!("progress poll not armed: adapter destroyed");
        return;
    }
    poll.task = Some(spawn_poll(Arc::clone(player), sink.clone(), period));
}

fn stop_poll(slot: &PollSlot) {
    slot.lock().task.take();
}

/// Plays YouTube videos through the IFrame API.
///
/// The API has no timeupdate event, so while the player reports `Playing`
/// the adapter polls the position on a fixed interval.
pub struct YouTubeAdapter {
    backends: Arc<PlaybackBackends>,
    config: YouTubeConfig,
    mode: AdapterMode,
    sink: AdapterEventSink,
    inner: Mutex<YouTubeInner>,
    poll: PollSlot,
}

impl std::fmt::Debug for YouTubeAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("YouTubeAdapter")
            .field("mode", &self.mode)
            .field("epoch", &self.sink.epoch())
            .field("has_player", &inner.player.is_some())
            .field("destroyed", &inner.destroyed)
            .finish_non_exhaustive()
    }
}

impl YouTubeAdapter {
    pub fn new(
        backends: Arc<PlaybackBackends>,
        config: YouTubeConfig,
        mode: AdapterMode,
        sink: AdapterEventSink,
    ) -> Self {
        Self {
            backends,
            config,
            mode,
            sink,
            inner: Mutex::new(YouTubeInner {
                muted: mode == AdapterMode::Hover,
                ..YouTubeInner::default()
            }),
            poll: Arc::new(Mutex::new(ProgressPoll::default())),
        }
    }

    /// Whether the progress poll is currently running
    pub fn is_polling(&self) -> bool {
        self.poll.lock().task.is_some()
    }

    fn player_vars(
        &self,
        video_id: &str,
        options: &PlaybackOptions,
    ) -> YouTubePlayerVars {
        let hover = self.mode == AdapterMode::Hover;
        YouTubePlayerVars {
            autoplay: false,
            // The control surface replaces the embedded controls
            controls: false,
            mute: hover,
            loop_playback: hover,
            // Looping a single video requires it as its own playlist
            playlist: hover.then(|| video_id.to_string()),
            start_seconds: options.start_time_seconds.floor() as u64,
            ..YouTubePlayerVars::default()
        }
    }

    fn player(&self) -> Option<Arc<dyn YouTubePlayer>> {
        self.inner.lock().player.clone()
    }

    fn apply_audio(&self, player: &dyn YouTubePlayer) {
        let (volume, muted) = {
            let inner = self.inner.lock();
            (inner.volume, inner.muted)
        };
        if let Some(volume) = volume {
            player.set_volume(to_api_volume(volume));
        }
        if muted {
            player.mute();
        } else {
            player.unmute();
        }
    }
}

fn to_api_volume(volume: f64) -> u8 {
    (clamp_unit(volume) * 100.0).round() as u8
}

#[async_trait]
impl PlaybackAdapter for YouTubeAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::YouTube
    }

    async fn load(
        &self,
        reference: &MediaReference,
        options: &PlaybackOptions,
    ) -> Result<(), PlaybackError> {
        let video_id = reference
            .youtube_id()
            .ok_or_else(|| {
                PlaybackError::invalid_reference(format!(
                    "{reference} is not a youtube video"
                ))
            })?
            .to_string();

        self.backends
            .ensure_youtube_api(&self.config.script_url)
            .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return Err(PlaybackError::media_load("load cancelled"));
            }

            let vars = self.player_vars(&video_id, options);
            debug!("creating youtube player for {video_id} ({:?})", self.mode);
            let player = self
                .backends
                .youtube_api()
                .create_player(&video_id, &vars, tx)
                .map_err(|err| {
                    PlaybackError::media_load(format!(
                        "youtube player construction failed: {err}"
                    ))
                })?;

            inner.listener = Some(TaskGuard::spawn(listen(
                rx,
                Arc::clone(&player),
                self.sink.clone(),
                Arc::clone(&self.poll),
                self.config.progress_poll_interval(),
                options.start_time_seconds,
                ready_tx,
            )));
            inner.player = Some(player);
        }

        match ready_rx.await {
            Ok(Ok(())) => {
                if let Some(player) = self.player() {
                    self.apply_audio(player.as_ref());
                }
                Ok(())
            }
            Ok(Err(error)) => Err(error),
            Err(_) => Err(PlaybackError::media_load("load cancelled")),
        }
    }

    fn play(&self) {
        match self.player() {
            Some(player) => player.play_video(),
            None => debug!("youtube play ignored: no player yet"),
        }
    }

    fn pause(&self) {
        if let Some(player) = self.player() {
            player.pause_video();
        }
    }

    fn seek(&self, seconds: f64) {
        if let Some(player) = self.player() {
            player.seek_to(seconds.max(0.0), true);
        }
    }

    fn set_volume(&self, volume: f64) {
        let player = {
            let mut inner = self.inner.lock();
            inner.volume = Some(clamp_unit(volume));
            inner.player.clone()
        };
        if let Some(player) = player {
            player.set_volume(to_api_volume(volume));
        }
    }

    fn set_muted(&self, muted: bool) {
        let muted = muted || self.mode == AdapterMode::Hover;
        let player = {
            let mut inner = self.inner.lock();
            inner.muted = muted;
            inner.player.clone()
        };
        match (player, muted) {
            (Some(player), true) => player.mute(),
            (Some(player), false) => player.unmute(),
            (None, _) => {}
        }
    }

    fn set_playback_rate(&self, rate: f64) -> Result<(), PlaybackError> {
        Err(PlaybackError::unsupported(format!(
            "youtube backend cannot change playback rate to {rate}"
        )))
    }

    fn supports_playback_rate(&self) -> bool {
        false
    }

    fn destroy(&self) {
        let (player, listener) = {
            let mut inner = self.inner.lock();
            if inner.destroyed {
                return;
            }
            inner.destroyed = true;
            (inner.player.take(), inner.listener.take())
        };
        drop(listener);
        {
            let mut poll = self.poll.lock();
            poll.closed = true;
            poll.task.take();
        }
        if let Some(player) = player {
            player.destroy();
        }
        debug!("youtube adapter destroyed (epoch {})", self.sink.epoch());
    }
}

async fn listen(
    mut events: mpsc::UnboundedReceiver<YouTubeEvent>,
    player: Arc<dyn YouTubePlayer>,
    sink: AdapterEventSink,
    poll: PollSlot,
    poll_interval: Duration,
    start_time: f64,
    ready: oneshot::Sender<Result<(), PlaybackError>>,
) {
    let mut ready = Some(ready);

    while let Some(event) = events.recv().await {
        trace!("youtube event {event:?} (epoch {})", sink.epoch());
        match event {
            YouTubeEvent::Ready => {
                if start_time > 0.0 {
                    player.seek_to(start_time, true);
                }
                let duration = player.duration();
                if duration.is_finite() && duration > 0.0 {
                    sink.emit(AdapterEvent::DurationChanged(duration));
                }
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
            YouTubeEvent::StateChange(state) => match state {
                YouTubePlayerState::Playing => {
                    sink.emit(AdapterEvent::Playing);
                    arm_poll(&poll, &player, &sink, poll_interval);
                }
                YouTubePlayerState::Paused => {
                    stop_poll(&poll);
                    sink.emit(AdapterEvent::Paused);
                }
                YouTubePlayerState::Buffering => {
                    stop_poll(&poll);
                    sink.emit(AdapterEvent::Buffering);
                }
                YouTubePlayerState::Ended => {
                    stop_poll(&poll);
                    sink.emit(AdapterEvent::Ended);
                }
                YouTubePlayerState::Unstarted | YouTubePlayerState::Cued => {}
            },
            YouTubeEvent::Error { code } => {
                stop_poll(&poll);
                let error = map_error_code(code);
                warn!("youtube player error {code}: {error}");
                match ready.take() {
                    Some(ready) => {
                        let _ = ready.send(Err(error));
                    }
                    None => sink.emit(AdapterEvent::Failed(error)),
                }
            }
        }
    }
}

fn spawn_poll(
    player: Arc<dyn YouTubePlayer>,
    sink: AdapterEventSink,
    period: Duration,
) -> TaskGuard {
    TaskGuard::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            sink.emit(AdapterEvent::Progress {
                current_time: player.current_time(),
                duration: player.duration(),
            });
        }
    })
}

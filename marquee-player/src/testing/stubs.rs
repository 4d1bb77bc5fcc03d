//! In-process host implementations.
//!
//! Every stub records the calls it receives into a shared [`CallLog`], so a
//! test can assert on ordering across hosts (for example that a torrent was
//! destroyed before the next player was created).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use marquee_config::PlayerConfig;
use marquee_contracts::HostError;
use marquee_contracts::element::{
    ElementEvent, ElementListener, MediaElement, MediaHost,
};
use marquee_contracts::fullscreen::{FullscreenHost, FullscreenListener};
use marquee_contracts::peer::{PeerClient, PeerNetwork, SwarmEvent, Torrent};
use marquee_contracts::youtube::{
    YouTubeApi, YouTubeEvent, YouTubePlayer, YouTubePlayerState,
    YouTubePlayerVars,
};
use marquee_model::{PreloadHint, TorrentFile};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::backends::PlaybackBackends;
use crate::session::PlaybackSession;

pub const STUB_ORIGIN: &str = "https://app.marquee.test/";
pub const STUB_DURATION_SECONDS: f64 = 600.0;

/// Ordered record of host calls, shared by every stub of a test
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.entries.lock().push(call.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.entries.lock().iter().filter(|entry| *entry == call).count()
    }

    /// Index of the first occurrence of `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.entries.lock().iter().position(|entry| entry == call)
    }

    /// Index of the last occurrence of `call`
    pub fn last_position(&self, call: &str) -> Option<usize> {
        self.entries.lock().iter().rposition(|entry| entry == call)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

fn send<T>(listener: &Option<mpsc::UnboundedSender<T>>, event: T) {
    if let Some(listener) = listener {
        let _ = listener.send(event);
    }
}

// -- media elements -------------------------------------------------------

#[derive(Debug)]
struct HostSettings {
    fail_patterns: Mutex<Vec<String>>,
    stall_patterns: Mutex<Vec<String>>,
    duration: Mutex<f64>,
}

/// Page host whose elements "load" any source instantly
#[derive(Debug)]
pub struct StubMediaHost {
    log: CallLog,
    settings: Arc<HostSettings>,
    elements: Mutex<Vec<Arc<StubMediaElement>>>,
}

impl StubMediaHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            settings: Arc::new(HostSettings {
                fail_patterns: Mutex::new(Vec::new()),
                stall_patterns: Mutex::new(Vec::new()),
                duration: Mutex::new(STUB_DURATION_SECONDS),
            }),
            elements: Mutex::new(Vec::new()),
        }
    }

    /// Sources containing `pattern` fail with a media error
    pub fn fail_sources_containing(&self, pattern: &str) {
        self.settings.fail_patterns.lock().push(pattern.to_string());
    }

    /// Sources containing `pattern` never report metadata, like a stalled
    /// network fetch
    pub fn stall_sources_containing(&self, pattern: &str) {
        self.settings.stall_patterns.lock().push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.settings.fail_patterns.lock().clear();
        self.settings.stall_patterns.lock().clear();
    }

    /// Duration reported by elements for sources set from now on
    pub fn set_duration(&self, seconds: f64) {
        *self.settings.duration.lock() = seconds;
    }

    pub fn last_element(&self) -> Option<Arc<StubMediaElement>> {
        self.elements.lock().last().cloned()
    }

    pub fn elements_created(&self) -> usize {
        self.elements.lock().len()
    }
}

impl MediaHost for StubMediaHost {
    fn origin(&self) -> Url {
        Url::parse(STUB_ORIGIN).expect("stub origin is a valid url")
    }

    fn create_video_element(&self) -> Arc<dyn MediaElement> {
        self.log.record("host.create_video_element");
        let element = Arc::new(StubMediaElement::new(
            self.log.clone(),
            Arc::clone(&self.settings),
        ));
        self.elements.lock().push(Arc::clone(&element));
        element
    }
}

#[derive(Debug)]
struct ElementState {
    listener: Option<ElementListener>,
    source: Option<Url>,
    duration: Option<f64>,
    position: f64,
    volume: f64,
    muted: bool,
    rate: f64,
    looping: bool,
    native_controls: bool,
    preload: PreloadHint,
    paused: bool,
}

/// Video element that answers `set_source` with metadata and `canplay`
#[derive(Debug)]
pub struct StubMediaElement {
    log: CallLog,
    settings: Arc<HostSettings>,
    state: Mutex<ElementState>,
}

impl StubMediaElement {
    fn new(log: CallLog, settings: Arc<HostSettings>) -> Self {
        Self {
            log,
            settings,
            state: Mutex::new(ElementState {
                listener: None,
                source: None,
                duration: None,
                position: 0.0,
                volume: 1.0,
                muted: false,
                rate: 1.0,
                looping: false,
                native_controls: true,
                preload: PreloadHint::default(),
                paused: true,
            }),
        }
    }

    /// Fire a native event at the attached listener
    pub fn emit(&self, event: ElementEvent) {
        send(&self.state.lock().listener, event);
    }

    pub fn source(&self) -> Option<String> {
        self.state.lock().source.as_ref().map(Url::to_string)
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    pub fn volume_level(&self) -> f64 {
        self.state.lock().volume
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn is_looping(&self) -> bool {
        self.state.lock().looping
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    pub fn has_native_controls(&self) -> bool {
        self.state.lock().native_controls
    }

    pub fn preload(&self) -> PreloadHint {
        self.state.lock().preload
    }

    pub fn has_listener(&self) -> bool {
        self.state.lock().listener.is_some()
    }
}

impl MediaElement for StubMediaElement {
    fn set_listener(&self, listener: Option<ElementListener>) {
        self.state.lock().listener = listener;
    }

    fn set_source(&self, url: &Url) {
        self.log.record("element.set_source");
        let matches = |patterns: &Mutex<Vec<String>>| {
            patterns
                .lock()
                .iter()
                .any(|pattern| url.as_str().contains(pattern.as_str()))
        };
        let failing = matches(&self.settings.fail_patterns);
        let stalled = matches(&self.settings.stall_patterns);
        let duration = *self.settings.duration.lock();

        let mut state = self.state.lock();
        state.source = Some(url.clone());
        state.position = 0.0;
        state.paused = true;
        if stalled {
            state.duration = None;
        } else if failing {
            state.duration = None;
            send(
                &state.listener,
                ElementEvent::Error {
                    code: Some(4),
                    message: "MEDIA_ERR_SRC_NOT_SUPPORTED".into(),
                },
            );
        } else {
            state.duration = Some(duration);
            send(&state.listener, ElementEvent::LoadedMetadata { duration });
            send(&state.listener, ElementEvent::CanPlay);
        }
    }

    fn clear_source(&self) {
        self.log.record("element.clear_source");
        let mut state = self.state.lock();
        state.source = None;
        state.duration = None;
        state.position = 0.0;
    }

    fn set_preload(&self, preload: PreloadHint) {
        self.state.lock().preload = preload;
    }

    fn play(&self) -> Result<(), HostError> {
        self.log.record("element.play");
        let mut state = self.state.lock();
        if state.source.is_none() {
            return Err(HostError::Rejected("no source".into()));
        }
        state.paused = false;
        send(&state.listener, ElementEvent::Playing);
        Ok(())
    }

    fn pause(&self) {
        self.log.record("element.pause");
        let mut state = self.state.lock();
        if state.paused {
            return;
        }
        state.paused = true;
        send(&state.listener, ElementEvent::Pause);
    }

    fn current_time(&self) -> f64 {
        self.state.lock().position
    }

    fn set_current_time(&self, seconds: f64) {
        self.state.lock().position = seconds;
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn set_volume(&self, volume: f64) {
        self.state.lock().volume = volume;
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn set_playback_rate(&self, rate: f64) {
        self.state.lock().rate = rate;
    }

    fn set_looping(&self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn set_native_controls(&self, enabled: bool) {
        self.state.lock().native_controls = enabled;
    }
}

// -- youtube --------------------------------------------------------------

/// IFrame API whose players become ready as soon as they are built
#[derive(Debug)]
pub struct StubYouTubeApi {
    log: CallLog,
    failing_script_loads: AtomicUsize,
    player_error: Mutex<Option<i32>>,
    duration: Mutex<f64>,
    players: Mutex<Vec<Arc<StubYouTubePlayer>>>,
}

impl StubYouTubeApi {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failing_script_loads: AtomicUsize::new(0),
            player_error: Mutex::new(None),
            duration: Mutex::new(STUB_DURATION_SECONDS),
            players: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_next_script_loads(&self, count: usize) {
        self.failing_script_loads.store(count, Ordering::SeqCst);
    }

    /// New players report `onError(code)` instead of `onReady`
    pub fn fail_players_with(&self, code: Option<i32>) {
        *self.player_error.lock() = code;
    }

    pub fn set_duration(&self, seconds: f64) {
        *self.duration.lock() = seconds;
    }

    pub fn last_player(&self) -> Option<Arc<StubYouTubePlayer>> {
        self.players.lock().last().cloned()
    }

    pub fn players_created(&self) -> usize {
        self.players.lock().len()
    }
}

#[async_trait]
impl YouTubeApi for StubYouTubeApi {
    async fn load_script(&self, _script_url: &str) -> Result<(), HostError> {
        self.log.record("youtube.load_script");
        tokio::task::yield_now().await;
        let failed = self
            .failing_script_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                left.checked_sub(1)
            })
            .is_ok();
        if failed {
            return Err(HostError::Network("script blocked".into()));
        }
        Ok(())
    }

    fn create_player(
        &self,
        video_id: &str,
        vars: &YouTubePlayerVars,
        events: mpsc::UnboundedSender<YouTubeEvent>,
    ) -> Result<Arc<dyn YouTubePlayer>, HostError> {
        self.log.record("youtube.create_player");
        let player = Arc::new(StubYouTubePlayer {
            log: self.log.clone(),
            video_id: video_id.to_string(),
            vars: vars.clone(),
            duration: *self.duration.lock(),
            events: Mutex::new(Some(events)),
            state: Mutex::new(PlayerState::default()),
        });
        match *self.player_error.lock() {
            Some(code) => player.emit(YouTubeEvent::Error { code }),
            None => player.emit(YouTubeEvent::Ready),
        }
        self.players.lock().push(Arc::clone(&player));
        Ok(player)
    }
}

#[derive(Debug, Default)]
struct PlayerState {
    position: f64,
    playing_since: Option<Instant>,
    volume: Option<u8>,
    muted: bool,
    destroyed: bool,
}

impl PlayerState {
    fn position_now(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.position + since.elapsed().as_secs_f64(),
            None => self.position,
        }
    }
}

/// IFrame player whose position advances with the tokio clock while playing
#[derive(Debug)]
pub struct StubYouTubePlayer {
    log: CallLog,
    video_id: String,
    vars: YouTubePlayerVars,
    duration: f64,
    events: Mutex<Option<mpsc::UnboundedSender<YouTubeEvent>>>,
    state: Mutex<PlayerState>,
}

impl StubYouTubePlayer {
    /// Fire a player callback
    pub fn emit(&self, event: YouTubeEvent) {
        send(&self.events.lock(), event);
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn vars(&self) -> &YouTubePlayerVars {
        &self.vars
    }

    pub fn api_volume(&self) -> Option<u8> {
        self.state.lock().volume
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }
}

impl YouTubePlayer for StubYouTubePlayer {
    fn play_video(&self) {
        self.log.record("youtube.play_video");
        {
            let mut state = self.state.lock();
            if state.playing_since.is_none() {
                state.playing_since = Some(Instant::now());
            }
        }
        self.emit(YouTubeEvent::StateChange(YouTubePlayerState::Playing));
    }

    fn pause_video(&self) {
        self.log.record("youtube.pause_video");
        {
            let mut state = self.state.lock();
            state.position = state.position_now();
            state.playing_since = None;
        }
        self.emit(YouTubeEvent::StateChange(YouTubePlayerState::Paused));
    }

    fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) {
        let mut state = self.state.lock();
        state.position = seconds.min(self.duration);
        if state.playing_since.is_some() {
            state.playing_since = Some(Instant::now());
        }
    }

    fn set_volume(&self, volume: u8) {
        self.state.lock().volume = Some(volume);
    }

    fn mute(&self) {
        self.state.lock().muted = true;
    }

    fn unmute(&self) {
        self.state.lock().muted = false;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().position_now().min(self.duration)
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn destroy(&self) {
        self.log.record("youtube.destroy");
        let mut state = self.state.lock();
        state.destroyed = true;
        state.playing_since = None;
        self.events.lock().take();
    }
}

// -- peers ----------------------------------------------------------------

#[derive(Debug)]
struct SwarmSettings {
    files: Mutex<Vec<TorrentFile>>,
    join_error: Mutex<Option<String>>,
    torrents: Mutex<Vec<Arc<StubTorrent>>>,
}

/// Peer network whose swarms deliver metadata immediately
#[derive(Debug)]
pub struct StubPeerNetwork {
    log: CallLog,
    settings: Arc<SwarmSettings>,
}

impl StubPeerNetwork {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            settings: Arc::new(SwarmSettings {
                files: Mutex::new(vec![
                    TorrentFile {
                        index: 0,
                        name: "Sintel/poster.jpg".into(),
                        length: 48_000,
                    },
                    TorrentFile {
                        index: 1,
                        name: "Sintel/sintel.mp4".into(),
                        length: 129_241_752,
                    },
                ]),
                join_error: Mutex::new(None),
                torrents: Mutex::new(Vec::new()),
            }),
        }
    }

    /// File list of torrents joined from now on
    pub fn set_files(&self, names: &[&str]) {
        *self.settings.files.lock() = names
            .iter()
            .enumerate()
            .map(|(index, name)| TorrentFile {
                index,
                name: name.to_string(),
                length: 1_000_000,
            })
            .collect();
    }

    pub fn fail_joins_with(&self, message: Option<&str>) {
        *self.settings.join_error.lock() = message.map(str::to_string);
    }

    pub fn last_torrent(&self) -> Option<Arc<StubTorrent>> {
        self.settings.torrents.lock().last().cloned()
    }
}

#[async_trait]
impl PeerNetwork for StubPeerNetwork {
    async fn create_client(&self) -> Result<Arc<dyn PeerClient>, HostError> {
        self.log.record("peer.create_client");
        Ok(Arc::new(StubPeerClient {
            log: self.log.clone(),
            settings: Arc::clone(&self.settings),
        }))
    }
}

#[derive(Debug)]
pub struct StubPeerClient {
    log: CallLog,
    settings: Arc<SwarmSettings>,
}

#[async_trait]
impl PeerClient for StubPeerClient {
    async fn add(
        &self,
        uri: &str,
        events: mpsc::UnboundedSender<SwarmEvent>,
    ) -> Result<Arc<dyn Torrent>, HostError> {
        self.log.record("peer.add");
        tokio::task::yield_now().await;
        if let Some(message) = self.settings.join_error.lock().clone() {
            return Err(HostError::Network(message));
        }

        let info_hash = uri
            .split_once("btih:")
            .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
            .unwrap_or(uri)
            .to_string();
        let torrent = Arc::new(StubTorrent {
            log: self.log.clone(),
            info_hash,
            files: self.settings.files.lock().clone(),
            events: Mutex::new(Some(events)),
            destroyed: AtomicBool::new(false),
        });
        self.settings.torrents.lock().push(Arc::clone(&torrent));
        Ok(torrent)
    }
}

#[derive(Debug)]
pub struct StubTorrent {
    log: CallLog,
    info_hash: String,
    files: Vec<TorrentFile>,
    events: Mutex<Option<mpsc::UnboundedSender<SwarmEvent>>>,
    destroyed: AtomicBool,
}

impl StubTorrent {
    /// Report swarm activity to the adapter
    pub fn emit(&self, event: SwarmEvent) {
        send(&self.events.lock(), event);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl Torrent for StubTorrent {
    fn info_hash(&self) -> String {
        self.info_hash.clone()
    }

    fn files(&self) -> Vec<TorrentFile> {
        self.files.clone()
    }

    fn render_to(
        &self,
        file_index: usize,
        element: Arc<dyn MediaElement>,
    ) -> Result<(), HostError> {
        self.log.record("torrent.render_to");
        let url = Url::parse(&format!(
            "https://peers.marquee.test/{}/{file_index}",
            self.info_hash
        ))
        .map_err(|err| HostError::Media(err.to_string()))?;
        element.set_source(&url);
        Ok(())
    }

    fn destroy(&self) {
        self.log.record("torrent.destroy");
        self.destroyed.store(true, Ordering::SeqCst);
        self.events.lock().take();
    }
}

// -- fullscreen -----------------------------------------------------------

#[derive(Debug, Default)]
struct FullscreenState {
    fullscreen: bool,
    rejecting: bool,
    listener: Option<FullscreenListener>,
}

/// Player container honouring every fullscreen request unless told not to
#[derive(Debug)]
pub struct StubFullscreenHost {
    log: CallLog,
    state: Mutex<FullscreenState>,
}

impl StubFullscreenHost {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            state: Mutex::new(FullscreenState::default()),
        }
    }

    /// Reject requests as a browser does outside a user gesture
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().rejecting = rejecting;
    }

    /// The user left fullscreen through browser UI (Escape, F11, ...)
    pub fn simulate_browser_exit(&self) {
        let mut state = self.state.lock();
        state.fullscreen = false;
        send(&state.listener, false);
    }

    pub fn has_listener(&self) -> bool {
        self.state.lock().listener.is_some()
    }

    fn change(&self, call: &str, fullscreen: bool) -> Result<(), HostError> {
        self.log.record(call);
        let mut state = self.state.lock();
        if state.rejecting {
            return Err(HostError::Rejected("not triggered by user activation".into()));
        }
        if state.fullscreen != fullscreen {
            state.fullscreen = fullscreen;
            send(&state.listener, fullscreen);
        }
        Ok(())
    }
}

impl FullscreenHost for StubFullscreenHost {
    fn request_fullscreen(&self) -> Result<(), HostError> {
        self.change("fullscreen.request", true)
    }

    fn exit_fullscreen(&self) -> Result<(), HostError> {
        self.change("fullscreen.exit", false)
    }

    fn is_fullscreen(&self) -> bool {
        self.state.lock().fullscreen
    }

    fn set_change_listener(&self, listener: Option<FullscreenListener>) {
        self.state.lock().listener = listener;
    }
}

// -- bundle ---------------------------------------------------------------

/// Every stub host wired into one [`PlaybackBackends`]
#[derive(Debug)]
pub struct StubBackends {
    pub log: CallLog,
    pub media_host: Arc<StubMediaHost>,
    pub youtube: Arc<StubYouTubeApi>,
    pub peers: Arc<StubPeerNetwork>,
    pub fullscreen: Arc<StubFullscreenHost>,
    backends: Arc<PlaybackBackends>,
}

impl StubBackends {
    pub fn new(log: CallLog) -> Self {
        let media_host = Arc::new(StubMediaHost::new(log.clone()));
        let youtube = Arc::new(StubYouTubeApi::new(log.clone()));
        let peers = Arc::new(StubPeerNetwork::new(log.clone()));
        let fullscreen = Arc::new(StubFullscreenHost::new(log.clone()));
        let backends = Arc::new(PlaybackBackends::new(
            media_host.clone(),
            youtube.clone(),
            peers.clone(),
        ));
        Self {
            log,
            media_host,
            youtube,
            peers,
            fullscreen,
            backends,
        }
    }

    pub fn backends(&self) -> Arc<PlaybackBackends> {
        Arc::clone(&self.backends)
    }

    /// Session over these stubs with the given config
    pub fn session(&self, config: PlayerConfig) -> PlaybackSession {
        PlaybackSession::with_backends(self.backends(), Arc::new(config))
    }
}

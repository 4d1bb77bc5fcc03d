use std::time::Duration;

use futures::future::join_all;
use marquee_config::PlayerConfig;
use marquee_contracts::element::ElementEvent;
use marquee_contracts::peer::SwarmEvent;
use marquee_model::{
    BackendKind, ContentId, ContentItem, MediaKind, PlaybackErrorKind,
    PlaybackEvent, PlaybackOptions, PlaybackState, SwarmStatus,
};
use marquee_player::resolve;
use marquee_player::testing::{
    CallLog, Eventually, EventuallyExt, StubBackends, assert_event_sequence,
    drain_events,
};
use tokio::time::Instant;

const WAIT: Duration = Duration::from_secs(2);

fn transitions(events: &[PlaybackEvent]) -> Vec<(PlaybackState, PlaybackState)> {
    events
        .iter()
        .filter_map(|event| match event {
            PlaybackEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect()
}

#[test]
fn raw_strings_resolve_to_their_backend() {
    assert_eq!(
        resolve("magnet:?xt=urn:btih:c9e15763f722f23e98a29decdfae341b98d53056")
            .unwrap()
            .kind(),
        MediaKind::Torrent
    );
    let bare = resolve("dQw4w9WgXcQ").unwrap();
    assert_eq!(bare.kind(), MediaKind::YouTube);
    assert_eq!(bare.youtube_id(), Some("dQw4w9WgXcQ"));
    assert_eq!(resolve("/uploads/a.mp4").unwrap().kind(), MediaKind::Local);
    assert_eq!(
        resolve("https://cdn.example.com/a.webm").unwrap().kind(),
        MediaKind::RemoteUrl
    );
}

#[tokio::test(start_paused = true)]
async fn rapid_loads_leave_exactly_one_adapter() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());

    let (first, second) = tokio::join!(
        session.load_media("/media/first.mp4", PlaybackOptions::default()),
        session.load_media("/media/second.mp4", PlaybackOptions::default()),
    );
    first.unwrap();
    second.unwrap();

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Ready);
    assert_eq!(
        snapshot.reference.map(|reference| reference.raw_url().to_string()),
        Some("/media/second.mp4".to_string())
    );
    assert_eq!(stubs.media_host.elements_created(), 2);

    // The first element was torn down before the second was built
    let teardown = log.position("element.clear_source").unwrap();
    let second_element = log.last_position("host.create_video_element").unwrap();
    assert!(teardown < second_element, "{:?}", log.entries());
    assert_eq!(log.count("element.clear_source"), 1);

    let current = stubs.media_host.last_element().unwrap();
    assert!(current.has_listener());
    assert!(current.source().unwrap().ends_with("/media/second.mp4"));
}

#[tokio::test]
async fn only_the_newest_of_many_loads_settles() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    let sources = ["/media/1.mp4", "dQw4w9WgXcQ", "/media/3.mp4"];

    let results = join_all(
        sources
            .iter()
            .map(|raw| session.load_media(raw, PlaybackOptions::default())),
    )
    .await;

    assert!(results.iter().all(Result::is_ok));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, PlaybackState::Ready);
    assert_eq!(snapshot.backend, Some(BackendKind::Html5));
    assert_eq!(
        snapshot.reference.map(|reference| reference.raw_url().to_string()),
        Some("/media/3.mp4".to_string())
    );
    assert_eq!(log.count("youtube.destroy"), log.count("youtube.create_player"));
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    let mut events = session.subscribe();

    session.dispose();
    session.dispose();

    assert_eq!(session.state(), PlaybackState::Idle);
    assert_eq!(session.snapshot().backend, None);
    assert_eq!(log.count("element.clear_source"), 1);
    assert_eq!(
        transitions(&drain_events(&mut events)),
        vec![(PlaybackState::Ready, PlaybackState::Idle)]
    );
}

#[tokio::test]
async fn dispose_without_media_is_a_no_op() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    let mut events = session.subscribe();

    session.dispose();

    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(drain_events(&mut events).is_empty());
}

#[tokio::test]
async fn volume_is_clamped_into_unit_range() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    let element = stubs.media_host.last_element().unwrap();

    session.set_volume(-0.5);
    assert_eq!(session.snapshot().volume, 0.0);
    assert_eq!(element.volume_level(), 0.0);

    session.set_volume(1.5);
    assert_eq!(session.snapshot().volume, 1.0);
    assert_eq!(element.volume_level(), 1.0);

    session.set_volume(f64::NAN);
    assert_eq!(session.snapshot().volume, 1.0);
}

#[tokio::test]
async fn mute_remembers_and_restores_the_volume() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    let element = stubs.media_host.last_element().unwrap();

    session.set_volume(0.6);
    session.toggle_mute();
    assert!(session.snapshot().is_muted);
    assert!(element.is_muted());

    session.toggle_mute();
    let snapshot = session.snapshot();
    assert!(!snapshot.is_muted);
    assert_eq!(snapshot.volume, 0.6);

    // Unmuting from silence falls back to the default level
    session.set_volume(0.0);
    session.toggle_mute();
    session.toggle_mute();
    assert_eq!(session.snapshot().volume, 1.0);

    // Raising the volume while muted unmutes
    session.toggle_mute();
    session.set_volume(0.3);
    assert!(!session.snapshot().is_muted);
    assert!(!element.is_muted());
}

#[tokio::test(start_paused = true)]
async fn youtube_short_link_plays_with_polled_progress() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    let mut events = session.subscribe();

    session
        .load_media("https://youtu.be/dQw4w9WgXcQ", PlaybackOptions::default())
        .await
        .unwrap();
    assert_eq!(session.state(), PlaybackState::Ready);
    assert_eq!(session.snapshot().backend, Some(BackendKind::YouTube));

    let player = stubs.youtube.last_player().unwrap();
    assert_eq!(player.video_id(), "dQw4w9WgXcQ");
    assert!(!player.vars().controls);

    session.play();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();

    assert_event_sequence(
        &transitions(&drain_events(&mut events)),
        &[
            (PlaybackState::Idle, PlaybackState::Loading),
            (PlaybackState::Loading, PlaybackState::Ready),
            (PlaybackState::Ready, PlaybackState::Playing),
        ],
    )
    .unwrap();

    let mut ticks = Vec::new();
    while ticks.len() < 3 {
        if let Ok(PlaybackEvent::Progress { current_time, .. }) =
            events.recv().await
        {
            ticks.push((Instant::now(), current_time));
        }
    }
    for pair in ticks.windows(2) {
        assert_eq!(pair[1].0 - pair[0].0, Duration::from_millis(250));
        assert!((pair[1].1 - pair[0].1 - 0.25).abs() < 1e-3);
    }

    session.pause();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Paused, WAIT)
        .await
        .unwrap();
    drain_events(&mut events);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(
        drain_events(&mut events)
            .iter()
            .all(|event| !matches!(event, PlaybackEvent::Progress { .. })),
        "poll keeps running while paused"
    );
}

#[tokio::test]
async fn youtube_script_is_loaded_once_across_sessions() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let first = stubs.session(PlayerConfig::default());
    let second = stubs.session(PlayerConfig::default());

    first
        .load_media("dQw4w9WgXcQ", PlaybackOptions::default())
        .await
        .unwrap();
    second
        .load_media("https://www.youtube.com/watch?v=9bZkp7q19f0", PlaybackOptions::default())
        .await
        .unwrap();

    assert_eq!(log.count("youtube.load_script"), 1);
    assert_eq!(log.count("youtube.create_player"), 2);
}

#[tokio::test]
async fn youtube_embedding_errors_fail_the_load() {
    let stubs = StubBackends::new(CallLog::new());
    stubs.youtube.fail_players_with(Some(150));
    let session = stubs.session(PlayerConfig::default());

    let err = session
        .load_media("dQw4w9WgXcQ", PlaybackOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, PlaybackErrorKind::MediaLoadError);
    assert_eq!(session.state(), PlaybackState::Failed);
}

#[tokio::test]
async fn torrent_without_video_files_fails_and_leaves_the_swarm() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    stubs.peers.set_files(&["release/info.nfo", "release/readme.txt"]);
    let session = stubs.session(PlayerConfig::default());

    let err = session
        .load_media(
            "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10",
            PlaybackOptions::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, PlaybackErrorKind::NoPlayableFileFound);
    assert!(!err.is_retryable());
    assert_eq!(session.state(), PlaybackState::Failed);
    assert!(stubs.peers.last_torrent().unwrap().is_destroyed());
    assert_eq!(log.count("torrent.destroy"), 1);
    assert_eq!(log.count("torrent.render_to"), 0);

    session.dispose();
    assert_eq!(log.count("torrent.destroy"), 1);
}

#[tokio::test]
async fn torrent_streams_first_playable_file_and_reports_swarm() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    stubs
        .peers
        .set_files(&["Sample/info.txt", "Movie.2009.mkv", "Movie.2009.mp4"]);
    let session = stubs.session(PlayerConfig::default());

    session
        .load_media(
            "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10&dn=movie",
            PlaybackOptions::default(),
        )
        .await
        .unwrap();

    let element = stubs.media_host.last_element().unwrap();
    assert_eq!(
        element.source().as_deref(),
        Some("https://peers.marquee.test/08ada5a7a6183aae1e09d831df6748d566095a10/1")
    );

    let torrent = stubs.peers.last_torrent().unwrap();
    torrent.emit(SwarmEvent::Download {
        downloaded_bytes: 4_000_000,
        download_speed_bps: 1_000_000,
        peer_count: 12,
        progress: 0.25,
    });
    Eventually::eventually(
        || {
            session
                .snapshot()
                .swarm
                .is_some_and(|stats| stats.peer_count == 12)
        },
        WAIT,
    )
    .await
    .unwrap();
    assert_eq!(
        session.snapshot().swarm.map(|stats| stats.status),
        Some(SwarmStatus::Downloading)
    );

    // Torrents play at normal speed only
    assert!(!session.supports_playback_rate());
    session.set_playback_rate(2.0);
    assert_eq!(session.snapshot().playback_rate, 1.0);

    session.dispose();
    assert!(torrent.is_destroyed());
    assert_eq!(element.source(), None);
}

#[tokio::test]
async fn peer_client_is_shared_between_torrent_sessions() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());

    session
        .load_media("magnet:?xt=urn:btih:aaaa", PlaybackOptions::default())
        .await
        .unwrap();
    session
        .load_media("https://example.com/feeds/movie.torrent", PlaybackOptions::default())
        .await
        .unwrap();

    assert_eq!(log.count("peer.create_client"), 1);
    assert_eq!(log.count("peer.add"), 2);
    assert_eq!(log.count("torrent.destroy"), 1);
}

#[tokio::test(start_paused = true)]
async fn switching_from_html5_to_youtube_unloads_the_element_first() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());

    session
        .load_media("/media/intro.mp4", PlaybackOptions::autoplay())
        .await
        .unwrap();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();
    let element = stubs.media_host.last_element().unwrap();

    session
        .load_media(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            PlaybackOptions::default(),
        )
        .await
        .unwrap();

    let cleared = log.position("element.clear_source").unwrap();
    let created = log.position("youtube.create_player").unwrap();
    assert!(cleared < created, "{:?}", log.entries());
    assert_eq!(element.source(), None);
    assert!(element.is_paused());
    assert_eq!(session.snapshot().backend, Some(BackendKind::YouTube));
}

#[tokio::test]
async fn invalid_reference_fails_without_touching_hosts() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    let mut events = session.subscribe();

    let err = session
        .load_media("https://www.youtube.com/watch?v=short", PlaybackOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind, PlaybackErrorKind::InvalidMediaReference);
    assert_eq!(session.state(), PlaybackState::Failed);
    assert!(log.entries().is_empty());

    let events = drain_events(&mut events);
    assert_eq!(
        transitions(&events),
        vec![
            (PlaybackState::Idle, PlaybackState::Loading),
            (PlaybackState::Loading, PlaybackState::Failed),
        ]
    );
    assert!(events.iter().any(|event| matches!(
        event,
        PlaybackEvent::Error { retryable: false, .. }
    )));

    // Not retryable: the reference itself is broken
    assert!(session.retry().await.is_err());
}

#[tokio::test]
async fn retry_reloads_after_a_media_error() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    stubs.media_host.fail_sources_containing("flaky");
    let session = stubs.session(PlayerConfig::default());

    let err = session
        .load_media("/media/flaky.mp4", PlaybackOptions::default().with_start_time(12.0))
        .await
        .unwrap_err();
    assert_eq!(err.kind, PlaybackErrorKind::MediaLoadError);
    assert!(session.snapshot().last_error.unwrap().is_retryable());

    stubs.media_host.clear_failures();
    session.retry().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Ready);
    assert_eq!(session.snapshot().last_error, None);
    assert_eq!(stubs.media_host.last_element().unwrap().position(), 12.0);
    assert_eq!(log.count("element.clear_source"), 1);
}

#[tokio::test(start_paused = true)]
async fn seek_is_clamped_and_relative_to_the_position() {
    let stubs = StubBackends::new(CallLog::new());
    stubs.media_host.set_duration(100.0);
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    Eventually::eventually_equals(|| session.snapshot().duration_seconds, 100.0, WAIT)
        .await
        .unwrap();
    let element = stubs.media_host.last_element().unwrap();

    session.seek(30.0, false);
    session.seek(-10.0, true);
    assert_eq!(session.snapshot().current_time_seconds, 20.0);
    assert_eq!(element.position(), 20.0);

    session.seek(500.0, false);
    assert_eq!(session.snapshot().current_time_seconds, 100.0);

    session.seek(-500.0, true);
    assert_eq!(session.snapshot().current_time_seconds, 0.0);
}

#[tokio::test]
async fn playback_rate_is_clamped_for_capable_backends() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    let element = stubs.media_host.last_element().unwrap();

    assert!(session.supports_playback_rate());
    session.set_playback_rate(1.25);
    assert_eq!(element.rate(), 1.25);

    session.set_playback_rate(16.0);
    assert_eq!(session.snapshot().playback_rate, 4.0);
    session.set_playback_rate(0.01);
    assert_eq!(session.snapshot().playback_rate, 0.25);
}

#[tokio::test(start_paused = true)]
async fn rate_resets_when_the_next_backend_cannot_change_it() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::default())
        .await
        .unwrap();
    session.set_playback_rate(1.5);
    let mut events = session.subscribe();

    session
        .load_media("dQw4w9WgXcQ", PlaybackOptions::default())
        .await
        .unwrap();

    assert_eq!(session.snapshot().playback_rate, 1.0);
    assert!(
        drain_events(&mut events)
            .contains(&PlaybackEvent::PlaybackRateChanged { rate: 1.0 })
    );
}

#[tokio::test]
async fn commands_without_media_are_ignored() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    let mut events = session.subscribe();

    session.play();
    session.pause();
    session.toggle_play_pause();
    session.seek(10.0, false);

    assert_eq!(session.state(), PlaybackState::Idle);
    assert!(drain_events(&mut events).is_empty());
    assert!(log.entries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn element_errors_after_load_fail_the_session() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::autoplay())
        .await
        .unwrap();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();

    stubs
        .media_host
        .last_element()
        .unwrap()
        .emit(ElementEvent::Error {
            code: Some(2),
            message: "MEDIA_ERR_NETWORK".into(),
        });

    Eventually::eventually_equals(|| session.state(), PlaybackState::Failed, WAIT)
        .await
        .unwrap();
    let error = session.snapshot().last_error.unwrap();
    assert_eq!(error.kind, PlaybackErrorKind::MediaLoadError);
}

fn download(peer_count: u32) -> SwarmEvent {
    SwarmEvent::Download {
        downloaded_bytes: 2_000_000,
        download_speed_bps: 500_000,
        peer_count,
        progress: 0.1,
    }
}

#[tokio::test(start_paused = true)]
async fn torrent_buffers_on_swarm_downloads_until_frames_flow() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media(
            "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10",
            PlaybackOptions::default(),
        )
        .await
        .unwrap();
    let mut events = session.subscribe();
    let torrent = stubs.peers.last_torrent().unwrap();
    let element = stubs.media_host.last_element().unwrap();

    // Playable but nothing rendered yet: the swarm is still filling the buffer
    torrent.emit(download(3));
    Eventually::eventually_equals(|| session.state(), PlaybackState::Buffering, WAIT)
        .await
        .unwrap();

    session.play();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();

    // Downloads while frames flow are just stats
    torrent.emit(download(4));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), PlaybackState::Playing);
    assert_eq!(session.snapshot().swarm.map(|stats| stats.peer_count), Some(4));

    // A stall while the swarm keeps downloading buffers again
    element.emit(ElementEvent::Waiting);
    torrent.emit(download(5));
    Eventually::eventually_equals(|| session.state(), PlaybackState::Buffering, WAIT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    element.emit(ElementEvent::Playing);
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();

    assert_eq!(
        transitions(&drain_events(&mut events)),
        vec![
            (PlaybackState::Ready, PlaybackState::Buffering),
            (PlaybackState::Buffering, PlaybackState::Playing),
            (PlaybackState::Playing, PlaybackState::Buffering),
            (PlaybackState::Buffering, PlaybackState::Playing),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn repeated_stalls_publish_a_single_buffering_transition() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    session
        .load_media("/media/a.mp4", PlaybackOptions::autoplay())
        .await
        .unwrap();
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();
    let mut events = session.subscribe();
    let element = stubs.media_host.last_element().unwrap();

    element.emit(ElementEvent::Waiting);
    element.emit(ElementEvent::Waiting);
    Eventually::eventually_equals(|| session.state(), PlaybackState::Buffering, WAIT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    element.emit(ElementEvent::Playing);
    Eventually::eventually_equals(|| session.state(), PlaybackState::Playing, WAIT)
        .await
        .unwrap();

    assert_eq!(
        transitions(&drain_events(&mut events)),
        vec![
            (PlaybackState::Playing, PlaybackState::Buffering),
            (PlaybackState::Buffering, PlaybackState::Playing),
        ]
    );
}

#[tokio::test]
async fn load_item_prefers_the_magnet_over_the_media_url() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let session = stubs.session(PlayerConfig::default());
    let mut item = ContentItem {
        id: ContentId::new(),
        title: "Sintel".into(),
        media_url: "/uploads/videos/sintel.mp4".into(),
        trailer_url: None,
        magnet_uri: Some(
            "magnet:?xt=urn:btih:08ada5a7a6183aae1e09d831df6748d566095a10".into(),
        ),
        poster_url: "/uploads/posters/sintel.jpg".into(),
    };

    session
        .load_item(&item, PlaybackOptions::default())
        .await
        .unwrap();
    assert_eq!(session.snapshot().backend, Some(BackendKind::Torrent));
    assert_eq!(log.count("peer.add"), 1);

    item.magnet_uri = None;
    session
        .load_item(&item, PlaybackOptions::default())
        .await
        .unwrap();
    assert_eq!(session.snapshot().backend, Some(BackendKind::Html5));
    assert!(
        stubs
            .media_host
            .last_element()
            .unwrap()
            .source()
            .unwrap()
            .ends_with("/uploads/videos/sintel.mp4")
    );
}

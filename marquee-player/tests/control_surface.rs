use std::sync::Arc;
use std::time::Duration;

use marquee_config::PlayerConfig;
use marquee_contracts::element::ElementEvent;
use marquee_contracts::fullscreen::FullscreenHost;
use marquee_model::{PlaybackErrorKind, PlaybackOptions, PlaybackState};
use marquee_player::controls::{ControlSurface, FocusTarget, Key};
use marquee_player::testing::{CallLog, Eventually, EventuallyExt, StubBackends};
use marquee_player::PlaybackSession;

const WAIT: Duration = Duration::from_secs(2);

fn mount(stubs: &StubBackends, session: &PlaybackSession) -> ControlSurface {
    let fullscreen: Arc<dyn FullscreenHost> = stubs.fullscreen.clone();
    ControlSurface::mount(
        session.clone(),
        fullscreen,
        PlayerConfig::default().controls,
    )
}

async fn playing(stubs: &StubBackends, raw_url: &str) -> (PlaybackSession, ControlSurface) {
    let session = stubs.session(PlayerConfig::default());
    let surface = mount(stubs, &session);
    session
        .load_media(raw_url, PlaybackOptions::autoplay())
        .await
        .unwrap();
    Eventually::eventually(|| surface.view().is_playing, WAIT)
        .await
        .unwrap();
    (session, surface)
}

fn press(surface: &ControlSurface, key: &str) -> bool {
    surface.handle_key(&Key::from_dom(key), FocusTarget::Player)
}

#[tokio::test(start_paused = true)]
async fn keyboard_shortcuts_drive_the_session() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    surface.set_focused(true);

    assert!(press(&surface, " "));
    Eventually::eventually_equals(|| session.state(), PlaybackState::Paused, WAIT)
        .await
        .unwrap();

    assert!(press(&surface, "ArrowRight"));
    assert!(press(&surface, "ArrowRight"));
    assert!(press(&surface, "ArrowLeft"));
    assert_eq!(session.snapshot().current_time_seconds, 10.0);

    assert!(press(&surface, "ArrowDown"));
    assert!((session.snapshot().volume - 0.9).abs() < 1e-9);

    assert!(press(&surface, "m"));
    assert!(session.snapshot().is_muted);

    assert!(!press(&surface, "q"));
}

#[tokio::test(start_paused = true)]
async fn shortcuts_are_ignored_in_text_fields_and_without_focus() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;

    assert!(!press(&surface, " "), "player is not focused yet");

    surface.set_focused(true);
    for focus in [FocusTarget::TextInput, FocusTarget::TextArea] {
        assert!(!surface.handle_key(&Key::from_dom(" "), focus));
        assert!(!surface.handle_key(&Key::from_dom("m"), focus));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.state(), PlaybackState::Playing);
    assert!(!session.snapshot().is_muted);
}

#[tokio::test(start_paused = true)]
async fn controls_hide_after_three_idle_seconds_while_playing() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    assert!(surface.view().visible);

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert!(surface.view().visible);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!surface.view().visible);

    // Pointer movement shows them and restarts the countdown
    surface.pointer_moved();
    assert!(surface.view().visible);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    surface.pointer_moved();
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert!(surface.view().visible);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(!surface.view().visible);

    // Leaving Playing keeps them on screen
    session.pause();
    Eventually::eventually(|| surface.view().visible, WAIT)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(surface.view().visible);
    assert!(!surface.view().is_playing);
}

#[tokio::test(start_paused = true)]
async fn buffering_brings_the_controls_back_until_playback_resumes() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    let element = stubs.media_host.last_element().unwrap();
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert!(!surface.view().visible);

    element.emit(ElementEvent::Waiting);
    Eventually::eventually(|| surface.view().visible, WAIT)
        .await
        .unwrap();
    assert!(surface.view().buffering);
    assert_eq!(session.state(), PlaybackState::Buffering);

    // No countdown runs while buffering
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(surface.view().visible);

    element.emit(ElementEvent::Playing);
    Eventually::eventually(|| surface.view().is_playing, WAIT)
        .await
        .unwrap();
    assert!(!surface.view().buffering);
    tokio::time::sleep(Duration::from_millis(3100)).await;
    assert!(!surface.view().visible);
}

#[tokio::test(start_paused = true)]
async fn progress_click_seeks_to_the_clicked_fraction() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    Eventually::eventually_equals(|| surface.view().duration, 600.0, WAIT)
        .await
        .unwrap();

    surface.progress_clicked(25.0, 100.0);
    assert_eq!(session.snapshot().current_time_seconds, 150.0);
    assert_eq!(stubs.media_host.last_element().unwrap().position(), 150.0);

    Eventually::eventually(|| surface.view().time_label == "2:30", WAIT)
        .await
        .unwrap();
    let view = surface.view();
    assert_eq!(view.duration_label, "10:00");
    assert_eq!(view.played_fraction, 0.25);

    // A collapsed bar cannot be clicked
    surface.progress_clicked(10.0, 0.0);
    assert_eq!(session.snapshot().current_time_seconds, 150.0);
}

#[tokio::test(start_paused = true)]
async fn fullscreen_follows_the_container() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    surface.set_focused(true);

    surface.toggle_fullscreen();
    Eventually::eventually(|| surface.view().fullscreen, WAIT)
        .await
        .unwrap();
    assert!(session.snapshot().is_fullscreen);

    // Exits through browser UI are mirrored too
    stubs.fullscreen.simulate_browser_exit();
    Eventually::eventually(|| !surface.view().fullscreen, WAIT)
        .await
        .unwrap();

    assert!(press(&surface, "f"));
    Eventually::eventually(|| surface.view().fullscreen, WAIT)
        .await
        .unwrap();
    assert!(press(&surface, "Escape"));
    Eventually::eventually(|| !session.snapshot().is_fullscreen, WAIT)
        .await
        .unwrap();
    assert_eq!(log.count("fullscreen.request"), 2);
    assert_eq!(log.count("fullscreen.exit"), 1);
}

#[tokio::test(start_paused = true)]
async fn rejected_fullscreen_requests_leave_the_view_unchanged() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    stubs.fullscreen.set_rejecting(true);

    surface.toggle_fullscreen();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!surface.view().fullscreen);
    assert!(!session.snapshot().is_fullscreen);
    assert_eq!(session.state(), PlaybackState::Playing);
}

#[tokio::test(start_paused = true)]
async fn speed_presets_step_and_cycle() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "/media/a.mp4").await;
    surface.set_focused(true);
    assert!(surface.speed_enabled());

    assert!(press(&surface, ">"));
    assert_eq!(session.snapshot().playback_rate, 1.25);
    assert!(press(&surface, "<"));
    assert!(press(&surface, "<"));
    assert_eq!(session.snapshot().playback_rate, 0.75);

    session.set_playback_rate(2.0);
    // Keys stop at the fastest preset, the button wraps around
    assert!(press(&surface, ">"));
    assert_eq!(session.snapshot().playback_rate, 2.0);
    surface.cycle_speed();
    assert_eq!(session.snapshot().playback_rate, 0.5);

    Eventually::eventually(|| surface.view().speed_label == "0.5x", WAIT)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn speed_control_is_disabled_for_youtube() {
    let stubs = StubBackends::new(CallLog::new());
    let (session, surface) = playing(&stubs, "dQw4w9WgXcQ").await;

    assert!(!surface.speed_enabled());
    surface.cycle_speed();
    assert_eq!(session.snapshot().playback_rate, 1.0);
    assert_eq!(surface.view().speed_label, "1x");
}

#[tokio::test(start_paused = true)]
async fn error_banner_offers_retry_for_retryable_failures() {
    let stubs = StubBackends::new(CallLog::new());
    stubs.media_host.fail_sources_containing("flaky");
    let session = stubs.session(PlayerConfig::default());
    let surface = mount(&stubs, &session);

    session
        .load_media("/media/flaky.mp4", PlaybackOptions::default())
        .await
        .unwrap_err();
    Eventually::eventually(|| surface.view().error.is_some(), WAIT)
        .await
        .unwrap();
    let banner = surface.view().error.unwrap();
    assert_eq!(banner.kind, PlaybackErrorKind::MediaLoadError);
    assert!(banner.retryable);
    assert!(!surface.view().buffering);

    stubs.media_host.clear_failures();
    surface.retry().await.unwrap();

    assert_eq!(session.state(), PlaybackState::Ready);
    Eventually::eventually(|| surface.view().error.is_none(), WAIT)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn retry_is_a_no_op_for_fatal_errors() {
    let log = CallLog::new();
    let stubs = StubBackends::new(log.clone());
    stubs.peers.set_files(&["notes.txt"]);
    let session = stubs.session(PlayerConfig::default());
    let surface = mount(&stubs, &session);

    session
        .load_media("magnet:?xt=urn:btih:beef", PlaybackOptions::default())
        .await
        .unwrap_err();
    Eventually::eventually(|| surface.view().error.is_some(), WAIT)
        .await
        .unwrap();
    assert!(!surface.view().error.unwrap().retryable);

    surface.retry().await.unwrap();
    assert_eq!(log.count("peer.add"), 1);
    assert_eq!(session.state(), PlaybackState::Failed);
}

#[tokio::test]
async fn unmount_detaches_from_the_container() {
    let stubs = StubBackends::new(CallLog::new());
    let session = stubs.session(PlayerConfig::default());
    let surface = mount(&stubs, &session);
    assert!(stubs.fullscreen.has_listener());

    surface.unmount();
    surface.unmount();
    assert!(!stubs.fullscreen.has_listener());

    drop(surface);
    assert!(!stubs.fullscreen.has_listener());
}

//! Built-in defaults. Hover delay and auto-hide have a single canonical value
//! each; every consumer reads them from `PlayerConfig`.

pub const DEFAULT_SEEK_STEP_SECONDS: f64 = 10.0;
pub const DEFAULT_VOLUME_STEP: f64 = 0.1;
pub const DEFAULT_AUTO_HIDE_MS: u64 = 3_000;
pub const DEFAULT_SPEED_PRESETS: [f64; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

pub const DEFAULT_HOVER_ACTIVATION_DELAY_MS: u64 = 500;

pub const DEFAULT_YOUTUBE_POLL_MS: u64 = 250;
pub const DEFAULT_YOUTUBE_SCRIPT_URL: &str =
    "https://www.youtube.com/iframe_api";

pub const DEFAULT_PLAYABLE_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mkv"];

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_VOLUME: f64 = 1.0;
pub const DEFAULT_MIN_PLAYBACK_RATE: f64 = 0.25;
pub const DEFAULT_MAX_PLAYBACK_RATE: f64 = 4.0;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable naming a TOML or JSON config file.
pub const CONFIG_PATH_ENV: &str = "MARQUEE_CONFIG_PATH";
/// Environment variable carrying inline JSON config.
pub const CONFIG_JSON_ENV: &str = "MARQUEE_CONFIG_JSON";

/// Files tried, in order, when no environment override is set.
pub const DEFAULT_CONFIG_CANDIDATES: &[&str] = &[
    "marquee.toml",
    "marquee.json",
    "config/marquee.toml",
    "config/marquee.json",
];

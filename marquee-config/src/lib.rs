//! Configuration for the marquee playback stack.
//!
//! `ConfigLoader` resolves a `PlayerConfig` from an env-named file, inline
//! JSON, a candidate file next to the binary, or built-in defaults, then
//! validates it. Every tunable timing (hover delay, auto-hide, poll interval)
//! has exactly one home here.

pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigSource};
pub use models::{
    ControlsConfig, HoverConfig, LoggingConfig, PlayerConfig, SessionConfig,
    TorrentConfig, YouTubeConfig,
};
pub use validation::{ConfigValidationError, validate};

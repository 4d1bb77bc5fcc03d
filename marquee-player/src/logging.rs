use std::str::FromStr;

use env_logger::{Builder, Env, Target};
use log::{LevelFilter, SetLoggerError};
use marquee_config::LoggingConfig;

/// Install the process logger.
///
/// `RUST_LOG` wins when set. Otherwise everything logs at `warn` except this
/// crate, which logs at the configured level.
pub fn init_logger(config: &LoggingConfig) -> Result<(), SetLoggerError> {
    if std::env::var("RUST_LOG").is_ok() {
        return Builder::from_env(Env::default()).try_init();
    }
    default_builder(config).try_init()
}

fn default_builder(config: &LoggingConfig) -> Builder {
    let mut builder = Builder::new();
    builder
        .target(Target::Stdout)
        .filter_level(LevelFilter::Warn)
        .filter_module("marquee_player", player_level(&config.level));
    builder
}

fn player_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}

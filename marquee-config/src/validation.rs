use thiserror::Error;

use crate::models::PlayerConfig;

/// A config value outside the range the player can work with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error(
        "session.min_playback_rate ({min}) exceeds session.max_playback_rate ({max})"
    )]
    InvertedRateBounds { min: f64, max: f64 },
    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),
}

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Reject values that would break playback invariants
pub fn validate(config: &PlayerConfig) -> Result<(), ConfigValidationError> {
    let controls = &config.controls;
    positive("controls.seek_step_seconds", controls.seek_step_seconds)?;
    in_range("controls.volume_step", controls.volume_step, f64::EPSILON, 1.0)?;
    positive("controls.auto_hide_ms", controls.auto_hide_ms as f64)?;
    if controls.speed_presets.is_empty() {
        return Err(ConfigValidationError::Empty {
            field: "controls.speed_presets",
        });
    }
    for preset in &controls.speed_presets {
        positive("controls.speed_presets", *preset)?;
    }

    positive("youtube.progress_poll_ms", config.youtube.progress_poll_ms as f64)?;
    if config.youtube.script_url.trim().is_empty() {
        return Err(ConfigValidationError::Empty {
            field: "youtube.script_url",
        });
    }

    if config.torrent.playable_extensions.is_empty() {
        return Err(ConfigValidationError::Empty {
            field: "torrent.playable_extensions",
        });
    }

    let session = &config.session;
    positive(
        "session.event_channel_capacity",
        session.event_channel_capacity as f64,
    )?;
    in_range("session.default_volume", session.default_volume, 0.0, 1.0)?;
    positive("session.min_playback_rate", session.min_playback_rate)?;
    positive("session.max_playback_rate", session.max_playback_rate)?;
    if session.min_playback_rate > session.max_playback_rate {
        return Err(ConfigValidationError::InvertedRateBounds {
            min: session.min_playback_rate,
            max: session.max_playback_rate,
        });
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigValidationError::UnknownLogLevel(
            config.logging.level.clone(),
        ));
    }

    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigValidationError::NotPositive { field, value })
    }
}

fn in_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ConfigValidationError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

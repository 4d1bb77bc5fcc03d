/// Native preload hint forwarded to media elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PreloadHint {
    None,
    #[default]
    Metadata,
    Auto,
}

impl PreloadHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreloadHint::None => "none",
            PreloadHint::Metadata => "metadata",
            PreloadHint::Auto => "auto",
        }
    }
}

/// Configuration captured once per `load_media` call
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlaybackOptions {
    pub autoplay: bool,
    /// Seconds from the start of the media; never negative
    pub start_time_seconds: f64,
    /// Volume in `[0, 1]`
    pub initial_volume: f64,
    pub preload: PreloadHint,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            autoplay: false,
            start_time_seconds: 0.0,
            initial_volume: 1.0,
            preload: PreloadHint::Metadata,
        }
    }
}

impl PlaybackOptions {
    pub fn autoplay() -> Self {
        Self {
            autoplay: true,
            ..Self::default()
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_start_time(mut self, seconds: f64) -> Self {
        self.start_time_seconds = seconds;
        self.normalized()
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.initial_volume = volume;
        self.normalized()
    }

    pub fn with_preload(mut self, preload: PreloadHint) -> Self {
        self.preload = preload;
        self
    }

    /// Clamps values that arrived from untrusted input (query strings,
    /// deserialized settings) into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.start_time_seconds = if self.start_time_seconds.is_finite() {
            self.start_time_seconds.max(0.0)
        } else {
            0.0
        };
        self.initial_volume = if self.initial_volume.is_finite() {
            self.initial_volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_clamp_out_of_range_values() {
        let options = PlaybackOptions::default()
            .with_start_time(-12.0)
            .with_volume(3.0);
        assert_eq!(options.start_time_seconds, 0.0);
        assert_eq!(options.initial_volume, 1.0);

        let options = PlaybackOptions::default().with_volume(f64::NAN);
        assert_eq!(options.initial_volume, 1.0);
    }

    #[test]
    fn default_preload_is_metadata() {
        assert_eq!(PlaybackOptions::default().preload, PreloadHint::Metadata);
        assert_eq!(PreloadHint::Auto.as_str(), "auto");
    }
}

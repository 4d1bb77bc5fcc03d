use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// `YT.PlayerState` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YouTubePlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl YouTubePlayerState {
    /// Maps the numeric state reported by `onStateChange`
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(YouTubePlayerState::Unstarted),
            0 => Some(YouTubePlayerState::Ended),
            1 => Some(YouTubePlayerState::Playing),
            2 => Some(YouTubePlayerState::Paused),
            3 => Some(YouTubePlayerState::Buffering),
            5 => Some(YouTubePlayerState::Cued),
            _ => None,
        }
    }
}

/// Player callbacks (`onReady`, `onStateChange`, `onError`)
#[derive(Debug, Clone, PartialEq)]
pub enum YouTubeEvent {
    Ready,
    StateChange(YouTubePlayerState),
    Error { code: i32 },
}

/// `playerVars` passed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubePlayerVars {
    pub autoplay: bool,
    pub controls: bool,
    pub mute: bool,
    /// Looping requires `playlist` to name the same video
    pub loop_playback: bool,
    pub playlist: Option<String>,
    pub start_seconds: u64,
    pub modest_branding: bool,
    pub related_videos: bool,
    pub plays_inline: bool,
}

impl Default for YouTubePlayerVars {
    fn default() -> Self {
        Self {
            autoplay: false,
            controls: true,
            mute: false,
            loop_playback: false,
            playlist: None,
            start_seconds: 0,
            modest_branding: true,
            related_videos: false,
            plays_inline: true,
        }
    }
}

/// Host side of the IFrame API: script injection and player construction
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait YouTubeApi: Send + Sync {
    /// Inject the API script and resolve once `onYouTubeIframeAPIReady` fired
    async fn load_script(&self, script_url: &str) -> Result<()>;

    /// Construct a player bound to `video_id`; callbacks flow into `events`
    fn create_player(
        &self,
        video_id: &str,
        vars: &YouTubePlayerVars,
        events: mpsc::UnboundedSender<YouTubeEvent>,
    ) -> Result<Arc<dyn YouTubePlayer>>;
}

/// A constructed IFrame player
#[cfg_attr(feature = "mock", mockall::automock)]
pub trait YouTubePlayer: Send + Sync {
    fn play_video(&self);

    fn pause_video(&self);

    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool);

    /// Volume on the API's 0-100 scale
    fn set_volume(&self, volume: u8);

    fn mute(&self);

    fn unmute(&self);

    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    /// Remove the iframe and stop all playback
    fn destroy(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_follow_iframe_api() {
        assert_eq!(
            YouTubePlayerState::from_code(1),
            Some(YouTubePlayerState::Playing)
        );
        assert_eq!(
            YouTubePlayerState::from_code(-1),
            Some(YouTubePlayerState::Unstarted)
        );
        assert_eq!(YouTubePlayerState::from_code(4), None);
    }
}

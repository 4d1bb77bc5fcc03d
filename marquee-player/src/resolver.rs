//! Classification of raw media references into playback backends.
//!
//! Everything here is pure: no host access, no logging side effects beyond
//! the caller's own.

use marquee_model::{MediaKind, MediaLocator, MediaReference, PlaybackError};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static YOUTUBE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("youtube id pattern is valid")
});

const YOUTUBE_HOSTS: &[&str] =
    &["youtube.com", "youtu.be", "youtube-nocookie.com"];

/// Path segments that carry the video id on youtube.com hosts
const YOUTUBE_ID_SEGMENTS: &[&str] = &["embed", "shorts", "v"];

/// Resolve `raw_url` into a typed reference.
///
/// First match wins: torrent, YouTube, local path, http(s) url, and local as
/// the fallback.
pub fn resolve(raw_url: &str) -> Result<MediaReference, PlaybackError> {
    let raw = raw_url.trim();
    if raw.is_empty() {
        return Err(PlaybackError::invalid_reference("empty media reference"));
    }

    if is_magnet(raw) {
        return Ok(MediaReference::new_unchecked(
            raw,
            MediaKind::Torrent,
            MediaLocator::Magnet {
                uri: raw.to_string(),
            },
        ));
    }

    if has_torrent_suffix(raw) {
        return Ok(MediaReference::new_unchecked(
            raw,
            MediaKind::Torrent,
            MediaLocator::TorrentFile {
                url: raw.to_string(),
            },
        ));
    }

    if is_youtube(raw) {
        let video_id = extract_youtube_id(raw).ok_or_else(|| {
            PlaybackError::invalid_reference(format!(
                "no valid youtube video id in {raw}"
            ))
        })?;
        return Ok(MediaReference::new_unchecked(
            raw,
            MediaKind::YouTube,
            MediaLocator::YouTube { video_id },
        ));
    }

    let kind = if is_local_path(raw) {
        MediaKind::Local
    } else if is_http(raw) {
        MediaKind::RemoteUrl
    } else {
        MediaKind::Local
    };

    Ok(MediaReference::new_unchecked(
        raw,
        kind,
        MediaLocator::Url {
            url: raw.to_string(),
        },
    ))
}

/// Extract the 11-character video id from any supported YouTube shape:
/// `watch?v=`, `youtu.be/`, `embed/`, `shorts/`, `v/`, or a bare id.
pub fn extract_youtube_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if YOUTUBE_ID.is_match(raw) {
        return Some(raw.to_string());
    }

    let url = parse_lenient(raw)?;
    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate: Option<String> = if host_matches(&host, "youtu.be") {
        segments.next().map(str::to_string)
    } else if host_matches(&host, "youtube.com")
        || host_matches(&host, "youtube-nocookie.com")
    {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if YOUTUBE_ID_SEGMENTS.contains(&prefix) => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| YOUTUBE_ID.is_match(id))
}

/// Absolute url for an element source. Relative paths resolve against the
/// page origin; absolute urls pass through unchanged.
pub fn normalize_local_url(
    path: &str,
    origin: &Url,
) -> Result<Url, PlaybackError> {
    let path = path.trim();
    if let Ok(url) = Url::parse(path)
        && url.has_host()
    {
        return Ok(url);
    }

    origin.join(path).map_err(|err| {
        PlaybackError::invalid_reference(format!(
            "cannot resolve {path} against {origin}: {err}"
        ))
    })
}

fn is_magnet(raw: &str) -> bool {
    raw.get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("magnet:"))
}

fn has_torrent_suffix(raw: &str) -> bool {
    let path = raw.split(['?', '#']).next().unwrap_or(raw);
    path.len() >= 8
        && path
            .get(path.len() - 8..)
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".torrent"))
}

fn is_youtube(raw: &str) -> bool {
    if YOUTUBE_ID.is_match(raw) {
        return true;
    }
    parse_lenient(raw)
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            YOUTUBE_HOSTS.iter().any(|known| host_matches(&host, known))
        })
}

fn is_local_path(raw: &str) -> bool {
    raw.starts_with('/') || raw.starts_with("./") || raw.starts_with("uploads/")
}

fn is_http(raw: &str) -> bool {
    Url::parse(raw)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Parses urls that may omit the scheme (`youtu.be/abc`,
/// `www.youtube.com/watch?v=...`).
fn parse_lenient(raw: &str) -> Option<Url> {
    if let Ok(url) = Url::parse(raw)
        && url.has_host()
    {
        return Some(url);
    }
    if raw.contains("://") || raw.starts_with('/') || raw.starts_with('.') {
        return None;
    }
    let host = raw.split(['/', '?', '#']).next()?;
    if !host.contains('.') {
        return None;
    }
    Url::parse(&format!("https://{raw}")).ok()
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

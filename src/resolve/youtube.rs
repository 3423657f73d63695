//! YouTube URL resolution.
//!
//! Accepts watch pages, `youtu.be` short links, embeds, and shorts across
//! the desktop, mobile, and music subdomains. The canonical form is always
//! `https://www.youtube.com/watch?v=<id>`; a playlist `list` parameter is
//! retained because it distinguishes "video inside playlist X" from the
//! bare video. Share-tracking parameters (`si`, `feature`, …) are dropped
//! with everything else.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::fragment::{parse_temp_frag, TempFragment};
use crate::media_url::MediaHost;

use super::{no_hash, Resolved, UrlProvider};

/// Video ids are url-safe base64ish; be lenient on length.
static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{6,}$").unwrap());

/// YouTube's own `t` query values: `30`, `30s`, `2m30s`, `1h2m30s`.
static TIME_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s?)?$").unwrap());

pub struct YouTubeUrl;

impl UrlProvider for YouTubeUrl {
    fn host(&self) -> MediaHost {
        MediaHost::YouTube
    }

    fn detect(&self, url: &Url) -> bool {
        // Hostname first, then path shape: channel and landing pages carry
        // no video id and belong to the generic provider.
        video_id(url).is_some()
    }

    fn resolve(&self, url: &Url) -> Resolved {
        let id = video_id(url).unwrap_or_default();
        let mut cleaned = Url::parse("https://www.youtube.com/watch").expect("static url");
        {
            let mut query = cleaned.query_pairs_mut();
            query.append_pair("v", &id);
            if let Some(list) = query_param(url, "list") {
                query.append_pair("list", &list);
            }
        }

        let temp_frag = url
            .fragment()
            .and_then(parse_temp_frag)
            .or_else(|| {
                let t = query_param(url, "t")?;
                Some(TempFragment::at(parse_time_param(&t)?))
            });

        Resolved {
            cleaned,
            source: no_hash(url),
            temp_frag,
        }
    }
}

fn is_youtube_host(host: &str) -> bool {
    matches!(
        host,
        "youtube.com" | "www.youtube.com" | "m.youtube.com" | "music.youtube.com"
    )
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Extract the video id, or `None` when the URL is not a video page.
fn video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let candidate = if host == "youtu.be" {
        url.path_segments()?.next().map(str::to_owned)
    } else if is_youtube_host(host) {
        let mut segments = url.path_segments()?;
        match segments.next()? {
            "watch" => query_param(url, "v"),
            "embed" | "shorts" => segments.next().map(str::to_owned),
            _ => None,
        }
    } else {
        None
    }?;
    VIDEO_ID.is_match(&candidate).then_some(candidate)
}

/// Parse YouTube's `t` parameter into seconds.
fn parse_time_param(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    let caps = TIME_PARAM.captures(value)?;
    let part = |i: usize| -> Option<f64> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };
    let (h, m, s) = (part(1), part(2), part(3));
    if h.is_none() && m.is_none() && s.is_none() {
        return None;
    }
    Some(h.unwrap_or(0.0) * 3600.0 + m.unwrap_or(0.0) * 60.0 + s.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(input: &str) -> Resolved {
        YouTubeUrl.resolve(&Url::parse(input).unwrap())
    }

    #[test]
    fn detects_video_pages_only() {
        for input in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=abc123xyz",
            "https://m.youtube.com/watch?v=abc123xyz",
            "https://music.youtube.com/watch?v=abc123xyz",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/abc123xyz",
        ] {
            assert!(YouTubeUrl.detect(&Url::parse(input).unwrap()), "for {input}");
        }
        for input in [
            "https://www.youtube.com/",
            "https://www.youtube.com/@somechannel",
            "https://www.youtube.com/watch",
            "https://youtu.be/",
            "https://example.com/watch?v=abc123xyz",
        ] {
            assert!(!YouTubeUrl.detect(&Url::parse(input).unwrap()), "for {input}");
        }
    }

    #[test]
    fn canonicalizes_to_desktop_watch_url() {
        for input in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ&feature=share",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            assert_eq!(
                resolve(input).cleaned.as_str(),
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "for {input}"
            );
        }
    }

    #[test]
    fn retains_playlist_parameter() {
        let resolved = resolve("https://www.youtube.com/watch?v=abc123xyz&list=PL0123456&index=2");
        assert_eq!(
            resolved.cleaned.as_str(),
            "https://www.youtube.com/watch?v=abc123xyz&list=PL0123456"
        );
    }

    #[test]
    fn time_query_parameter_becomes_fragment() {
        assert_eq!(
            resolve("https://www.youtube.com/watch?v=abc123xyz&t=30").temp_frag,
            Some(TempFragment::at(30.0))
        );
        assert_eq!(
            resolve("https://youtu.be/abc123xyz?t=90s").temp_frag,
            Some(TempFragment::at(90.0))
        );
        assert_eq!(
            resolve("https://youtu.be/abc123xyz?t=1h2m3s").temp_frag,
            Some(TempFragment::at(3723.0))
        );
    }

    #[test]
    fn hash_fragment_wins_over_time_parameter() {
        let resolved = resolve("https://www.youtube.com/watch?v=abc123xyz&t=30#t=10,20");
        assert_eq!(
            resolved.temp_frag,
            TempFragment::new(Some(10.0), Some(20.0))
        );
    }

    #[test]
    fn source_keeps_original_form_minus_hash() {
        let resolved = resolve("https://youtu.be/abc123xyz?t=30#t=10");
        assert_eq!(resolved.source.as_str(), "https://youtu.be/abc123xyz?t=30");
    }

    #[test]
    fn garbage_time_parameter_tolerated() {
        assert_eq!(resolve("https://youtu.be/abc123xyz?t=later").temp_frag, None);
    }
}

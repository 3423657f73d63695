//! Temporal fragment parsing for media URLs.
//!
//! A temporal fragment is the `t=start[,end]` annotation carried in a URL
//! hash (media-fragment style), marking where playback should begin and
//! optionally end. Times are plain seconds (`90`, `42.5`) or colon
//! durations (`1:30`, `01:02:03.5`). Fragments are advisory: anything
//! malformed parses to `None` rather than failing the navigation.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `h:mm:ss` / `mm:ss` time token, seconds bounded to `00..=59`.
static COLON_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+):)?([0-5]?\d):([0-5]\d(?:\.\d+)?)$").unwrap());

/// Plain non-negative seconds, optionally fractional.
static PLAIN_SECONDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

/// Start/end playback times in seconds extracted from a URL hash.
///
/// `None` means "unspecified", not zero. Values are immutable once parsed;
/// build variants with [`TempFragment::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempFragment {
    /// Start time in seconds, if given.
    pub start: Option<f64>,
    /// End time in seconds, if given.
    pub end: Option<f64>,
}

impl TempFragment {
    /// Create a fragment; returns `None` when neither bound is set.
    #[must_use]
    pub fn new(start: Option<f64>, end: Option<f64>) -> Option<Self> {
        if start.is_none() && end.is_none() {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// Fragment marking a single instant (start with no end).
    #[must_use]
    pub fn at(start: f64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// `true` when this fragment is a bare timestamp rather than a range.
    #[must_use]
    pub fn is_timestamp(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    /// Render as a hash parameter (`t=30`, `t=10,20`, `t=,20`), no `#`.
    ///
    /// Seconds use the shortest decimal form that parses back exactly, so
    /// `parse_temp_frag(&f.to_hash_value()) == Some(f)`.
    #[must_use]
    pub fn to_hash_value(&self) -> String {
        let mut out = String::from("t=");
        if let Some(start) = self.start {
            let _ = write!(out, "{start}");
        }
        if let Some(end) = self.end {
            let _ = write!(out, ",{end}");
        }
        out
    }
}

/// Parse a URL hash (with or without leading `#`) into a temporal fragment.
///
/// The `t` parameter may sit among other hash parameters (`#foo&t=30`);
/// the first occurrence wins. Returns `None` when no well-formed time
/// information is present.
#[must_use]
pub fn parse_temp_frag(hash: &str) -> Option<TempFragment> {
    let hash = hash.trim_start_matches('#');
    if hash.is_empty() {
        return None;
    }
    let time = hash
        .split('&')
        .find_map(|param| param.strip_prefix("t="))?;

    let (start_str, end_str) = match time.split_once(',') {
        Some((s, e)) => (s, e),
        None => (time, ""),
    };

    let start = parse_time(start_str);
    let end = parse_time(end_str);
    // A present-but-garbled bound invalidates the whole fragment: `t=abc`
    // must not collapse into "start unspecified".
    if (!start_str.is_empty() && start.is_none()) || (!end_str.is_empty() && end.is_none()) {
        return None;
    }
    TempFragment::new(start, end)
}

/// Parse one time token into seconds. Empty or malformed input → `None`.
fn parse_time(token: &str) -> Option<f64> {
    if token.is_empty() {
        return None;
    }
    if PLAIN_SECONDS.is_match(token) {
        return token.parse().ok();
    }
    let caps = COLON_TIME.captures(token)?;
    let hours: f64 = caps
        .get(1)
        .map_or(Some(0.0), |m| m.as_str().parse().ok())?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Format seconds for display: `m:ss`, or `h:mm:ss` from one hour up.
///
/// Fractional seconds are floored; negative input clamps to `0:00`.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Format seconds as an ISO-8601 duration (`PT1H2M3S`), for link anchors
/// and filenames that cannot carry `:`.
#[must_use]
pub fn to_duration_iso_string(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::from("PT");
    if h > 0 {
        let _ = write!(out, "{h}H");
    }
    if m > 0 {
        let _ = write!(out, "{m}M");
    }
    if s > 0 || out == "PT" {
        let _ = write!(out, "{s}S");
    }
    out
}

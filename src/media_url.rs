//! Canonical media identity.
//!
//! A [`MediaUrl`] wraps the host tag, cleaned URL, and optional temporal
//! fragment produced by the resolver chain. Equality is the load-bearing
//! operation: view reuse, playlist dedup, and note back-reference matching
//! all ask "is this the same media", and they must agree. Two values are
//! equal iff host and cleaned URL match after normalization; scheme
//! (`http`/`https`), trailing slash, hash fragment, and any query parameter
//! the resolver dropped do not participate.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::fragment::TempFragment;

/// Audio file extensions recognized for kind inference.
const AUDIO_EXTS: &[&str] = &["mp3", "wav", "m4a", "3gp", "flac", "ogg", "oga", "opus"];
/// Video file extensions recognized for kind inference.
const VIDEO_EXTS: &[&str] = &["mp4", "webm", "ogv", "mov", "mkv", "m4v"];

/// Supported media hosts, most specific providers first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaHost {
    YouTube,
    Vimeo,
    Bilibili,
    Coursera,
    /// Fallback for any URL no specific provider claims.
    Generic,
}

impl MediaHost {
    /// Short lowercase slug, stable across the wire and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Vimeo => "vimeo",
            Self::Bilibili => "bilibili",
            Self::Coursera => "coursera",
            Self::Generic => "generic",
        }
    }

    /// Human-facing provider name for view titles.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Vimeo => "Vimeo",
            Self::Bilibili => "bilibili",
            Self::Coursera => "Coursera",
            Self::Generic => "Website",
        }
    }
}

impl fmt::Display for MediaHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse media kind inferred from the cleaned URL's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

/// Canonical identity of a remote media resource.
///
/// Built once per resolution, never mutated: operations that adjust the
/// temporal fragment return a new value via [`MediaUrl::with_fragment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "MediaUrlRepr", into = "MediaUrlRepr")]
pub struct MediaUrl {
    host: MediaHost,
    cleaned: Url,
    source: Url,
    temp_frag: Option<TempFragment>,
    /// Precomputed comparison key; see [`identity_key`].
    key: String,
}

impl MediaUrl {
    /// Assemble an identity from resolver output. Prefer
    /// [`UrlResolver::resolve`](crate::resolve::UrlResolver::resolve) over
    /// calling this directly.
    #[must_use]
    pub fn new(host: MediaHost, cleaned: Url, source: Url, temp_frag: Option<TempFragment>) -> Self {
        let key = identity_key(host, &cleaned);
        Self {
            host,
            cleaned,
            source,
            temp_frag,
            key,
        }
    }

    /// Which provider claimed this URL.
    #[must_use]
    pub fn host(&self) -> MediaHost {
        self.host
    }

    /// Provider-normalized URL used for identity comparison.
    #[must_use]
    pub fn cleaned(&self) -> &Url {
        &self.cleaned
    }

    /// Original URL with only the hash stripped.
    #[must_use]
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// Temporal fragment carried by the source link, if any.
    #[must_use]
    pub fn temp_frag(&self) -> Option<TempFragment> {
        self.temp_frag
    }

    /// The normalized string two equal identities share. Diagnostic; the
    /// comparison itself goes through `==` / [`compare`].
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.key
    }

    /// Clone with a different temporal fragment ("link to this timestamp").
    #[must_use]
    pub fn with_fragment(&self, temp_frag: Option<TempFragment>) -> Self {
        Self {
            temp_frag,
            ..self.clone()
        }
    }

    /// Render a shareable link: the source URL plus the fragment hash.
    #[must_use]
    pub fn to_link(&self) -> String {
        match self.temp_frag {
            Some(frag) => format!("{}#{}", self.source, frag.to_hash_value()),
            None => self.source.to_string(),
        }
    }

    /// Infer audio/video from the cleaned URL's file extension.
    #[must_use]
    pub fn media_kind(&self) -> MediaKind {
        let path = self.cleaned.path();
        let ext = match path.rsplit_once('.') {
            Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
            _ => return MediaKind::Unknown,
        };
        if AUDIO_EXTS.contains(&ext.as_str()) {
            MediaKind::Audio
        } else if VIDEO_EXTS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unknown
        }
    }
}

impl PartialEq for MediaUrl {
    fn eq(&self, other: &Self) -> bool {
        // Host tag first for the cheap reject, then the normalized key.
        self.host == other.host && self.key == other.key
    }
}

impl Eq for MediaUrl {}

impl Hash for MediaUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_link())
    }
}

/// Nullable comparison used by view matching: unset means "no current
/// media", and two unset sides agree.
#[must_use]
pub fn compare(a: Option<&MediaUrl>, b: Option<&MediaUrl>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Normalize a cleaned URL into the comparison key.
///
/// Folds `http` to `https`, drops the fragment, and trims the trailing
/// path slash (but never the root path). Query order is preserved as the
/// provider emitted it; resolvers are responsible for dropping parameters
/// that must not participate in identity.
fn identity_key(host: MediaHost, cleaned: &Url) -> String {
    let scheme = match cleaned.scheme() {
        "http" => "https",
        other => other,
    };
    let mut key = format!("{}|{scheme}://{}", host.as_str(), cleaned.authority());
    let path = cleaned.path();
    if path.len() > 1 {
        key.push_str(path.trim_end_matches('/'));
    } else {
        key.push_str(path);
    }
    if let Some(query) = cleaned.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

/// Plain serialized form; the comparison key is rebuilt on the way in.
#[derive(Serialize, Deserialize)]
struct MediaUrlRepr {
    host: MediaHost,
    cleaned: Url,
    source: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    temp_frag: Option<TempFragment>,
}

impl From<MediaUrlRepr> for MediaUrl {
    fn from(repr: MediaUrlRepr) -> Self {
        Self::new(repr.host, repr.cleaned, repr.source, repr.temp_frag)
    }
}

impl From<MediaUrl> for MediaUrlRepr {
    fn from(value: MediaUrl) -> Self {
        Self {
            host: value.host,
            cleaned: value.cleaned,
            source: value.source,
            temp_frag: value.temp_frag,
        }
    }
}

//! Host detection and canonical URL resolution.
//!
//! Arbitrary user-supplied links become comparable [`MediaUrl`] identities
//! here. Providers are checked in a fixed priority order, most specific
//! first, and the first whose [`UrlProvider::detect`] accepts the URL
//! resolves it. The [`generic`] provider sits last and never rejects, so
//! resolution of a parsed URL is total.
//!
//! Resolution is pure: no I/O, no network, safe to call speculatively and
//! discard. Per-provider quirks (tracking-parameter stripping, mobile
//! subdomain rewrites, time query parameters) live entirely inside that
//! provider's module and never leak into the generic path.

pub mod bilibili;
pub mod coursera;
pub mod generic;
pub mod vimeo;
pub mod youtube;

use thiserror::Error;
use url::Url;

use crate::fragment::TempFragment;
use crate::media_url::{MediaHost, MediaUrl};

/// Output of a provider's resolve step.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Query/hash-normalized URL used for identity comparison.
    pub cleaned: Url,
    /// Original URL with the hash stripped.
    pub source: Url,
    /// Temporal fragment extracted from the link, if any.
    pub temp_frag: Option<TempFragment>,
}

/// One provider in the chain: a pure detector plus a total resolver.
///
/// `resolve` is only invoked for URLs `detect` accepted and must always
/// produce a [`Resolved`]: malformed component values inside an accepted
/// host pass through un-normalized rather than failing.
pub trait UrlProvider: Send + Sync {
    /// Host tag this provider claims URLs for.
    fn host(&self) -> MediaHost;

    /// Hostname (and, where ambiguous, path-shape) based detection.
    fn detect(&self, url: &Url) -> bool;

    /// Produce the cleaned/source pair and temporal fragment.
    fn resolve(&self, url: &Url) -> Resolved;
}

/// Resolution failure: the input was not a URL at all.
///
/// A parsed URL always resolves (the generic provider matches
/// unconditionally), so this is the only runtime error in the layer.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Ordered provider chain with the generic fallback pinned last.
pub struct UrlResolver {
    providers: Vec<Box<dyn UrlProvider>>,
}

impl UrlResolver {
    /// Chain with all built-in providers in priority order.
    #[must_use]
    pub fn new() -> Self {
        let providers: Vec<Box<dyn UrlProvider>> = vec![
            Box::new(youtube::YouTubeUrl),
            Box::new(vimeo::VimeoUrl),
            Box::new(bilibili::BilibiliUrl),
            Box::new(coursera::CourseraUrl),
            Box::new(generic::GenericUrl),
        ];
        Self { providers }
    }

    /// Resolve a raw string; fails only when it cannot be parsed as a URL.
    pub fn resolve_str(&self, input: &str) -> Result<MediaUrl, ResolveError> {
        let url = Url::parse(input.trim())?;
        Ok(self.resolve(&url))
    }

    /// Resolve a parsed URL to its canonical identity. Total.
    #[must_use]
    pub fn resolve(&self, url: &Url) -> MediaUrl {
        for provider in &self.providers {
            if provider.detect(url) {
                tracing::debug!(host = %provider.host(), %url, "matched url provider");
                let resolved = provider.resolve(url);
                return MediaUrl::new(
                    provider.host(),
                    resolved.cleaned,
                    resolved.source,
                    resolved.temp_frag,
                );
            }
        }
        // The chain always ends in the generic provider; reaching this
        // point means it was constructed without one.
        debug_assert!(false, "resolver chain exhausted without generic fallback");
        tracing::error!(%url, "resolver chain exhausted, forcing generic");
        let resolved = generic::GenericUrl.resolve(url);
        MediaUrl::new(
            MediaHost::Generic,
            resolved.cleaned,
            resolved.source,
            resolved.temp_frag,
        )
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `url` with the hash fragment removed.
pub(crate) fn no_hash(url: &Url) -> Url {
    let mut cleaned = url.clone();
    cleaned.set_fragment(None);
    cleaned
}

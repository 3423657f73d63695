//! Fallback provider for direct media links and unrecognized hosts.
//!
//! Never rejects. The cleaned form is the input with only the hash
//! removed: without provider knowledge, every query parameter is assumed
//! load-bearing.

use url::Url;

use crate::fragment::parse_temp_frag;
use crate::media_url::MediaHost;

use super::{no_hash, Resolved, UrlProvider};

pub struct GenericUrl;

impl UrlProvider for GenericUrl {
    fn host(&self) -> MediaHost {
        MediaHost::Generic
    }

    fn detect(&self, _url: &Url) -> bool {
        true
    }

    fn resolve(&self, url: &Url) -> Resolved {
        Resolved {
            cleaned: no_hash(url),
            source: no_hash(url),
            temp_frag: url.fragment().and_then(parse_temp_frag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaned_is_input_minus_hash() {
        let url = Url::parse("https://cdn.example.com/clip.mp4?sig=abc#t=10").unwrap();
        let resolved = GenericUrl.resolve(&url);
        assert_eq!(resolved.cleaned.as_str(), "https://cdn.example.com/clip.mp4?sig=abc");
        assert_eq!(resolved.source.as_str(), "https://cdn.example.com/clip.mp4?sig=abc");
        assert_eq!(resolved.temp_frag.unwrap().start, Some(10.0));
    }

    #[test]
    fn accepts_anything() {
        for input in [
            "https://example.com",
            "file:///tmp/a.mp4",
            "ftp://host/clip.mov",
        ] {
            assert!(GenericUrl.detect(&Url::parse(input).unwrap()));
        }
    }

    #[test]
    fn no_time_info_yields_none() {
        let url = Url::parse("https://cdn.example.com/clip.mp4").unwrap();
        assert!(GenericUrl.resolve(&url).temp_frag.is_none());
    }
}

//! Vimeo URL resolution.
//!
//! Accepts `vimeo.com/<id>` pages and `player.vimeo.com/video/<id>`
//! embeds; the canonical form is `https://vimeo.com/<id>`. Unlisted-link
//! hashes and query parameters do not participate in identity.

use url::Url;

use crate::fragment::parse_temp_frag;
use crate::media_url::MediaHost;

use super::{no_hash, Resolved, UrlProvider};

pub struct VimeoUrl;

impl UrlProvider for VimeoUrl {
    fn host(&self) -> MediaHost {
        MediaHost::Vimeo
    }

    fn detect(&self, url: &Url) -> bool {
        video_id(url).is_some()
    }

    fn resolve(&self, url: &Url) -> Resolved {
        let id = video_id(url).unwrap_or_default();
        let cleaned = Url::parse(&format!("https://vimeo.com/{id}"))
            .unwrap_or_else(|_| no_hash(url));

        Resolved {
            cleaned,
            source: no_hash(url),
            temp_frag: url.fragment().and_then(parse_temp_frag),
        }
    }
}

fn video_id(url: &Url) -> Option<String> {
    let mut segments = match url.host_str()? {
        "vimeo.com" | "www.vimeo.com" => url.path_segments()?,
        "player.vimeo.com" => {
            let mut segments = url.path_segments()?;
            if segments.next()? != "video" {
                return None;
            }
            segments
        }
        _ => return None,
    };
    let id = segments.next()?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then(|| id.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(input: &str) -> Resolved {
        VimeoUrl.resolve(&Url::parse(input).unwrap())
    }

    #[test]
    fn detects_numeric_video_pages() {
        assert!(VimeoUrl.detect(&Url::parse("https://vimeo.com/123456789").unwrap()));
        assert!(VimeoUrl.detect(&Url::parse("https://www.vimeo.com/123456789").unwrap()));
        assert!(VimeoUrl.detect(&Url::parse("https://player.vimeo.com/video/123456789").unwrap()));
        assert!(!VimeoUrl.detect(&Url::parse("https://vimeo.com/about").unwrap()));
        assert!(!VimeoUrl.detect(&Url::parse("https://vimeo.com/").unwrap()));
        assert!(!VimeoUrl.detect(&Url::parse("https://player.vimeo.com/123456789").unwrap()));
    }

    #[test]
    fn canonicalizes_embeds_to_page_url() {
        assert_eq!(
            resolve("https://player.vimeo.com/video/123456789?h=abcdef").cleaned.as_str(),
            "https://vimeo.com/123456789"
        );
    }

    #[test]
    fn unlisted_hash_excluded_from_identity() {
        let a = resolve("https://vimeo.com/123456789/abcdef0123");
        // The unlisted segment is path position two; identity keys on the id.
        assert_eq!(a.cleaned.as_str(), "https://vimeo.com/123456789");
    }

    #[test]
    fn fragment_parsed_from_hash() {
        assert_eq!(
            resolve("https://vimeo.com/123456789#t=1:30").temp_frag.unwrap().start,
            Some(90.0)
        );
    }
}

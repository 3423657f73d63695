//! Bilibili URL resolution.
//!
//! Accepts `/video/BV…` and `/video/av…` pages on the desktop and mobile
//! hosts; the mobile subdomain is rewritten to `www`. Bilibili share links
//! carry heavy tracking baggage (`spm_id_from`, `vd_source`, …); the
//! cleaned form keeps only the part number `p`, which distinguishes the
//! parts of a multi-part video and therefore must survive normalization.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::fragment::{parse_temp_frag, TempFragment};
use crate::media_url::MediaHost;

use super::{no_hash, Resolved, UrlProvider};

/// `BV` ids (alphanumeric) or legacy `av` ids (numeric).
static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:BV[0-9A-Za-z]+|av\d+)$").unwrap());

pub struct BilibiliUrl;

impl UrlProvider for BilibiliUrl {
    fn host(&self) -> MediaHost {
        MediaHost::Bilibili
    }

    fn detect(&self, url: &Url) -> bool {
        video_id(url).is_some()
    }

    fn resolve(&self, url: &Url) -> Resolved {
        let id = video_id(url).unwrap_or_default();
        let mut cleaned =
            Url::parse(&format!("https://www.bilibili.com/video/{id}")).unwrap_or_else(|_| no_hash(url));
        if let Some(part) = query_param(url, "p") {
            if part != "1" {
                cleaned.query_pairs_mut().append_pair("p", &part);
            }
        }

        let temp_frag = url
            .fragment()
            .and_then(parse_temp_frag)
            .or_else(|| {
                let t: f64 = query_param(url, "t")?.parse().ok()?;
                (t >= 0.0).then(|| TempFragment::at(t))
            });

        Resolved {
            cleaned,
            source: no_hash(url),
            temp_frag,
        }
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn video_id(url: &Url) -> Option<String> {
    match url.host_str()? {
        "bilibili.com" | "www.bilibili.com" | "m.bilibili.com" => {}
        _ => return None,
    }
    let mut segments = url.path_segments()?;
    if segments.next()? != "video" {
        return None;
    }
    let id = segments.next()?;
    VIDEO_ID.is_match(id).then(|| id.to_owned())
}

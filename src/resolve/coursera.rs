//! Coursera URL resolution.
//!
//! Lecture URLs are stable by path alone; the query only carries session
//! state, so the cleaned form drops it entirely.

use url::Url;

use crate::fragment::parse_temp_frag;
use crate::media_url::MediaHost;

use super::{no_hash, Resolved, UrlProvider};

pub struct CourseraUrl;

impl UrlProvider for CourseraUrl {
    fn host(&self) -> MediaHost {
        MediaHost::Coursera
    }

    fn detect(&self, url: &Url) -> bool {
        url.host_str() == Some("www.coursera.org")
    }

    fn resolve(&self, url: &Url) -> Resolved {
        let mut cleaned = no_hash(url);
        cleaned.set_query(None);

        Resolved {
            cleaned,
            source: no_hash(url),
            temp_frag: url.fragment().and_then(parse_temp_frag),
        }
    }
}

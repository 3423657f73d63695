//! Per-host page-title cleanup.
//!
//! Remote pages report window titles padded with provider branding
//! ("… - YouTube", "… on Vimeo"); views display the bare media title.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::media_url::MediaHost;

static YOUTUBE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(\d+\) ").unwrap());

/// bilibili pads titles with site branding and category breadcrumbs.
static BILIBILI_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-_]哔哩哔哩.+$|[-_]bilibili.+$|-(?:番剧|电影|纪录片|国创|电视剧|综艺)-.+$").unwrap()
});

/// Strip provider branding from a reported page title.
#[must_use]
pub fn clean_title(host: MediaHost, title: &str) -> String {
    match host {
        MediaHost::Generic => title.to_owned(),
        MediaHost::YouTube => {
            let title = YOUTUBE_PREFIX.replace(title, "");
            title.trim_end_matches(" - YouTube").to_owned()
        }
        MediaHost::Vimeo => title.trim_end_matches(" on Vimeo").to_owned(),
        MediaHost::Coursera => title.trim_end_matches(" | Coursera").to_owned(),
        MediaHost::Bilibili => match BILIBILI_SUFFIX.replace(title, "") {
            Cow::Borrowed(unchanged) => unchanged.to_owned(),
            Cow::Owned(stripped) => stripped,
        },
    }
}

//! Status URL patterns.
//!
//! A status locator looks like `https://x.com/<handle>/status/<id>` (also
//! `twitter.com`, `statuses`, and the old `#!/` hash-bang form), optionally
//! followed by `/video/<n>` or `/photo/<n>` selecting one attached media item.
use regex::Regex;
use std::sync::LazyLock;

static STATUS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:twitter|x)\.com/(?:#!/)?(\w+)/status(?:es)?/(\d+)(?:/(?:video|photo)/(\d+))?")
        .expect("status pattern compiles")
});

const SHORT_LINK_PREFIX: &str = "https://t.co/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLocator {
    pub handle: String,
    pub tweet_id: String,
    /// 1-based media index from `/video/<n>` or `/photo/<n>`.
    pub media_index: Option<usize>,
}

impl StatusLocator {
    pub fn parse(url: &str) -> Option<Self> {
        let caps = STATUS_PATTERN.captures(url)?;
        Some(Self {
            handle: caps[1].to_string(),
            tweet_id: caps[2].to_string(),
            media_index: caps.get(3).and_then(|m| m.as_str().parse().ok()),
        })
    }
}

/// True when `url` points at a status this crate can handle.
pub fn is_status_url(url: &str) -> bool {
    STATUS_PATTERN.is_match(url)
}

/// Shortened `t.co` links need one redirect hop before they can be matched.
pub fn is_short_link(url: &str) -> bool {
    url.contains(SHORT_LINK_PREFIX)
}

/// Keep everything up to and including the numeric status id, dropping
/// tracking query strings and trailing path segments. URLs that are not status
/// locators come back unchanged.
pub fn canonicalize(url: &str) -> String {
    let Some(caps) = STATUS_PATTERN.captures(url) else {
        return url.to_string();
    };
    let id_end = caps.get(2).map(|m| m.end()).unwrap_or(url.len());
    url[..id_end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_query() {
        assert_eq!(
            canonicalize("https://x.com/u/status/123?s=20"),
            "https://x.com/u/status/123"
        );
        assert_eq!(
            canonicalize("https://twitter.com/SomeOne/status/1630000000000000000?s=46&t=abc"),
            "https://twitter.com/SomeOne/status/1630000000000000000"
        );
    }

    #[test]
    fn keeps_scheme_host_handle_and_id() {
        let url = "http://mobile.twitter.com/a_b/statuses/42";
        assert_eq!(canonicalize(url), url);
    }

    #[test]
    fn drops_media_suffix() {
        assert_eq!(
            canonicalize("https://x.com/u/status/123/photo/1?s=20"),
            "https://x.com/u/status/123"
        );
    }

    #[test]
    fn non_status_urls_are_untouched() {
        assert_eq!(canonicalize("https://t.co/abc?x=1"), "https://t.co/abc?x=1");
    }

    #[test]
    fn parses_handle_id_and_index() {
        let loc = StatusLocator::parse("https://twitter.com/#!/nasa/status/99/video/2").unwrap();
        assert_eq!(loc.handle, "nasa");
        assert_eq!(loc.tweet_id, "99");
        assert_eq!(loc.media_index, Some(2));

        let loc = StatusLocator::parse("https://x.com/nasa/status/99").unwrap();
        assert_eq!(loc.media_index, None);
        assert!(StatusLocator::parse("https://x.com/nasa").is_none());
    }

    #[test]
    fn detects_short_links() {
        assert!(is_short_link("https://t.co/AbC123"));
        assert!(!is_short_link("https://x.com/u/status/1"));
        assert!(is_status_url("https://x.com/u/status/1"));
    }
}

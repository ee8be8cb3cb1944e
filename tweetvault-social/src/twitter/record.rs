//! Records produced by the patched extractor.
//!
//! An [`Entry`] is the tweet-level [`TweetInfo`] merged with what one media
//! item contributes: either resolved [`MediaInfo`] or a redirect to another
//! locator. Both halves are flattened when serialised, so an entry reads as a
//! single flat object.
use serde::Serialize;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Tweet-level metadata shared by every entry of one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweetInfo {
    pub id: String,
    pub display_id: String,
    pub title: String,
    pub description: String,
    pub uploader: Option<String>,
    pub uploader_id: Option<String>,
    pub uploader_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    pub like_count: Option<u64>,
    pub repost_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub age_limit: u8,
    pub tags: Vec<String>,
    /// Back-reference ids; set on the entry that previously stood for the whole tweet.
    #[serde(rename = "_old_archive_ids", skip_serializing_if = "Vec::is_empty")]
    pub old_archive_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Https,
    #[serde(rename = "m3u8_native")]
    Hls,
}

/// One downloadable rendition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Format {
    pub format_id: String,
    pub url: String,
    pub ext: String,
    pub protocol: Protocol,
    /// Total bitrate in kbit/s.
    pub tbr: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub audio_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subtitle {
    pub url: String,
    pub ext: String,
}

/// Subtitle tracks keyed by language.
pub type Subtitles = BTreeMap<String, Vec<Subtitle>>;

pub fn merge_subtitles(into: &mut Subtitles, from: Subtitles) {
    for (lang, tracks) in from {
        into.entry(lang).or_default().extend(tracks);
    }
}

/// Formats and subtitles contributed by one manifest or variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatSet {
    pub formats: Vec<Format>,
    pub subtitles: Subtitles,
}

impl FormatSet {
    pub fn extend(&mut self, other: FormatSet) {
        self.formats.extend(other.formats);
        merge_subtitles(&mut self.subtitles, other.subtitles);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thumbnail {
    pub id: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaInfo {
    pub media_id: Option<String>,
    pub formats: Vec<Format>,
    pub subtitles: Subtitles,
    pub thumbnails: Vec<Thumbnail>,
    pub view_count: Option<u64>,
    pub duration: Option<f64>,
}

/// What a single entry carries besides the tweet metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
pub enum EntryBody {
    Video(MediaInfo),
    /// Hand the locator to another extractor (`ie_key`) or to a generic one.
    Url {
        url: String,
        ie_key: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    #[serde(flatten)]
    pub info: TweetInfo,
    #[serde(flatten)]
    pub body: EntryBody,
}

impl Entry {
    pub fn media(&self) -> Option<&MediaInfo> {
        match &self.body {
            EntryBody::Video(m) => Some(m),
            EntryBody::Url { .. } => None,
        }
    }

    pub fn redirect_url(&self) -> Option<&str> {
        match &self.body {
            EntryBody::Url { url, .. } => Some(url),
            EntryBody::Video(_) => None,
        }
    }
}

/// Final result of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Single(Entry),
    Playlist(Playlist),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Playlist {
    #[serde(flatten)]
    pub info: TweetInfo,
    pub entries: Vec<Entry>,
}

impl Extraction {
    pub fn entries(&self) -> &[Entry] {
        match self {
            Extraction::Single(e) => std::slice::from_ref(e),
            Extraction::Playlist(p) => &p.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> TweetInfo {
        TweetInfo {
            id: "1".into(),
            display_id: "1".into(),
            title: "t".into(),
            description: "d".into(),
            uploader: None,
            uploader_id: None,
            uploader_url: None,
            timestamp: None,
            like_count: None,
            repost_count: None,
            comment_count: None,
            age_limit: 0,
            tags: vec![],
            old_archive_ids: vec![],
        }
    }

    #[test]
    fn entries_flatten_on_serialise() {
        let entry = Entry {
            info: info(),
            body: EntryBody::Url {
                url: "https://example.com".into(),
                ie_key: None,
            },
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v["_type"], "url");
        assert_eq!(v["url"], "https://example.com");
        assert_eq!(v["title"], "t");
        assert!(v.get("_old_archive_ids").is_none());
    }

    #[test]
    fn subtitles_merge_per_language() {
        let mut a = Subtitles::new();
        a.insert(
            "en".into(),
            vec![Subtitle {
                url: "a".into(),
                ext: "vtt".into(),
            }],
        );
        let mut b = Subtitles::new();
        b.insert(
            "en".into(),
            vec![Subtitle {
                url: "b".into(),
                ext: "vtt".into(),
            }],
        );
        merge_subtitles(&mut a, b);
        assert_eq!(a["en"].len(), 2);
    }

    #[test]
    fn single_extraction_exposes_one_entry() {
        let e = Extraction::Single(Entry {
            info: info(),
            body: EntryBody::Video(MediaInfo::default()),
        });
        assert_eq!(e.entries().len(), 1);
        assert!(e.entries()[0].media().is_some());
    }
}

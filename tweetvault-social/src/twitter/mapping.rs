//! Status-to-record mapping.
//!
//! [`map_status`] is pure: it reads a legacy status object and decides which
//! entries the extraction yields, how they are titled, and which one carries
//! the back-reference id. Formats are left unresolved as [`FormatSource`]s so
//! the caller can fetch manifests afterwards.
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tweetvault_common::{Result, VaultError};
use url::Url;

use crate::path;
use crate::twitter::card::{CardMedia, card_media, has_card};
use crate::twitter::record::{Entry, EntryBody, MediaInfo, Thumbnail, TweetInfo};
use crate::twitter::traverse::{
    float_or_none, get, int_at, int_or_none, objects_at, str_at, string_or_none, url_or_none,
};
use crate::twitter::types::parse_created_at;

static TRAILING_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(https?://[^ ]+)").expect("url pattern compiles"));

/// Where a media item's formats come from once the mapping is done.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatSource {
    /// `video_info.variants` objects, one or more formats each.
    Variants(Vec<Value>),
    /// A VMAP document listing the variants.
    Vmap { url: String, content_id: String },
    Nothing,
}

/// A media item whose formats are not fetched yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMedia {
    pub media: MediaInfo,
    pub source: FormatSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub entry: Entry,
    pub source: FormatSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappedStatus {
    Single(PendingEntry),
    Playlist {
        info: TweetInfo,
        entries: Vec<PendingEntry>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequest<'a> {
    pub twid: &'a str,
    /// 1-based index from a `/video/<n>` or `/photo/<n>` locator.
    pub media_index: Option<usize>,
}

/// The id an older archiver used for the whole tweet.
pub fn archive_id(twid: &str) -> String {
    format!("twitter {twid}")
}

/// Tweet-level fields shared by every entry.
pub fn base_info(status: &Value, twid: &str) -> TweetInfo {
    let description = ["full_text", "text"]
        .iter()
        .find_map(|k| status.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .replace('\n', " ");
    let mut title = TRAILING_URL.replace_all(&description, "").into_owned();

    let uploader = str_at(status, path!["user", "name"]).map(str::to_owned);
    if let Some(name) = uploader.as_deref().filter(|n| !n.is_empty()) {
        title = format!("{name} - {title}");
    }
    let uploader_id = str_at(status, path!["user", "screen_name"])
        .filter(|s| !s.is_empty())
        .map(str::to_owned);
    let uploader_url = uploader_id
        .as_deref()
        .map(|id| format!("https://twitter.com/{id}"));

    let sensitive = status
        .get("possibly_sensitive")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    TweetInfo {
        id: twid.to_string(),
        display_id: twid.to_string(),
        title,
        description,
        uploader,
        uploader_id,
        uploader_url,
        timestamp: str_at(status, path!["created_at"]).and_then(parse_created_at),
        like_count: int_at(status, path!["favorite_count"]),
        repost_count: int_at(status, path!["retweet_count"]),
        comment_count: int_at(status, path!["reply_count"]),
        age_limit: if sensitive { 18 } else { 0 },
        tags: objects_at(status, path!["entities", "hashtags"])
            .into_iter()
            .filter_map(|h| h.get("text").and_then(Value::as_str))
            .map(str::to_owned)
            .collect(),
        old_archive_ids: Vec::new(),
    }
}

/// Map one extended media object (or a unified card media entity).
pub fn media_info_from_video(media: &Value) -> PendingMedia {
    let media_id = ["id_str", "id"]
        .iter()
        .find_map(|k| media.get(*k).and_then(string_or_none));
    tracing::debug!(media_id = media_id.as_deref().unwrap_or("-"), "Extracting from video info");

    let variants: Vec<Value> = objects_at(media, path!["video_info", "variants"])
        .into_iter()
        .cloned()
        .collect();

    let mut thumbnails = Vec::new();
    let media_url = ["media_url_https", "media_url"]
        .iter()
        .find_map(|k| media.get(*k).and_then(Value::as_str))
        .filter(|u| !u.is_empty());
    if let Some(media_url) = media_url {
        if let Some(sizes) = media.get("sizes").and_then(Value::as_object) {
            for (name, size) in sizes {
                thumbnails.push(sized_thumbnail(media_url, name, size));
            }
        }
        let original = media.get("original_info").cloned().unwrap_or(Value::Null);
        thumbnails.push(sized_thumbnail(media_url, "orig", &original));
    }

    PendingMedia {
        media: MediaInfo {
            media_id,
            thumbnails,
            view_count: int_at(media, path!["mediaStats", "viewCount"]),
            duration: get(media, path!["video_info", "duration_millis"])
                .and_then(float_or_none)
                .map(|ms| ms / 1000.0),
            ..Default::default()
        },
        source: if variants.is_empty() {
            FormatSource::Nothing
        } else {
            FormatSource::Variants(variants)
        },
    }
}

fn sized_thumbnail(media_url: &str, name: &str, size: &Value) -> Thumbnail {
    let dim = |a: &str, b: &str| {
        size.get(a)
            .or_else(|| size.get(b))
            .and_then(int_or_none)
            .and_then(|n| u32::try_from(n).ok())
    };
    Thumbnail {
        id: name.to_string(),
        url: with_query_param(media_url, "name", name),
        width: dim("w", "width"),
        height: dim("h", "height"),
    }
}

/// Set `key=value` on `url`. An existing value for `key` is replaced where it
/// stands; otherwise the pair is appended.
pub fn with_query_param(url: &str, key: &str, value: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            let mut replaced = false;
            let mut pairs: Vec<(String, String)> = Vec::new();
            for (k, v) in parsed.query_pairs() {
                if k != key {
                    pairs.push((k.into_owned(), v.into_owned()));
                } else if !replaced {
                    pairs.push((k.into_owned(), value.to_string()));
                    replaced = true;
                }
            }
            if !replaced {
                pairs.push((key.to_string(), value.to_string()));
            }
            parsed.query_pairs_mut().clear().extend_pairs(pairs);
            parsed.into()
        }
        Err(_) => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}{key}={value}")
        }
    }
}

/// Extended media of the status and then of its quoted status.
fn extended_media(status: &Value) -> Vec<&Value> {
    let quoted = get(status, path!["quoted_status"]);
    std::iter::once(status)
        .chain(quoted)
        .flat_map(|s| objects_at(s, path!["extended_entities", "media"]))
        .collect()
}

fn media_type(media: &Value) -> Option<&str> {
    media.get("type").and_then(Value::as_str)
}

fn pending_entry(info: &TweetInfo, pending: PendingMedia) -> PendingEntry {
    let mut info = info.clone();
    if let Some(id) = &pending.media.media_id {
        info.id = id.clone();
    }
    PendingEntry {
        entry: Entry {
            info,
            body: EntryBody::Video(pending.media),
        },
        source: pending.source,
    }
}

fn redirect_entry(info: &TweetInfo, url: String, ie_key: Option<&str>) -> PendingEntry {
    PendingEntry {
        entry: Entry {
            info: info.clone(),
            body: EntryBody::Url {
                url,
                ie_key: ie_key.map(str::to_owned),
            },
        },
        source: FormatSource::Nothing,
    }
}

/// The default mapping strategy.
pub fn map_status(status: &Value, request: &StatusRequest<'_>) -> Result<MappedStatus> {
    let twid = request.twid;
    let info = base_info(status, twid);
    let videos: Vec<&Value> = extended_media(status)
        .into_iter()
        .filter(|m| media_type(m).is_some_and(|t| t != "photo"))
        .collect();

    match request.media_index {
        Some(index) => select_one(status, info, &videos, index),
        None => {
            let mut entries: Vec<PendingEntry> = videos
                .iter()
                .map(|m| pending_entry(&info, media_info_from_video(m)))
                .collect();
            if has_card(status) {
                if let Some(card) = status.get("card") {
                    entries.extend(card_media(card, twid).into_iter().map(|c| match c {
                        CardMedia::Media(pending) => pending_entry(&info, pending),
                        CardMedia::Redirect { url, ie_key } => redirect_entry(&info, url, ie_key),
                    }));
                }
            }
            shape(status, info, entries, twid)
        }
    }
}

fn select_one(
    status: &Value,
    mut info: TweetInfo,
    videos: &[&Value],
    index: usize,
) -> Result<MappedStatus> {
    let position = index.checked_sub(1).ok_or(VaultError::Unavailable(index))?;
    let quoted = get(status, path!["quoted_status"]);
    let desired = std::iter::once(status)
        .chain(quoted)
        .find_map(|s| get(s, path!["extended_entities", "media", position]).filter(|m| m.is_object()))
        .ok_or(VaultError::Unavailable(index))?;

    if media_type(desired) != Some("video") {
        return Err(VaultError::NotAVideo(index));
    }

    if let Some(pos) = videos.iter().position(|v| v.get("id") == desired.get("id")) {
        let n = pos + 1;
        if n == 1 {
            info.old_archive_ids = vec![archive_id(&info.display_id)];
        }
        if videos.len() != 1 {
            info.title.push_str(&format!(" #{n}"));
        }
    }

    Ok(MappedStatus::Single(pending_entry(
        &info,
        media_info_from_video(desired),
    )))
}

fn shape(
    status: &Value,
    info: TweetInfo,
    mut entries: Vec<PendingEntry>,
    twid: &str,
) -> Result<MappedStatus> {
    if entries.is_empty() {
        let url = str_at(status, path!["entities", "urls", 0, "expanded_url"])
            .and_then(url_or_none)
            .ok_or_else(|| VaultError::NoMedia(twid.to_string()))?;
        tracing::debug!(twid, url, "no media in tweet, following its first link");
        return Ok(MappedStatus::Single(redirect_entry(&info, url.to_string(), None)));
    }

    entries[0].entry.info.old_archive_ids = vec![archive_id(twid)];
    if entries.len() == 1 {
        return Ok(MappedStatus::Single(entries.remove(0)));
    }

    for (i, pending) in entries.iter_mut().enumerate() {
        pending.entry.info.title.push_str(&format!(" #{}", i + 1));
    }
    Ok(MappedStatus::Playlist { info, entries })
}

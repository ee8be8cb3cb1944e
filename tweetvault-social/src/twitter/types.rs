//! Typed view of the legacy (v1.1) status payload used by the session adapter.
//!
//! Only the fields the archive record needs are modelled; everything else in
//! the response is ignored.
use serde::Deserialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id_str: String,
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub extended_entities: Option<ExtendedEntities>,
}

impl Tweet {
    /// `full_text` in extended mode, `text` otherwise.
    pub fn text(&self) -> &str {
        self.full_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    pub fn created_at(&self) -> Option<OffsetDateTime> {
        self.created_at.as_deref().and_then(parse_created_at)
    }

    pub fn media(&self) -> &[Media] {
        self.extended_entities
            .as_ref()
            .map(|e| e.media.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExtendedEntities {
    #[serde(default)]
    pub media: Vec<Media>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    AnimatedGif,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Media {
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub media_url_https: Option<String>,
    #[serde(default)]
    pub video_info: Option<VideoInfo>,
}

impl Media {
    pub fn variants(&self) -> &[Variant] {
        self.video_info
            .as_ref()
            .map(|v| v.variants.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoInfo {
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub duration_millis: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Variant {
    #[serde(default)]
    pub bitrate: Option<u64>,
    pub content_type: String,
    pub url: String,
}

/// Parse `created_at` as sent by the legacy API (`Wed Oct 10 20:19:24 +0000 2018`)
/// or as RFC 3339.
pub fn parse_created_at(raw: &str) -> Option<OffsetDateTime> {
    let legacy = format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute] [year]"
    );
    let raw = raw.trim();
    OffsetDateTime::parse(raw, legacy)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_legacy_created_at() {
        let ts = parse_created_at("Wed Oct 10 20:19:24 +0000 2018").unwrap();
        assert_eq!(ts.unix_timestamp(), 1_539_202_764);
    }

    #[test]
    fn parses_rfc3339_created_at() {
        let ts = parse_created_at("2018-10-10T20:19:24Z").unwrap();
        assert_eq!(ts.unix_timestamp(), 1_539_202_764);
        assert!(parse_created_at("yesterday").is_none());
    }

    #[test]
    fn unknown_media_types_deserialize() {
        let m: Media = serde_json::from_value(json!({"type": "model3d"})).unwrap();
        assert_eq!(m.kind, MediaKind::Other);
        assert!(m.variants().is_empty());
    }

    #[test]
    fn text_prefers_full_text() {
        let t: Tweet = serde_json::from_value(json!({
            "id_str": "1",
            "full_text": "long form",
            "text": "short"
        }))
        .unwrap();
        assert_eq!(t.text(), "long form");
        assert!(t.media().is_empty());
    }
}

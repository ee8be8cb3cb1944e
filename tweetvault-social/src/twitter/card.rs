//! Card payloads: rich embeds attached to a status.
//!
//! A card declares its kind by name (`poll2choice_video`, `745291183405076480:broadcast`,
//! ...). [`Card::from_name`] closes that open string set into an enum. Names we
//! do not recognise still carry a video stream in practice, so
//! [`Card::Unrecognized`] shares the generic stream handler with
//! [`Card::Amplify`].
use serde_json::Value;

use crate::path;
use crate::twitter::mapping::{FormatSource, PendingMedia, media_info_from_video};
use crate::twitter::record::{MediaInfo, Thumbnail};
use crate::twitter::traverse::{get, int_or_none, objects_at, url_or_none};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Card {
    Player,
    PeriscopeBroadcast,
    Broadcast,
    AudioSpace,
    Summary,
    UnifiedCard,
    Amplify,
    Unrecognized(String),
}

impl Card {
    /// Dispatch on the last `:`-separated segment of the declared name.
    pub fn from_name(name: &str) -> Self {
        let short = name.rsplit(':').next().unwrap_or(name);
        match short {
            "player" => Card::Player,
            "periscope_broadcast" => Card::PeriscopeBroadcast,
            "broadcast" => Card::Broadcast,
            "audiospace" => Card::AudioSpace,
            "summary" => Card::Summary,
            "unified_card" => Card::UnifiedCard,
            "amplify" => Card::Amplify,
            other => Card::Unrecognized(other.to_string()),
        }
    }
}

/// What a card contributes to the candidate set.
#[derive(Debug, Clone, PartialEq)]
pub enum CardMedia {
    Redirect {
        url: String,
        ie_key: Option<&'static str>,
    },
    Media(PendingMedia),
}

/// Typed access to `binding_values`.
///
/// Each binding is `{"type": "STRING", "string_value": ...}`; the value lives
/// under `<lowercased type>_value`. GraphQL responses send the same bindings as
/// a `[{"key": .., "value": {..}}]` list, which is accepted too.
#[derive(Debug, Clone, Copy)]
pub struct Bindings<'v>(Option<&'v Value>);

impl<'v> Bindings<'v> {
    pub fn of(card: &'v Value) -> Self {
        Bindings(card.get("binding_values"))
    }

    fn binding(&self, key: &str) -> Option<&'v Value> {
        match self.0? {
            Value::Object(map) => map.get(key),
            Value::Array(items) => items
                .iter()
                .find(|b| b.get("key").and_then(Value::as_str) == Some(key))
                .and_then(|b| b.get("value")),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&'v Value> {
        let binding = self.binding(key)?;
        let kind = binding.get("type")?.as_str()?.to_ascii_lowercase();
        binding.get(format!("{kind}_value")).filter(|v| !v.is_null())
    }

    pub fn string(&self, key: &str) -> Option<&'v str> {
        self.get(key)?.as_str()
    }
}

const THUMBNAIL_SUFFIXES: [(&str, &str); 5] = [
    ("_small", "small"),
    ("", "medium"),
    ("_large", "large"),
    ("_x_large", "x_large"),
    ("_original", "original"),
];

/// Map a status' `card` object to its media contributions.
pub fn card_media(card: &Value, twid: &str) -> Vec<CardMedia> {
    let name = card.get("name").and_then(Value::as_str).unwrap_or_default();
    let kind = Card::from_name(name);
    let bindings = Bindings::of(card);
    let card_url = card.get("url").and_then(Value::as_str).unwrap_or("-");
    tracing::debug!(card_url, ?kind, "Extracting from card info");

    let redirect = |url: Option<&str>, ie_key: Option<&'static str>| {
        match url.and_then(url_or_none) {
            Some(url) => vec![CardMedia::Redirect {
                url: url.to_string(),
                ie_key,
            }],
            None => {
                tracing::warn!(?kind, "card has no usable link, skipping");
                Vec::new()
            }
        }
    };

    match &kind {
        Card::Player => redirect(bindings.string("player_url"), None),
        Card::PeriscopeBroadcast => redirect(
            bindings
                .string("url")
                .or_else(|| bindings.string("player_url")),
            Some("Periscope"),
        ),
        Card::Broadcast => redirect(bindings.string("broadcast_url"), Some("TwitterBroadcast")),
        Card::AudioSpace => {
            let url = bindings
                .string("id")
                .map(|id| format!("https://twitter.com/i/spaces/{id}"));
            redirect(url.as_deref(), Some("TwitterSpaces"))
        }
        Card::Summary => redirect(bindings.string("card_url"), None),
        Card::UnifiedCard => unified_card_media(&bindings, twid),
        Card::Amplify | Card::Unrecognized(_) => {
            vec![CardMedia::Media(stream_media(&kind, &bindings, twid))]
        }
    }
}

fn unified_card_media(bindings: &Bindings<'_>, twid: &str) -> Vec<CardMedia> {
    let Some(raw) = bindings.string("unified_card") else {
        tracing::warn!(twid, "unified card without payload");
        return Vec::new();
    };
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(twid, error = %e, "unified card payload is not JSON");
            return Vec::new();
        }
    };
    objects_at(&parsed, path!["media_entities"])
        .into_iter()
        .map(|m| CardMedia::Media(media_info_from_video(m)))
        .collect()
}

/// Amplify and every unrecognised card: formats come from a VMAP manifest.
fn stream_media(kind: &Card, bindings: &Bindings<'_>, twid: &str) -> PendingMedia {
    let is_amplify = matches!(kind, Card::Amplify);
    let vmap_url = if is_amplify {
        bindings.string("amplify_url_vmap")
    } else {
        bindings.string("player_stream_url")
    };
    let content_id = bindings
        .string(if is_amplify {
            "amplify_content_id"
        } else {
            "player_content_id"
        })
        .unwrap_or(twid);

    let thumbnails = THUMBNAIL_SUFFIXES
        .iter()
        .filter_map(|(suffix, id)| {
            let image = bindings.get(&format!("player_image{suffix}"))?;
            let url = image.get("url")?.as_str()?;
            if url.contains("/player-placeholder") {
                return None;
            }
            Some(Thumbnail {
                id: (*id).to_string(),
                url: url.to_string(),
                width: dimension(image.get("width")),
                height: dimension(image.get("height")),
            })
        })
        .collect();

    let source = match vmap_url.and_then(url_or_none) {
        Some(url) => FormatSource::Vmap {
            url: url.to_string(),
            content_id: content_id.to_string(),
        },
        None => FormatSource::Nothing,
    };

    PendingMedia {
        media: MediaInfo {
            thumbnails,
            duration: bindings
                .get("content_duration_seconds")
                .and_then(int_or_none)
                .map(|s| s as f64),
            ..Default::default()
        },
        source,
    }
}

fn dimension(v: Option<&Value>) -> Option<u32> {
    v.and_then(int_or_none).and_then(|n| u32::try_from(n).ok())
}

/// True for a card object worth dispatching on (present and non-empty).
pub fn has_card(status: &Value) -> bool {
    get(status, path!["card"])
        .and_then(Value::as_object)
        .is_some_and(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_binding(v: &str) -> Value {
        json!({"type": "STRING", "string_value": v})
    }

    #[test]
    fn names_dispatch_on_last_segment() {
        assert_eq!(Card::from_name("745291183405076480:broadcast"), Card::Broadcast);
        assert_eq!(Card::from_name("player"), Card::Player);
        assert_eq!(Card::from_name("amplify"), Card::Amplify);
        assert_eq!(
            Card::from_name("poll2choice_video"),
            Card::Unrecognized("poll2choice_video".into())
        );
    }

    #[test]
    fn bindings_read_typed_values_in_both_layouts() {
        let legacy = json!({"binding_values": {"player_url": string_binding("https://p.example/1")}});
        assert_eq!(
            Bindings::of(&legacy).string("player_url"),
            Some("https://p.example/1")
        );

        let graphql = json!({"binding_values": [
            {"key": "player_url", "value": string_binding("https://p.example/2")}
        ]});
        assert_eq!(
            Bindings::of(&graphql).string("player_url"),
            Some("https://p.example/2")
        );
        assert!(Bindings::of(&json!({})).get("player_url").is_none());
    }

    #[test]
    fn player_card_redirects() {
        let card = json!({
            "name": "player",
            "binding_values": {"player_url": string_binding("https://www.youtube.com/embed/abc")}
        });
        assert_eq!(
            card_media(&card, "1"),
            vec![CardMedia::Redirect {
                url: "https://www.youtube.com/embed/abc".into(),
                ie_key: None
            }]
        );
    }

    #[test]
    fn periscope_falls_back_to_player_url() {
        let card = json!({
            "name": "periscope_broadcast",
            "binding_values": {"player_url": string_binding("https://www.pscp.tv/w/1abc")}
        });
        assert_eq!(
            card_media(&card, "1"),
            vec![CardMedia::Redirect {
                url: "https://www.pscp.tv/w/1abc".into(),
                ie_key: Some("Periscope")
            }]
        );
    }

    #[test]
    fn audiospace_builds_spaces_url() {
        let card = json!({
            "name": "3691233323:audiospace",
            "binding_values": {"id": string_binding("1OwxWwQOPlNxQ")}
        });
        assert_eq!(
            card_media(&card, "1"),
            vec![CardMedia::Redirect {
                url: "https://twitter.com/i/spaces/1OwxWwQOPlNxQ".into(),
                ie_key: Some("TwitterSpaces")
            }]
        );
    }

    #[test]
    fn summary_and_broadcast_redirect() {
        let summary = json!({
            "name": "summary",
            "binding_values": {"card_url": string_binding("https://example.com/article")}
        });
        assert!(matches!(
            &card_media(&summary, "1")[..],
            [CardMedia::Redirect { url, ie_key: None }] if url == "https://example.com/article"
        ));

        let broadcast = json!({
            "name": "745291183405076480:broadcast",
            "binding_values": {"broadcast_url": string_binding("https://twitter.com/i/broadcasts/1")}
        });
        assert!(matches!(
            &card_media(&broadcast, "1")[..],
            [CardMedia::Redirect { ie_key: Some("TwitterBroadcast"), .. }]
        ));
    }

    #[test]
    fn redirect_without_link_is_skipped() {
        let card = json!({"name": "player", "binding_values": {}});
        assert!(card_media(&card, "1").is_empty());
    }

    #[test]
    fn unknown_cards_use_player_stream_and_skip_placeholders() {
        let card = json!({
            "name": "poll2choice_video",
            "binding_values": {
                "player_stream_url": string_binding("https://video.twimg.com/vmap/1.vmap"),
                "player_content_id": string_binding("content-9"),
                "content_duration_seconds": string_binding("31"),
                "player_image_small": {"type": "IMAGE", "image_value": {
                    "url": "https://pbs.twimg.com/small.jpg", "width": 144, "height": 81}},
                "player_image": {"type": "IMAGE", "image_value": {
                    "url": "https://abs.twimg.com/player-placeholder.png", "width": 1, "height": 1}},
                "player_image_original": {"type": "IMAGE", "image_value": {
                    "url": "https://pbs.twimg.com/orig.jpg", "width": 1920, "height": 1080}}
            }
        });
        let media = card_media(&card, "777");
        let [CardMedia::Media(pending)] = &media[..] else {
            panic!("expected one stream entry, got {media:?}");
        };
        assert_eq!(
            pending.source,
            FormatSource::Vmap {
                url: "https://video.twimg.com/vmap/1.vmap".into(),
                content_id: "content-9".into()
            }
        );
        let ids: Vec<_> = pending.media.thumbnails.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["small", "original"]);
        assert_eq!(pending.media.thumbnails[1].width, Some(1920));
        assert_eq!(pending.media.duration, Some(31.0));
    }

    #[test]
    fn amplify_uses_its_own_bindings() {
        let card = json!({
            "name": "amplify",
            "binding_values": {
                "amplify_url_vmap": string_binding("https://amp.twimg.com/v/1.vmap"),
                "player_stream_url": string_binding("https://wrong.example/vmap")
            }
        });
        let media = card_media(&card, "555");
        let [CardMedia::Media(pending)] = &media[..] else {
            panic!("expected one stream entry");
        };
        assert_eq!(
            pending.source,
            FormatSource::Vmap {
                url: "https://amp.twimg.com/v/1.vmap".into(),
                content_id: "555".into()
            }
        );
    }

    #[test]
    fn unified_card_maps_nested_media() {
        let nested = json!({
            "media_entities": {
                "13": {
                    "id_str": "13",
                    "type": "video",
                    "video_info": {"variants": [
                        {"content_type": "video/mp4", "bitrate": 832000, "url": "https://video.twimg.com/v/640x360/a.mp4"}
                    ]}
                }
            }
        })
        .to_string();
        let card = json!({
            "name": "unified_card",
            "binding_values": {"unified_card": string_binding(&nested)}
        });
        let media = card_media(&card, "1");
        let [CardMedia::Media(pending)] = &media[..] else {
            panic!("expected one nested entry");
        };
        assert_eq!(pending.media.media_id.as_deref(), Some("13"));
        assert!(matches!(&pending.source, FormatSource::Variants(v) if v.len() == 1));
    }

    #[test]
    fn empty_cards_are_ignored() {
        assert!(!has_card(&json!({"card": {}})));
        assert!(!has_card(&json!({})));
        assert!(has_card(&json!({"card": {"name": "summary"}})));
    }
}

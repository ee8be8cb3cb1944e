//! Format discovery from variant objects, HLS master playlists and VMAP documents.
//!
//! Everything here is a pure parser; fetching the documents is left to the
//! stock extractor.
use regex::Regex;
use serde_json::{Value, json};
use std::sync::LazyLock;
use url::Url;

use crate::twitter::record::{Format, FormatSet, Protocol, Subtitle};
use crate::twitter::traverse::int_or_none;

static HLS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Z0-9-]+)=("[^"]*"|[^",]*)"#).expect("hls attribute pattern compiles")
});
static AUDIO_BITRATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^hls-[Aa]udio-(\d{4,})").expect("audio bitrate pattern compiles"));
static DIMENSIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)x(\d+)/").expect("dimension pattern compiles"));
static VMAP_VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<tw:videoVariant\b([^>]*)>").expect("vmap pattern compiles"));
static XML_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w:-]+)\s*=\s*"([^"]*)""#).expect("xml attribute pattern compiles"));
static MEDIA_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<MediaFile\b[^>]*>\s*(?:<!\[CDATA\[(.*?)\]\]>|([^<]*))\s*</MediaFile>")
        .expect("media file pattern compiles")
});

/// True when a variant URL points at an HLS playlist.
pub fn is_hls(url: &str) -> bool {
    url.contains(".m3u8")
}

/// A non-HLS variant becomes one progressive format.
///
/// Bitrate comes from `bitrate` or `bit_rate` (bit/s); width and height are
/// read from a `/<w>x<h>/` path segment when present.
pub fn progressive_format(variant: &Value) -> Option<Format> {
    let url = variant.get("url")?.as_str().filter(|u| !u.is_empty())?;
    let kbps = ["bitrate", "bit_rate"]
        .iter()
        .find_map(|k| variant.get(*k).and_then(int_or_none))
        .map(|b| b / 1000)
        .filter(|b| *b > 0);
    let (width, height) = dimensions_in_url(url);
    Some(Format {
        format_id: match kbps {
            Some(k) => format!("http-{k}"),
            None => "http".to_string(),
        },
        url: url.to_string(),
        ext: extension_in_url(url).unwrap_or_else(|| "mp4".into()),
        protocol: Protocol::Https,
        tbr: kbps.map(|k| k as f64),
        width,
        height,
        audio_only: false,
    })
}

fn dimensions_in_url(url: &str) -> (Option<u32>, Option<u32>) {
    match DIMENSIONS.captures(url) {
        Some(c) => (c[1].parse().ok(), c[2].parse().ok()),
        None => (None, None),
    }
}

fn extension_in_url(url: &str) -> Option<String> {
    let path = Url::parse(url).ok()?.path().to_string();
    let (_, ext) = path.rsplit_once('/')?.1.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 5).then(|| ext.to_ascii_lowercase())
}

fn hls_attributes(raw: &str) -> Vec<(String, String)> {
    HLS_ATTR
        .captures_iter(raw)
        .map(|c| (c[1].to_string(), c[2].trim_matches('"').to_string()))
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .filter(|v| !v.is_empty())
}

fn join_url(base: &str, uri: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(uri))
        .map(String::from)
        .unwrap_or_else(|_| uri.to_string())
}

/// Parse an HLS master playlist fetched from `manifest_url`.
///
/// Video streams come from `EXT-X-STREAM-INF`, audio-only renditions and
/// subtitle tracks from `EXT-X-MEDIA`. A media playlist (no stream entries)
/// yields the manifest itself as a single format.
pub fn parse_hls_master(text: &str, manifest_url: &str) -> FormatSet {
    let mut set = FormatSet::default();
    let mut pending_stream: Option<Vec<(String, String)>> = None;
    let mut is_media_playlist = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(rest) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            pending_stream = Some(hls_attributes(rest));
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA:") {
            media_rendition(&hls_attributes(rest), manifest_url, &mut set);
        } else if line.starts_with("#EXTINF") {
            is_media_playlist = true;
        } else if line.starts_with('#') {
            continue;
        } else if let Some(attrs) = pending_stream.take() {
            let tbr = attr(&attrs, "BANDWIDTH")
                .or_else(|| attr(&attrs, "AVERAGE-BANDWIDTH"))
                .and_then(|b| b.parse::<f64>().ok())
                .map(|b| b / 1000.0);
            let (width, height) = attr(&attrs, "RESOLUTION")
                .and_then(|r| r.split_once('x'))
                .map(|(w, h)| (w.parse().ok(), h.parse().ok()))
                .unwrap_or((None, None));
            let label = match tbr {
                Some(t) => format!("{}", t as u64),
                None => set.formats.len().to_string(),
            };
            set.formats.push(Format {
                format_id: format!("hls-{label}"),
                url: join_url(manifest_url, line),
                ext: "mp4".into(),
                protocol: Protocol::Hls,
                tbr,
                width,
                height,
                audio_only: false,
            });
        }
    }

    if set.formats.is_empty() && is_media_playlist {
        set.formats.push(Format {
            format_id: "hls".into(),
            url: manifest_url.to_string(),
            ext: "mp4".into(),
            protocol: Protocol::Hls,
            tbr: None,
            width: None,
            height: None,
            audio_only: false,
        });
    }
    set
}

fn media_rendition(attrs: &[(String, String)], manifest_url: &str, set: &mut FormatSet) {
    let Some(uri) = attr(attrs, "URI") else {
        return;
    };
    let url = join_url(manifest_url, uri);
    match attr(attrs, "TYPE") {
        Some("AUDIO") => {
            let format_id = ["hls", attr(attrs, "GROUP-ID").unwrap_or(""), attr(attrs, "NAME").unwrap_or("")]
                .iter()
                .filter(|p| !p.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("-");
            let tbr = AUDIO_BITRATE
                .captures(&format_id)
                .and_then(|c| c[1].parse::<u64>().ok())
                .map(|b| (b / 1000) as f64);
            set.formats.push(Format {
                format_id,
                url,
                ext: "mp4".into(),
                protocol: Protocol::Hls,
                tbr,
                width: None,
                height: None,
                audio_only: true,
            });
        }
        Some("SUBTITLES") => {
            let lang = attr(attrs, "LANGUAGE").unwrap_or("und").to_string();
            set.subtitles.entry(lang).or_default().push(Subtitle {
                url,
                ext: "vtt".into(),
            });
        }
        _ => {}
    }
}

fn unescape_xml(raw: &str) -> String {
    raw.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Variants listed by a VMAP document, as variant objects ready for
/// [`progressive_format`] or HLS expansion.
///
/// The `<MediaFile>` URL is appended when it is not already one of the
/// variants.
pub fn parse_vmap(xml: &str) -> Vec<Value> {
    let mut urls = Vec::new();
    let mut variants = Vec::new();
    for caps in VMAP_VARIANT.captures_iter(xml) {
        let attrs: Vec<(String, String)> = XML_ATTR
            .captures_iter(&caps[1])
            .map(|c| (c[1].to_string(), unescape_xml(&c[2])))
            .collect();
        let lookup = |k: &str| attrs.iter().find(|(n, _)| n == k).map(|(_, v)| v.as_str());
        let Some(raw_url) = lookup("url") else {
            continue;
        };
        let url = percent_encoding::percent_decode_str(raw_url)
            .decode_utf8_lossy()
            .into_owned();
        urls.push(url.clone());
        let mut variant = json!({"url": url});
        if let Some(ct) = lookup("content_type") {
            variant["content_type"] = json!(ct);
        }
        if let Some(br) = lookup("bit_rate") {
            variant["bit_rate"] = json!(br);
        }
        variants.push(variant);
    }

    let media_file = MEDIA_FILE
        .captures(xml)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| unescape_xml(m.as_str().trim()))
        .filter(|u| !u.is_empty());
    if let Some(url) = media_file {
        if !urls.contains(&url) {
            variants.push(json!({"url": url}));
        }
    }
    variants
}

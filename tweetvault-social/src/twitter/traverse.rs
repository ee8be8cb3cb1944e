//! Optional-path traversal over loosely structured JSON.
//!
//! Status payloads nest the interesting fields several levels deep and omit
//! whole branches freely. [`get`] walks a path and answers `None` as soon as an
//! intermediate key or index is missing, so mapping code never has to match on
//! every level by hand.
//!
//! ```
//! use serde_json::json;
//! use tweetvault_social::path;
//! use tweetvault_social::twitter::traverse::{get, str_at};
//!
//! let status = json!({"entities": {"urls": [{"expanded_url": "https://example.com"}]}});
//! assert_eq!(
//!     str_at(&status, path!["entities", "urls", 0, "expanded_url"]),
//!     Some("https://example.com")
//! );
//! assert!(get(&status, path!["entities", "hashtags", 0]).is_none());
//! ```
use serde_json::Value;

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg<'a> {
    Key(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for Seg<'a> {
    fn from(k: &'a str) -> Self {
        Seg::Key(k)
    }
}

impl From<usize> for Seg<'_> {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// Build a `&[Seg]` from keys and indices: `path!["user", "name"]`.
#[macro_export]
macro_rules! path {
    ($($seg:expr),* $(,)?) => {
        &[$($crate::twitter::traverse::Seg::from($seg)),*][..]
    };
}

/// Walk `path` from `value`. Explicit JSON `null` at the end is returned as-is;
/// the typed helpers below treat it as absent.
pub fn get<'v>(value: &'v Value, path: &[Seg<'_>]) -> Option<&'v Value> {
    path.iter().try_fold(value, |cur, seg| match seg {
        Seg::Key(k) => cur.as_object()?.get(*k),
        Seg::Index(i) => cur.as_array()?.get(*i),
    })
}

pub fn str_at<'v>(value: &'v Value, path: &[Seg<'_>]) -> Option<&'v str> {
    get(value, path)?.as_str()
}

pub fn int_at(value: &Value, path: &[Seg<'_>]) -> Option<u64> {
    get(value, path).and_then(int_or_none)
}

/// Non-negative integers, including numeric strings ("1234") and whole floats.
pub fn int_or_none(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Floats, including numeric strings.
pub fn float_or_none(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings as-is, numbers rendered; ids come as either.
pub fn string_or_none(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The value if it looks like an absolute http(s) URL.
pub fn url_or_none(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")).then_some(trimmed)
}

/// Every object reachable as an element of the array (or value of the map) at `path`.
pub fn objects_at<'v>(value: &'v Value, path: &[Seg<'_>]) -> Vec<&'v Value> {
    match get(value, path) {
        Some(Value::Array(items)) => items.iter().filter(|v| v.is_object()).collect(),
        Some(Value::Object(map)) => map.values().filter(|v| v.is_object()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_intermediate_keys_are_absent() {
        let v = json!({"a": {"b": 1}});
        assert!(get(&v, path!["a", "x", "y"]).is_none());
        assert!(get(&v, path!["a", "b", "c"]).is_none());
        assert!(get(&v, path!["a", 0]).is_none());
    }

    #[test]
    fn indexes_into_arrays() {
        let v = json!({"list": [{"n": "zero"}, {"n": "one"}]});
        assert_eq!(str_at(&v, path!["list", 1, "n"]), Some("one"));
        assert!(get(&v, path!["list", 2]).is_none());
    }

    #[test]
    fn ints_accept_numeric_strings() {
        assert_eq!(int_or_none(&json!("1234")), Some(1234));
        assert_eq!(int_or_none(&json!(12)), Some(12));
        assert_eq!(int_or_none(&json!(12.0)), Some(12));
        assert_eq!(int_or_none(&json!("twelve")), None);
        assert_eq!(int_or_none(&json!(null)), None);
    }

    #[test]
    fn ids_render_numbers() {
        assert_eq!(string_or_none(&json!(42)), Some("42".into()));
        assert_eq!(string_or_none(&json!("42")), Some("42".into()));
        assert_eq!(string_or_none(&json!({})), None);
    }

    #[test]
    fn url_filter_requires_scheme() {
        assert_eq!(url_or_none("https://a.b/c"), Some("https://a.b/c"));
        assert_eq!(url_or_none("a.b/c"), None);
    }

    #[test]
    fn objects_from_arrays_and_maps() {
        let v = json!({"arr": [{"k": 1}, 2], "map": {"x": {"k": 2}, "y": "str"}});
        assert_eq!(objects_at(&v, path!["arr"]).len(), 1);
        assert_eq!(objects_at(&v, path!["map"]).len(), 1);
        assert!(objects_at(&v, path!["none"]).is_empty());
    }
}

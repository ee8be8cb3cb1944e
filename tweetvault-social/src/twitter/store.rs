//! Media persistence for the session adapter.
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use tweetvault_common::{Result, VaultError};
use tweetvault_http::{HttpClient, RequestOpts};

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern compiles"));

/// Downloads a media URL and stores it under a suggested file name.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Returns the file name the media was stored under.
    async fn download_to_file(
        &self,
        url: &str,
        suggested_name: &str,
        context_url: &str,
    ) -> Result<String>;
}

/// Writes media under a root directory.
pub struct FsMediaStore {
    root: PathBuf,
    http: HttpClient,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>, http: HttpClient) -> Self {
        Self {
            root: root.into(),
            http,
        }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn download_to_file(
        &self,
        url: &str,
        suggested_name: &str,
        context_url: &str,
    ) -> Result<String> {
        let bytes = self
            .http
            .get_bytes(url, RequestOpts::absolute())
            .await
            .map_err(|e| VaultError::Network(e.to_string()))?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(suggested_name);
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!(
            file = %path.display(),
            bytes = bytes.len(),
            context = context_url,
            "media stored"
        );
        Ok(suggested_name.to_string())
    }
}

/// File extension (with the leading dot) for a MIME type.
pub fn guess_extension(mime_type: &str) -> Option<&'static str> {
    let parsed: mime::Mime = mime_type.trim().to_ascii_lowercase().parse().ok()?;
    let ext = match (parsed.type_().as_str(), parsed.subtype().as_str()) {
        ("image", "jpeg" | "jpg" | "pjpeg") => ".jpg",
        ("image", "png") => ".png",
        ("image", "gif") => ".gif",
        ("image", "webp") => ".webp",
        ("video", "mp4") => ".mp4",
        ("video", "webm") => ".webm",
        ("video", "quicktime") => ".mov",
        ("application", "x-mpegurl" | "vnd.apple.mpegurl") => ".m3u8",
        ("audio", "mp4" | "x-m4a") => ".m4a",
        ("audio", "mpeg") => ".mp3",
        _ => return None,
    };
    Some(ext)
}

/// Lowercase `text` and collapse every run of non-alphanumerics into `-`.
pub fn slugify(text: &str) -> String {
    NON_SLUG
        .replace_all(&text.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn extensions_for_common_media() {
        assert_eq!(guess_extension("image/jpeg"), Some(".jpg"));
        assert_eq!(guess_extension("video/mp4"), Some(".mp4"));
        assert_eq!(guess_extension("application/x-mpegURL"), Some(".m3u8"));
        assert_eq!(guess_extension("video/mp4; codecs=avc1"), Some(".mp4"));
        assert_eq!(guess_extension("application/octet-stream"), None);
        assert_eq!(guess_extension("not a mime"), None);
    }

    #[test]
    fn slugs_are_filesystem_safe() {
        assert_eq!(
            slugify("https://x.com/User/status/123"),
            "https-x-com-user-status-123"
        );
        assert_eq!(slugify("--Hello, World!--"), "hello-world");
    }

    #[tokio::test]
    async fn fs_store_writes_bytes_under_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg-bytes".to_vec()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let http = HttpClient::new(&server.uri()).unwrap();
        let store = FsMediaStore::new(dir.path().join("media"), http);
        let name = store
            .download_to_file(
                &format!("{}/media/a.jpg", server.uri()),
                "tweet_0.jpg",
                "https://x.com/u/status/1",
            )
            .await
            .unwrap();

        assert_eq!(name, "tweet_0.jpg");
        let written = std::fs::read(dir.path().join("media").join("tweet_0.jpg")).unwrap();
        assert_eq!(written, b"jpeg-bytes");
    }

    #[tokio::test]
    async fn failed_media_fetch_is_a_network_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/b.mp4"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let http = HttpClient::new(&server.uri()).unwrap();
        let store = FsMediaStore::new(dir.path(), http);
        let err = store
            .download_to_file(
                &format!("{}/media/b.mp4", server.uri()),
                "tweet_0.mp4",
                "https://x.com/u/status/1",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, VaultError::Network(_)));
        assert!(!dir.path().join("tweet_0.mp4").exists());
    }
}

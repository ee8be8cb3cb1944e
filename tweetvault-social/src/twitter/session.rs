//! Session adapter: logs in once, then turns status URLs into archived tweets
//! with their media persisted through a [`MediaStore`].
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, LazyLock};
use time::OffsetDateTime;
use tweetvault_common::{Result, VaultError};
use tweetvault_http::HttpClient;

use crate::twitter::locator::{StatusLocator, canonicalize, is_short_link};
use crate::twitter::mapping::with_query_param;
use crate::twitter::store::{MediaStore, guess_extension, slugify};
use crate::twitter::types::{Media, MediaKind, Tweet};

pub const SESSION_STATUS: &str = "twitter-session";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{[^}]*\}").expect("placeholder pattern compiles"));

/// Account credentials. All three are required.
#[derive(Clone)]
pub struct SessionCredentials {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

impl SessionCredentials {
    /// Fails with [`VaultError::Config`] when any value is missing, blank or
    /// still an unexpanded `${VAR}` reference.
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        email: Option<String>,
    ) -> Result<Self> {
        fn required(name: &str, value: Option<String>) -> Result<String> {
            let value = value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| VaultError::Config(format!("twitter_session requires `{name}`")))?;
            if PLACEHOLDER.is_match(&value) {
                return Err(VaultError::Config(format!(
                    "twitter_session `{name}` references an unset environment variable"
                )));
            }
            Ok(value)
        }
        Ok(Self {
            username: required("username", username)?,
            password: required("password", password)?,
            email: required("email", email)?,
        })
    }
}

/// The platform API as the session adapter sees it.
#[async_trait]
pub trait TweetClient: Send + Sync {
    async fn login(&self, credentials: &SessionCredentials) -> Result<()>;
    async fn tweet_by_id(&self, id: &str) -> Result<Tweet>;
}

/// Follows redirects and reports the final URL.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn fetch_url(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl LinkResolver for HttpClient {
    async fn fetch_url(&self, url: &str) -> Result<String> {
        self.resolve_final_url(url)
            .await
            .map(String::from)
            .map_err(|e| VaultError::Network(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedMedia {
    pub src: String,
    pub mime_type: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedTweet {
    pub status: &'static str,
    pub url: String,
    pub content: String,
    pub title: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    pub media: Vec<ArchivedMedia>,
}

pub struct TwitterSession {
    client: Arc<dyn TweetClient>,
    resolver: Arc<dyn LinkResolver>,
    store: Arc<dyn MediaStore>,
}

impl TwitterSession {
    /// Log in once; the session is reused for every later download.
    pub async fn connect(
        client: Arc<dyn TweetClient>,
        resolver: Arc<dyn LinkResolver>,
        store: Arc<dyn MediaStore>,
        credentials: &SessionCredentials,
    ) -> Result<Self> {
        client.login(credentials).await?;
        tracing::info!(username = %credentials.username, "twitter session ready");
        Ok(Self {
            client,
            resolver,
            store,
        })
    }

    /// Expand a `t.co` link (keeping it as-is when that fails), then
    /// canonicalize.
    pub async fn sanitize_url(&self, url: &str) -> String {
        let mut url = url.to_string();
        if is_short_link(&url) {
            match self.resolver.fetch_url(&url).await {
                Ok(expanded) => {
                    tracing::debug!(from = %url, to = %expanded, "expanded short link");
                    url = expanded;
                }
                Err(e) => {
                    tracing::error!(url = %url, error = %e, "failed to expand short link");
                }
            }
        }
        canonicalize(&url)
    }

    /// `Ok(None)` when the URL is not a status locator.
    pub async fn download(&self, url: &str) -> Result<Option<ArchivedTweet>> {
        let url = self.sanitize_url(url).await;
        let Some(locator) = StatusLocator::parse(&url) else {
            tracing::debug!(url = %url, "not a status url, skipping");
            return Ok(None);
        };

        let tweet = self.client.tweet_by_id(&locator.tweet_id).await?;
        let screen_name = tweet
            .user
            .as_ref()
            .map(|u| u.screen_name.as_str())
            .unwrap_or(locator.handle.as_str());
        let text = tweet.text().to_string();

        let mut media = Vec::new();
        for (i, item) in tweet.media().iter().enumerate() {
            let Some((src, mime_type)) = media_source(item) else {
                continue;
            };
            let ext = guess_extension(&mime_type).unwrap_or_default();
            let suggested = format!("{}_{i}{ext}", slugify(&url));
            let filename = self.store.download_to_file(&src, &suggested, &url).await?;
            media.push(ArchivedMedia {
                src,
                mime_type,
                filename,
            });
        }

        tracing::info!(
            tweet_id = %locator.tweet_id,
            media = media.len(),
            "archived tweet"
        );
        Ok(Some(ArchivedTweet {
            status: SESSION_STATUS,
            title: format!("{screen_name} - {text}"),
            content: text,
            timestamp: tweet.created_at(),
            url,
            media,
        }))
    }
}

/// Download URL and MIME type for one attached media item.
fn media_source(media: &Media) -> Option<(String, String)> {
    match media.kind {
        MediaKind::Photo => match media.media_url_https.as_deref() {
            Some(url) => Some((best_quality_url(url), "image/jpeg".to_string())),
            None => {
                tracing::warn!(media_id = ?media.id_str, "photo without url, skipping");
                None
            }
        },
        MediaKind::Video => {
            // first variant wins a bitrate tie
            let best = media
                .variants()
                .iter()
                .filter(|v| v.bitrate.is_some())
                .reduce(|best, v| if v.bitrate > best.bitrate { v } else { best });
            if best.is_none() {
                tracing::warn!(media_id = ?media.id_str, "video without bitrate variants, skipping");
            }
            best.map(|v| (v.url.clone(), v.content_type.clone()))
        }
        MediaKind::AnimatedGif => media
            .variants()
            .first()
            .map(|v| (v.url.clone(), v.content_type.clone())),
        MediaKind::Other => {
            tracing::warn!(media_id = ?media.id_str, "unsupported media type, skipping");
            None
        }
    }
}

/// Ask the image CDN for the original resolution.
pub fn best_quality_url(url: &str) -> String {
    with_query_param(url, "name", "orig")
}

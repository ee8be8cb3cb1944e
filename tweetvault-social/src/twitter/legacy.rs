//! Stock extractor backed by the legacy (v1.1) web API.
//!
//! Requests authenticate with the public web bearer plus a guest token that
//! is activated once and cached. The same client serves the session adapter
//! ([`TweetClient`]) and the patched extractor ([`StockExtractor`]).
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::borrow::Cow;
use tokio::sync::RwLock;
use tweetvault_common::{Result, VaultError};
use tweetvault_http::{Auth, HeaderMap, HeaderValue, HttpClient, HttpError, RequestOpts};

use crate::twitter::extractor::StockExtractor;
use crate::twitter::manifest::{is_hls, parse_hls_master, parse_vmap, progressive_format};
use crate::twitter::record::FormatSet;
use crate::twitter::session::{SessionCredentials, TweetClient};
use crate::twitter::traverse::url_or_none;
use crate::twitter::types::Tweet;

/// Bearer token embedded in the public web client.
pub const WEB_BEARER: &str = "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA";

#[derive(Debug, Deserialize)]
struct GuestActivation {
    guest_token: String,
}

fn network(e: HttpError) -> VaultError {
    VaultError::Network(e.to_string())
}

pub struct LegacyApi {
    http: HttpClient,
    guest_token: RwLock<Option<String>>,
}

impl LegacyApi {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            guest_token: RwLock::new(None),
        }
    }

    /// Client anchored at `api_base` (e.g. `https://api.x.com/`).
    pub fn from_base(api_base: &str) -> Result<Self> {
        let http = HttpClient::new(api_base)
            .map_err(|e| VaultError::Config(format!("invalid api_base {api_base:?}: {e}")))?;
        Ok(Self::new(http))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Activate a fresh guest token and cache it.
    pub async fn activate_guest(&self) -> Result<String> {
        let activation: GuestActivation = self
            .http
            .post_json_opts(
                "1.1/guest/activate.json",
                &json!({}),
                RequestOpts {
                    auth: Some(Auth::Bearer(WEB_BEARER)),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(network)?;
        tracing::debug!("guest token activated");
        *self.guest_token.write().await = Some(activation.guest_token.clone());
        Ok(activation.guest_token)
    }

    async fn guest_token(&self) -> Result<String> {
        if let Some(token) = self.guest_token.read().await.clone() {
            return Ok(token);
        }
        self.activate_guest().await
    }

    async fn status_json(&self, twid: &str) -> Result<Value> {
        let token = self.guest_token().await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-guest-token",
            HeaderValue::from_str(&token)
                .map_err(|e| VaultError::Malformed(format!("guest token: {e}")))?,
        );
        headers.insert("x-twitter-active-user", HeaderValue::from_static("yes"));

        let query: Vec<(&str, Cow<'_, str>)> = vec![
            ("cards_platform", "Web-12".into()),
            ("include_cards", "1".into()),
            ("include_reply_count", "1".into()),
            ("include_user_entities", "0".into()),
            ("tweet_mode", "extended".into()),
        ];
        let status: Value = self
            .http
            .get_json(
                &format!("1.1/statuses/show/{twid}.json"),
                RequestOpts {
                    auth: Some(Auth::Bearer(WEB_BEARER)),
                    headers: Some(headers),
                    query: Some(query),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(network)?;
        tracing::debug!(twid, "status fetched");
        Ok(status)
    }
}

#[async_trait]
impl TweetClient for LegacyApi {
    async fn login(&self, credentials: &SessionCredentials) -> Result<()> {
        self.activate_guest().await?;
        tracing::debug!(username = %credentials.username, "legacy api session started");
        Ok(())
    }

    async fn tweet_by_id(&self, id: &str) -> Result<Tweet> {
        let status = self.status_json(id).await?;
        Ok(serde_json::from_value(status)?)
    }
}

#[async_trait]
impl StockExtractor for LegacyApi {
    async fn fetch_status(&self, twid: &str) -> Result<Value> {
        self.status_json(twid).await
    }

    async fn variant_formats(&self, variant: &Value, twid: &str) -> Result<FormatSet> {
        let Some(url) = variant.get("url").and_then(Value::as_str).filter(|u| !u.is_empty()) else {
            return Ok(FormatSet::default());
        };
        if !is_hls(url) {
            return Ok(FormatSet {
                formats: progressive_format(variant).into_iter().collect(),
                ..Default::default()
            });
        }
        match self.http.get_text(url, RequestOpts::absolute()).await {
            Ok(text) => Ok(parse_hls_master(&text, url)),
            Err(e) => {
                tracing::warn!(twid, url, error = %e, "failed to fetch hls manifest");
                Ok(FormatSet::default())
            }
        }
    }

    async fn vmap_formats(&self, vmap_url: &str, content_id: &str) -> Result<FormatSet> {
        let Some(vmap_url) = url_or_none(vmap_url) else {
            return Ok(FormatSet::default());
        };
        let xml = self
            .http
            .get_text(vmap_url, RequestOpts::absolute())
            .await
            .map_err(network)?;
        let mut set = FormatSet::default();
        for variant in parse_vmap(&xml) {
            set.extend(self.variant_formats(&variant, content_id).await?);
        }
        Ok(set)
    }
}

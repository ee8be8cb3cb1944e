//! Patched metadata extractor.
//!
//! [`PatchedExtractor`] wraps a [`StockExtractor`] and swaps its
//! status-to-record mapping for a [`StatusMapper`]. Fetching the status and
//! expanding variants or VMAP manifests into formats stay with the stock
//! extractor; only the decision of what to return changes.
use async_trait::async_trait;
use serde_json::Value;
use tweetvault_common::{Result, VaultError};

use crate::twitter::locator::{StatusLocator, is_status_url};
use crate::twitter::mapping::{FormatSource, MappedStatus, PendingEntry, StatusRequest, map_status};
use crate::twitter::record::{Entry, EntryBody, Extraction, FormatSet, Playlist, merge_subtitles};

/// The extractor being patched.
#[async_trait]
pub trait StockExtractor: Send + Sync {
    /// Raw legacy status object for `twid`.
    async fn fetch_status(&self, twid: &str) -> Result<Value>;

    /// Formats for one `video_info.variants` entry.
    async fn variant_formats(&self, variant: &Value, twid: &str) -> Result<FormatSet>;

    /// Formats listed by a VMAP document.
    async fn vmap_formats(&self, vmap_url: &str, content_id: &str) -> Result<FormatSet>;
}

/// Strategy that maps a status to entries.
pub type StatusMapper = fn(&Value, &StatusRequest<'_>) -> Result<MappedStatus>;

pub struct PatchedExtractor<S> {
    stock: S,
    mapper: StatusMapper,
}

impl<S: StockExtractor> PatchedExtractor<S> {
    pub fn new(stock: S) -> Self {
        Self {
            stock,
            mapper: map_status,
        }
    }

    pub fn with_mapper(mut self, mapper: StatusMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn stock(&self) -> &S {
        &self.stock
    }

    pub fn suitable(url: &str) -> bool {
        is_status_url(url)
    }

    pub async fn extract(&self, locator: &str) -> Result<Extraction> {
        let parsed = StatusLocator::parse(locator)
            .ok_or_else(|| VaultError::UnsupportedLocator(locator.to_string()))?;
        let twid = parsed.tweet_id.as_str();
        let status = self.stock.fetch_status(twid).await?;
        let request = StatusRequest {
            twid,
            media_index: parsed.media_index,
        };

        match (self.mapper)(&status, &request)? {
            MappedStatus::Single(pending) => Ok(Extraction::Single(self.resolve(pending, twid).await?)),
            MappedStatus::Playlist { info, entries } => {
                let mut resolved = Vec::with_capacity(entries.len());
                for pending in entries {
                    resolved.push(self.resolve(pending, twid).await?);
                }
                tracing::debug!(twid, entries = resolved.len(), "playlist extracted");
                Ok(Extraction::Playlist(Playlist {
                    info,
                    entries: resolved,
                }))
            }
        }
    }

    async fn resolve(&self, pending: PendingEntry, twid: &str) -> Result<Entry> {
        let PendingEntry { mut entry, source } = pending;
        let found = match source {
            FormatSource::Nothing => FormatSet::default(),
            FormatSource::Variants(variants) => {
                let mut set = FormatSet::default();
                for variant in &variants {
                    set.extend(self.stock.variant_formats(variant, twid).await?);
                }
                set
            }
            FormatSource::Vmap { url, content_id } => {
                self.stock.vmap_formats(&url, &content_id).await?
            }
        };
        if let EntryBody::Video(media) = &mut entry.body {
            media.formats.extend(found.formats);
            merge_subtitles(&mut media.subtitles, found.subtitles);
        }
        Ok(entry)
    }
}

//! Builds the adapters named in the configuration.
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tweetvault_config::VaultConfig;
use tweetvault_social::twitter::session::{LinkResolver, TweetClient};
use tweetvault_social::twitter::store::{FsMediaStore, MediaStore};
use tweetvault_social::twitter::{LegacyApi, PatchedExtractor, SessionCredentials, TwitterSession};

/// Owns the loaded configuration and hands out adapters on demand.
pub struct Tether {
    cfg: VaultConfig,
}

impl Tether {
    pub fn new(cfg: VaultConfig) -> Self {
        Self { cfg }
    }

    /// Log in with the `twitter_session` archiver's credentials.
    pub async fn session(&self) -> Result<TwitterSession> {
        let spec = self
            .cfg
            .session()
            .ok_or_else(|| anyhow!("no `twitter_session` archiver configured"))?;
        let credentials = SessionCredentials::new(
            spec.username.clone(),
            spec.password.clone(),
            spec.email.clone(),
        )?;

        let api = Arc::new(LegacyApi::from_base(&spec.api_base)?);
        let http = api.http().clone();
        let client: Arc<dyn TweetClient> = api;
        let resolver: Arc<dyn LinkResolver> = Arc::new(http.clone());
        let store: Arc<dyn MediaStore> =
            Arc::new(FsMediaStore::new(self.cfg.storage.media_dir.clone(), http));

        TwitterSession::connect(client, resolver, store, &credentials)
            .await
            .context("twitter session login failed")
    }

    /// The patched extractor over the legacy API. Works without an explicit
    /// `twitter_extractor` entry, using the default API base.
    pub fn extractor(&self) -> Result<PatchedExtractor<LegacyApi>> {
        let api = match self.cfg.extractor() {
            Some(spec) => LegacyApi::from_base(&spec.api_base)?,
            None => LegacyApi::from_base(tweetvault_config::DEFAULT_API_BASE)?,
        };
        Ok(PatchedExtractor::new(api))
    }
}

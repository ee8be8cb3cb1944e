//! Loader for tweetvault configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, then `TWEETVAULT__`-prefixed
//! environment variables win (`TWEETVAULT__STORAGE__MEDIA_DIR=/srv/archive`).
//! String values may reference `${VAR}` placeholders, expanded recursively up
//! to [`MAXIMUM_ENV_EXPANSION_DEPTH`] hops.
//!
//! Credentials are optional in the schema; the session adapter reports missing
//! ones when it is constructed.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_API_BASE: &str = "https://api.x.com/";

#[derive(Debug, Deserialize)]
pub struct VaultConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub archivers: Vec<ArchiverSpec>,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl VaultConfig {
    fn enabled(&self) -> impl Iterator<Item = &ArchiverSpec> {
        self.archivers.iter().filter(|a| a.enabled.unwrap_or(true))
    }

    /// First enabled `twitter_session` archiver.
    pub fn session(&self) -> Option<&SessionConfig> {
        self.enabled().find_map(|a| match &a.details {
            ArchiverDetails::TwitterSession { config } => Some(config),
            _ => None,
        })
    }

    /// First enabled `twitter_extractor` archiver.
    pub fn extractor(&self) -> Option<&ExtractorConfig> {
        self.enabled().find_map(|a| match &a.details {
            ArchiverDetails::TwitterExtractor { config } => Some(config),
            _ => None,
        })
    }
}

/// Shared fields + the per-kind details.
#[derive(Debug, Deserialize)]
pub struct ArchiverSpec {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub details: ArchiverDetails,
}

/// The tag is `kind`; the payload lives in `config`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
pub enum ArchiverDetails {
    #[serde(rename = "twitter_session")]
    TwitterSession { config: SessionConfig },

    #[serde(rename = "twitter_extractor")]
    TwitterExtractor {
        #[serde(default)]
        config: ExtractorConfig,
    },
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: default_media_dir(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("archive")
}

/// `~/.config/tweetvault/tweetvault.yaml` (platform equivalent), if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tweetvault").join("tweetvault.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct VaultConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for VaultConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultConfigLoader {
    /// ```
    /// use tweetvault_config::VaultConfigLoader;
    ///
    /// let config = VaultConfigLoader::new()
    ///     .with_yaml_str("version: '1'\narchivers: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.session().is_none());
    /// assert_eq!(config.storage.media_dir.to_str(), Some("archive"));
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent (environment-only deployments).
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use tweetvault_config::{ArchiverDetails, VaultConfigLoader};
    ///
    /// let cfg = VaultConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// archivers:
    ///   - id: "extractor"
    ///     kind: "twitter_extractor"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(matches!(cfg.archivers[0].details, ArchiverDetails::TwitterExtractor { .. }));
    /// assert_eq!(cfg.extractor().unwrap().api_base, "https://api.x.com/");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder, expand `${VAR}` placeholders and deserialize.
    /// The environment overlay is added last so it overrides every file.
    pub fn load(self) -> Result<VaultConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(Environment::with_prefix("TWEETVAULT").separator("__"))
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("TV_USER", Some("archivist"), || {
            let mut v = json!("user-${TV_USER}");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("user-archivist"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("TV_A", Some("one")), ("TV_B", Some("two"))], || {
            let mut v = json!(["$TV_A", { "k": "${TV_A}-${TV_B}" }, 7, null]);
            expand_env_in_value(&mut v);
            assert_eq!(v, json!(["one", { "k": "one-two" }, 7, null]));
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("TV_INNER", Some("core")),
                ("TV_OUTER", Some("shell-${TV_INNER}")),
            ],
            || {
                let mut v = json!("x=${TV_OUTER}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("x=shell-core"));
            },
        );
    }

    #[test]
    fn cycles_terminate() {
        temp_env::with_vars([("TV_X", Some("${TV_Y}")), ("TV_Y", Some("${TV_X}"))], || {
            let mut v = json!("a=${TV_X}");
            expand_env_in_value(&mut v);
            assert!(v.as_str().unwrap().contains("${"));
        });
    }

    #[test]
    fn missing_credentials_still_load() {
        let cfg = VaultConfigLoader::new()
            .with_yaml_str(
                r#"
archivers:
  - id: session
    kind: twitter_session
    config:
      username: "someone"
"#,
            )
            .load()
            .unwrap();
        let session = cfg.session().unwrap();
        assert_eq!(session.username.as_deref(), Some("someone"));
        assert!(session.password.is_none());
        assert_eq!(session.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn disabled_archivers_are_skipped() {
        let cfg = VaultConfigLoader::new()
            .with_yaml_str(
                r#"
archivers:
  - id: off
    enabled: false
    kind: twitter_extractor
    config:
      api_base: "http://disabled/"
  - id: on
    kind: twitter_extractor
    config:
      api_base: "http://enabled/"
"#,
            )
            .load()
            .unwrap();
        assert_eq!(cfg.extractor().unwrap().api_base, "http://enabled/");
    }
}

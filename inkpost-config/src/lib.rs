//! Loader for the `inkpost.yaml` workspace configuration.
//!
//! Sources merge in order: the config file, then `INKPOST_`-prefixed
//! environment variables (with `__` as the section separator). `${VAR}`
//! placeholders in string values are expanded recursively after the merge,
//! so secrets never have to live in the file itself.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct InkpostConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    pub platforms: Vec<PlatformEntry>,
}

impl InkpostConfig {
    /// Look up a platform entry by id, enabled ones only.
    pub fn platform(&self, id: &str) -> Option<&PlatformEntry> {
        self.platforms
            .iter()
            .find(|p| p.id == id && p.enabled.unwrap_or(true))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    pub headless: bool,
    /// Chrome profile directory, persisted across runs so credential state
    /// survives restarts.
    pub user_data_dir: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: false,
            user_data_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory scanned for markdown posts; filenames are the stable ids.
    pub posts_dir: String,
    pub publish_log: String,
    /// Where credential artifacts (cookies + storage dumps) are kept.
    pub credentials_dir: String,
    /// Where timeout screenshots and document dumps land.
    pub diagnostics_dir: String,
    /// How long to wait for a human to finish an interactive login.
    pub login_timeout_secs: u64,
    pub pacing: PacingConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            posts_dir: "posts".into(),
            publish_log: "publish_log.json".into(),
            credentials_dir: ".inkpost/credentials".into(),
            diagnostics_dir: "logs".into(),
            login_timeout_secs: 300,
            pacing: PacingConfig::default(),
        }
    }
}

/// Inter-item delay ranges in seconds. Post-failure pauses are shorter so a
/// misconfigured selector surfaces quickly across the batch.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub success_min_secs: u64,
    pub success_max_secs: u64,
    pub failure_min_secs: u64,
    pub failure_max_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            success_min_secs: 300,
            success_max_secs: 600,
            failure_min_secs: 60,
            failure_max_secs: 120,
        }
    }
}

/// Shared fields + the per-platform details.
#[derive(Debug, Deserialize)]
pub struct PlatformEntry {
    pub id: String,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub details: PlatformDetails,
}

/// The tag is `platform`; the payload lives in `config`.
#[derive(Debug, Deserialize)]
#[serde(tag = "platform")]
pub enum PlatformDetails {
    #[serde(rename = "csdn")]
    Csdn {
        #[serde(default)]
        config: CsdnOptions,
    },

    #[serde(rename = "zhihu")]
    Zhihu {
        #[serde(default)]
        config: ZhihuOptions,
    },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CsdnOptions {
    /// Tags typed into the confirmation modal. The platform requires at
    /// least one, hence the non-empty default.
    pub tags: Vec<String>,
}

impl Default for CsdnOptions {
    fn default() -> Self {
        Self {
            tags: vec!["人工智能".into()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ZhihuOptions {
    /// Editors backed by an internal document model drop bulk key-sends;
    /// per-character typing is the safe default here.
    pub per_char_typing: bool,
}

impl Default for ZhihuOptions {
    fn default() -> Self {
        Self {
            per_char_typing: true,
        }
    }
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

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct InkpostConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for InkpostConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl InkpostConfigLoader {
    /// Start with the defaults: `INKPOST_` env overrides, files on top.
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("INKPOST").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by
    /// suffix. Missing files are an error so typos surface immediately.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self.builder.add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use inkpost_config::{InkpostConfigLoader, PlatformDetails};
    ///
    /// let cfg = InkpostConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// platforms:
    ///   - id: "csdn"
    ///     platform: "csdn"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert!(matches!(cfg.platforms[0].details, PlatformDetails::Csdn { .. }));
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded (recursively, depth-capped) before
    /// the strongly typed structs are materialised.
    pub fn load(self) -> Result<InkpostConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: InkpostConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

const APP_DIR: &str = "digest-reader";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub claude_api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub digest: DigestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items taken from the head of each feed per run; bounds model spend.
    pub max_items_per_fetch: usize,
    pub feed_concurrency: usize,
    pub model_timeout_secs: u64,
    pub max_input_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_items_per_fetch: 5,
            feed_concurrency: 1,
            model_timeout_secs: 90,
            max_input_chars: 12_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub min_content_chars: usize,
    pub substantial_paragraph_chars: usize,
    /// Hostname -> ordered CSS selectors, merged over the built-in table.
    pub domain_selectors: HashMap<String, Vec<String>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 100,
            substantial_paragraph_chars: 80,
            domain_selectors: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub window_days: i64,
    pub per_feed_cap: usize,
    pub max_articles: usize,
    pub summary_chars: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            per_feed_cap: 3,
            max_articles: 20,
            summary_chars: 600,
        }
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
        .join("news_aggregator.db")
        .to_string_lossy()
        .to_string()
}

fn default_model() -> String {
    crate::ai::DEFAULT_MODEL.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            claude_api_key: None,
            model: default_model(),
            log_level: default_log_level(),
            pipeline: PipelineConfig::default(),
            extractor: ExtractorConfig::default(),
            digest: DigestConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config at `path` (or the default location), writing defaults
    /// on first run.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)?
        } else {
            let config = Config::default();
            config.save(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// The model credential, from the file or the environment.
    pub fn api_key(&self) -> Result<String> {
        self.claude_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "no model credentials: set claude_api_key in {} or {}",
                    Self::config_path().display(),
                    API_KEY_ENV
                ))
            })
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.max_items_per_fetch == 0 {
            return Err(AppError::Config(
                "pipeline.max_items_per_fetch must be at least 1".into(),
            ));
        }
        if self.digest.window_days <= 0 {
            return Err(AppError::Config("digest.window_days must be positive".into()));
        }
        if self.digest.per_feed_cap == 0 || self.digest.max_articles == 0 {
            return Err(AppError::Config("digest caps must be at least 1".into()));
        }
        Ok(())
    }
}

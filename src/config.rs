use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable holding comma-separated API keys. Overrides
/// `youtube.api_keys` when it yields at least one key.
pub const API_KEYS_ENV: &str = "VPI_YOUTUBE_API_KEYS";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_keys: Vec::new(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}
fn default_page_size() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct PredictionConfig {
    #[serde(default = "default_prediction_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            url: default_prediction_url(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_prediction_url() -> String {
    "http://localhost:5001/predict/views".to_string()
}
fn default_concurrency() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
    #[serde(default = "default_user")]
    pub user: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
            user: default_user(),
        }
    }
}

fn default_history_path() -> PathBuf {
    PathBuf::from("./data/vpi.sqlite")
}
fn default_user() -> String {
    "local".to_string()
}

/// Split a comma-separated key list, dropping blank entries.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| k.to_string())
        .collect()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if let Ok(raw) = std::env::var(API_KEYS_ENV) {
        let keys = parse_key_list(&raw);
        if !keys.is_empty() {
            config.youtube.api_keys = keys;
        }
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(1..=50).contains(&config.youtube.page_size) {
        anyhow::bail!("youtube.page_size must be in [1, 50]");
    }
    if config.youtube.timeout_secs == 0 {
        anyhow::bail!("youtube.timeout_secs must be > 0");
    }
    if config.prediction.timeout_secs == 0 {
        anyhow::bail!("prediction.timeout_secs must be > 0");
    }
    if config.prediction.concurrency == 0 {
        anyhow::bail!("prediction.concurrency must be >= 1");
    }
    if config.history.user.trim().is_empty() {
        anyhow::bail!("history.user must not be empty");
    }
    Ok(())
}

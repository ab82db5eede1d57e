use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

const API_KEY_ENV: &str = "TUBE_DIGEST_LLM_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

/// Batch sizes, pauses and timeouts for one digest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub http_timeout_secs: u64,
    pub transcript_batch_size: usize,
    pub transcript_batch_pause_ms: u64,
    pub transcript_max_attempts: u32,
    pub transcript_retry_base_ms: u64,
    pub summary_group_size: usize,
    pub summary_batch_size: usize,
    pub summary_batch_pause_ms: u64,
    pub summary_call_pause_ms: u64,
    pub highlight_video_limit: usize,
    /// Demote summaries that are not exactly four lines to `llm_failed`.
    pub strict_summary_shape: bool,
    pub ai_titles: bool,
    pub ai_title_pause_ms: u64,
    /// Background jobs (headline backfill) allowed to run at once.
    pub background_job_limit: usize,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tube-digest");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("digest.db").to_string_lossy().to_string()
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 15,
            transcript_batch_size: 8,
            transcript_batch_pause_ms: 300,
            transcript_max_attempts: 3,
            transcript_retry_base_ms: 1000,
            summary_group_size: 5,
            summary_batch_size: 3,
            summary_batch_pause_ms: 2000,
            summary_call_pause_ms: 1000,
            highlight_video_limit: 12,
            strict_summary_shape: false,
            ai_titles: true,
            ai_title_pause_ms: 2500,
            background_job_limit: 1,
        }
    }
}

impl PipelineConfig {
    /// Same knobs with every pause removed. Used by tests and dry runs.
    pub fn without_pauses() -> Self {
        Self {
            transcript_batch_pause_ms: 0,
            transcript_retry_base_ms: 0,
            summary_batch_pause_ms: 0,
            summary_call_pause_ms: 0,
            ai_title_pause_ms: 0,
            ..Self::default()
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.llm.api_key = Some(key);
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tube-digest")
            .join("config.toml")
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.llm
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config(format!(
                    "no LLM API key: set llm.api_key in {} or {}",
                    Self::config_path().display(),
                    API_KEY_ENV
                ))
            })
    }
}

//! TOML-based configuration for the research pipeline
//!
//! Every section and field has a default, so an empty (or missing) file
//! yields a working local setup against `http://localhost:11434`.
//!
//! ```toml
//! [inference]
//! base_url = "http://localhost:11434"
//! default_model = "llama3.2"
//!
//! [crawl]
//! max_depth = 3
//! max_pages = 50
//!
//! [counsel]
//! default_members = 3
//! voting_seed = 42
//! ```
//!
//! Environment variables (optionally from `.env`) override the file:
//! `COUNSEL_OLLAMA_URL`, `COUNSEL_MODEL`, `COUNSEL_LOG_LEVEL`.

use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from counsel.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CounselConfig {
    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub counsel: CounselSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Inference Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    /// Upper bound for one generate call, in seconds
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_models_timeout")]
    pub models_timeout_secs: u64,

    /// Model used when a run does not name one
    #[serde(default)]
    pub default_model: Option<String>,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_inference_timeout() -> u64 {
    300
}

fn default_models_timeout() -> u64 {
    5
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            timeout_secs: default_inference_timeout(),
            models_timeout_secs: default_models_timeout(),
            default_model: None,
        }
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_api_url")]
    pub api_url: String,

    #[serde(default = "default_search_html_url")]
    pub html_url: String,

    /// Number of seed results requested per run
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_search_api_url() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_search_html_url() -> String {
    "https://html.duckduckgo.com/html/".to_string()
}

fn default_max_results() -> usize {
    10
}

fn default_search_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_url: default_search_api_url(),
            html_url: default_search_html_url(),
            max_results: default_max_results(),
            timeout_secs: default_search_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

// ============= Fetch Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Characters of page text kept per fetch
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Total request attempts per page, 429 responses included
    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_ms: u64,

    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    /// Same-site links kept per page at fetch time
    #[serde(default = "default_max_links")]
    pub max_links: usize,

    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
}

fn default_max_length() -> usize {
    3000
}

fn default_retries() -> u32 {
    3
}

fn default_rate_limit_backoff() -> u64 {
    10_000
}

fn default_error_backoff() -> u64 {
    5_000
}

fn default_max_links() -> usize {
    30
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            retries: default_retries(),
            rate_limit_backoff_ms: default_rate_limit_backoff(),
            error_backoff_ms: default_error_backoff(),
            max_links: default_max_links(),
            timeout_secs: default_fetch_timeout(),
        }
    }
}

// ============= Crawl Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Page text characters folded into the narrative per synthesis call
    #[serde(default = "default_page_excerpt")]
    pub page_excerpt_chars: usize,

    /// Narrative characters shown to the model when selecting follow-ups
    #[serde(default = "default_followup_summary")]
    pub followup_summary_chars: usize,

    /// Links offered to the model when selecting follow-ups. Independent of
    /// `fetch.max_links`.
    #[serde(default = "default_followup_link_cap")]
    pub followup_link_cap: usize,
}

fn default_max_depth() -> usize {
    3
}

fn default_max_pages() -> usize {
    50
}

fn default_page_excerpt() -> usize {
    2000
}

fn default_followup_summary() -> usize {
    1000
}

fn default_followup_link_cap() -> usize {
    50
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            page_excerpt_chars: default_page_excerpt(),
            followup_summary_chars: default_followup_summary(),
            followup_link_cap: default_followup_link_cap(),
        }
    }
}

// ============= Counsel Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounselSettings {
    #[serde(default = "default_members")]
    pub default_members: usize,

    #[serde(default = "default_research_excerpt")]
    pub research_excerpt_chars: usize,

    #[serde(default = "default_analyses_excerpt")]
    pub analyses_excerpt_chars: usize,

    /// Fixed seed for reproducible voting; random when unset
    #[serde(default)]
    pub voting_seed: Option<u64>,
}

fn default_members() -> usize {
    2
}

fn default_research_excerpt() -> usize {
    1500
}

fn default_analyses_excerpt() -> usize {
    2000
}

impl Default for CounselSettings {
    fn default() -> Self {
        Self {
            default_members: default_members(),
            research_excerpt_chars: default_research_excerpt(),
            analyses_excerpt_chars: default_analyses_excerpt(),
            voting_seed: None,
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Loading & Validation =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl CounselConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: CounselConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COUNSEL_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("COUNSEL_OLLAMA_URL").filter(|v| !v.is_empty()) {
            self.inference.base_url = url;
        }
        if let Some(model) = lookup("COUNSEL_MODEL").filter(|v| !v.is_empty()) {
            self.inference.default_model = Some(model);
        }
        if let Some(level) = lookup("COUNSEL_LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.max_depth == 0 {
            return Err(ConfigError::ValidationError(
                "crawl.max_depth must be at least 1".to_string(),
            ));
        }
        if self.crawl.max_pages == 0 {
            return Err(ConfigError::ValidationError(
                "crawl.max_pages must be at least 1".to_string(),
            ));
        }
        if self.fetch.retries == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.retries must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_length == 0 {
            return Err(ConfigError::ValidationError(
                "fetch.max_length must be at least 1".to_string(),
            ));
        }

        for (field, value) in [
            ("inference.base_url", &self.inference.base_url),
            ("search.api_url", &self.search.api_url),
            ("search.html_url", &self.search.html_url),
        ] {
            match url::Url::parse(value) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "{} must be an http(s) URL, got '{}'",
                        field, value
                    )))
                }
            }
        }

        Ok(())
    }
}

//! Configuration infrastructure
//!
//! Layered configuration: built-in defaults, an optional JSON config file,
//! and `ALIX_`-prefixed environment variables, in ascending precedence.
//! `ConfigManager` owns the on-disk copy under the user config directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::batch::options::BatchOptions;
use crate::domain::services::{ScrapeOptions, DEFAULT_REVIEWS_COUNT};
use crate::infrastructure::http_client::HttpClientConfig;

/// Configuration loading and validation failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from file: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scraping and HTTP settings
    pub scraping: ScrapingConfig,

    /// Batch engine settings
    pub batch: BatchSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Scraping and HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub reviews_count: u32,
    pub filter_reviews_by: String,
    pub fast_mode: bool,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        let http = HttpClientConfig::default();
        Self {
            user_agent: http.user_agent,
            accept_language: http.accept_language,
            request_timeout_seconds: http.timeout_seconds,
            max_requests_per_second: http.max_requests_per_second,
            reviews_count: DEFAULT_REVIEWS_COUNT,
            filter_reviews_by: defaults::REVIEW_FILTER.to_string(),
            fast_mode: false,
        }
    }
}

/// Batch engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub concurrency: usize,
    pub retries: u32,
    /// Per-item timeout in milliseconds; absent disables the limit.
    pub item_timeout_ms: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: crate::batch::options::DEFAULT_CONCURRENCY,
            retries: crate::batch::options::DEFAULT_RETRIES,
            item_timeout_ms: Some(defaults::ITEM_TIMEOUT_MS),
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs (file output)
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Module-specific log level filters (e.g., "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("h2".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path, merged with `ALIX_` env vars.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ALIX"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the loaded values before anything consumes them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.concurrency == 0 {
            return Err(ConfigError::Validation {
                message: "`concurrency` must be an integer >= 1".to_string(),
            });
        }
        if self.batch.item_timeout_ms == Some(0) {
            return Err(ConfigError::Validation {
                message: "`itemTimeout` must be a positive number when provided".to_string(),
            });
        }
        if self.scraping.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "max_requests_per_second must be at least 1".to_string(),
            });
        }
        if self.scraping.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "request_timeout_seconds must be at least 1".to_string(),
            });
        }
        let level = self.logging.level.to_lowercase();
        if !["error", "warn", "info", "debug", "trace"].contains(&level.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("unknown log level: {}", self.logging.level),
            });
        }
        Ok(())
    }

    /// HTTP client settings derived from the scraping section.
    #[must_use]
    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            user_agent: self.scraping.user_agent.clone(),
            accept_language: self.scraping.accept_language.clone(),
            timeout_seconds: self.scraping.request_timeout_seconds,
            max_requests_per_second: self.scraping.max_requests_per_second,
            follow_redirects: true,
        }
    }

    /// Pass-through scrape options derived from the scraping section.
    #[must_use]
    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions::default()
            .with_reviews_count(self.scraping.reviews_count)
            .with_review_filter(self.scraping.filter_reviews_by.clone())
            .with_fast_mode(self.scraping.fast_mode)
    }

    /// Batch engine options derived from the batch section.
    #[must_use]
    pub fn batch_options<I>(&self) -> BatchOptions<I> {
        BatchOptions::default()
            .with_concurrency(self.batch.concurrency)
            .with_retries(self.batch.retries)
            .with_item_timeout(self.batch.item_timeout_ms.map(Duration::from_millis))
            .with_scrape_options(self.scrape_options())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("aliexpress-scraper");

        Ok(config_dir)
    }

    /// Create a new configuration manager with the default file location
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        let config_path = config_dir.join("aliexpress_scraper_config.json");

        Ok(Self { config_path })
    }

    /// Initialize configuration on first run, loading the existing file otherwise
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("Failed to get config directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
            info!("✅ Created configuration directory: {:?}", config_dir);
        }

        if self.config_path.exists() {
            self.load_config().await
        } else {
            info!("🎉 First run detected - initializing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            Ok(default_config)
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Configuration file not found, creating default: {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                tracing::warn!("⚠️  Configuration file is corrupted: {}", parse_error);
                tracing::warn!("⚠️  Resetting to default configuration");

                // Keep the broken file around for inspection.
                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(error) = fs::copy(&self.config_path, &backup_path).await {
                    tracing::warn!("Failed to create backup of corrupted config: {}", error);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Load, mutate and persist the configuration in one step
    pub async fn update_config<F>(&self, updater: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.load_config().await?;
        updater(&mut config);
        self.save_config(&config).await?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values without a better home
pub mod defaults {
    /// Default per-item timeout in milliseconds
    pub const ITEM_TIMEOUT_MS: u64 = 120_000;

    /// Default review filter
    pub const REVIEW_FILTER: &str = "all";

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;
}

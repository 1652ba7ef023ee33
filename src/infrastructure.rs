//! Infrastructure layer for HTTP access, page parsing, and configuration
//!
//! This module provides the rate-limited HTTP client, the AliExpress page
//! scraper, configuration management, and logging infrastructure.

pub mod aliexpress; // AliExpress product page scraper
pub mod config; // Configuration loading and persistence
pub mod http_client; // Rate-limited HTTP client
pub mod logging; // Logging infrastructure

// Re-export commonly used items
pub use aliexpress::AliexpressScraper;
pub use config::{AppConfig, ConfigError, ConfigManager, LoggingConfig};
pub use http_client::{HttpClient, HttpClientConfig};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};

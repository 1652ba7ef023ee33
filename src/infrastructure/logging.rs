//! Logging system configuration and initialization
//!
//! This module provides the tracing setup with:
//! - File logging with startup rotation
//! - Configuration based log level control
//! - Structured JSON logging (optional)
//! - Console and file output support
//! - Log files stored relative to executable location

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::needless_borrows_for_generic_args)]

use anyhow::{Result, anyhow};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    layer::SubscriberExt,
    util::SubscriberInitExt,
    fmt::{self, time::FormatTime},
    EnvFilter,
    Registry,
};
use chrono::Utc;
use lazy_static::lazy_static;
use std::sync::Mutex;

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

/// Base name of the application log file
const LOG_FILE_NAME: &str = "aliexpress-scraper.log";

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Custom time formatter printing UTC with millisecond precision
struct UtcTimeFormatter;

impl FormatTime for UtcTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    // Get the directory where the executable is located
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    let config = LoggingConfig::default();
    init_logging_with_config(config)
}

/// Rotate an existing log file by renaming it with a timestamp
fn rotate_existing_log_file(log_dir: &PathBuf, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);

    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;

    let file_time = metadata.created()
        .or_else(|_| metadata.modified())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let datetime: chrono::DateTime<Utc> = file_time.into();

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, datetime.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path)
        .map_err(|e| anyhow!("Failed to rotate log file {} to {}: {}",
            log_file_path.display(), timestamped_path.display(), e))?;

    Ok(())
}

/// Initialize logging with custom configuration
///
/// Dependency noise is suppressed via the configured module filters unless
/// the level is "trace", in which case everything is let through.
///
/// # Environment Variable Override
/// The filtering can be overridden with the RUST_LOG environment variable:
/// ```bash
/// # Show detailed HTTP logs
/// RUST_LOG="debug,reqwest=debug,hyper=debug" cargo run
///
/// # Show only errors from all dependencies
/// RUST_LOG="info,reqwest=error,tokio=error" cargo run
/// ```
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    let log_dir = get_log_directory();

    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

        // Rotate any leftover log file before the new writer opens it
        rotate_existing_log_file(&log_dir, LOG_FILE_NAME)?;
    }

    // Set up environment filter with the configured module overrides
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            // Create base filter with application log level
            let mut filter = EnvFilter::new(&config.level);

            // Suppress verbose dependency logs unless TRACE is specifically requested
            if !config.level.to_lowercase().contains("trace") {
                for (module, level) in &config.module_filters {
                    if let Ok(directive) = format!("{}={}", module, level).parse() {
                        filter = filter.add_directive(directive);
                    }
                }

                // Keep our application logs at the requested level
                if let Ok(directive) = format!("aliexpress_scraper={}", config.level).parse() {
                    filter = filter.add_directive(directive);
                }
            }

            filter
        });

    // Build the subscriber registry
    let registry = Registry::default().with(env_filter);

    // Handle different combinations of output types
    match (config.file_output, config.console_output) {
        (true, true) => {
            let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = non_blocking(file_appender);

            // Store the guard globally to prevent it from being dropped
            LOG_GUARDS.lock().unwrap().push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);       // No ANSI color codes for file output
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false);

                registry.with(file_layer).with(console_layer).init();
            } else {
                // File layer with minimal formatting (time + level + message only)
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false);       // No ANSI color codes for file output
                let console_layer = fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false);

                registry.with(file_layer).with(console_layer).init();
            }
        },
        (true, false) => {
            let file_appender = rolling::never(&log_dir, LOG_FILE_NAME);
            let (file_writer, file_guard) = non_blocking(file_appender);

            // Store the guard globally to prevent it from being dropped
            LOG_GUARDS.lock().unwrap().push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);

                registry.with(file_layer).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_timer(UtcTimeFormatter)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false);

                registry.with(file_layer).init();
            }
        },
        (false, true) => {
            // Console output only
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(UtcTimeFormatter)
                .with_target(false);

            registry.with(console_layer).init();
        },
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log directory: {:?}", log_dir);
        info!("JSON format: {}", config.json_format);
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== AliExpress Scraper System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }

    info!("=============================================");
}

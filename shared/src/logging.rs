//! Shared logging utilities for consistent tracing across all components
//!
//! Two sinks receive the same event stream: an optional log file that keeps
//! everything down to the configured level, and the console which only shows
//! INFO and above.

use crate::errors::{SharedError, SharedResult};
use crate::types::Component;
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};

/// Width of the `=====` separator lines around diagnostic blocks
pub const BANNER_WIDTH: usize = 60;

/// Tracing sink configuration
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// File receiving the full diagnostic stream (None disables the file sink)
    pub file: Option<PathBuf>,
    /// Level applied to the file sink
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("ome-stress-tester.log")),
            level: "debug".to_string(),
        }
    }
}

/// Levels accepted for the file sink
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Reject anything `LOG_LEVELS` does not name
pub fn validate_level(level: &str) -> SharedResult<()> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        return Ok(());
    }
    Err(SharedError::InvalidConfig {
        field: "logging.level".to_string(),
        value: level.to_string(),
    })
}

fn target_filter(level: &str) -> String {
    format!("stress_tester={level},shared={level},tower_http={level},hyper=warn,axum=warn")
}

/// Console never shows anything below INFO, but honors stricter levels
fn console_level(level: &str) -> &str {
    match level.to_ascii_lowercase().as_str() {
        "warn" => "warn",
        "error" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// Initialize the global tracing subscriber with a file and a console sink
pub fn init_tracing(settings: &LogSettings) -> SharedResult<()> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .without_time()
        .compact()
        .with_filter(EnvFilter::new(target_filter(console_level(&settings.level))));

    let file_layer = match &settings.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| SharedError::LogFile {
                    path: path.display().to_string(),
                    source,
                })?;

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new(target_filter(&settings.level))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| SharedError::LoggingInit { message: e.to_string() })
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Separator line used around diagnostic blocks and reports
pub fn banner() -> String {
    "=".repeat(BANNER_WIDTH)
}

/// Last `max_chars` characters of `text`, trimmed
pub fn tail(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }

    let skip = count - max_chars;
    let start = text.char_indices().nth(skip).map_or(text.len(), |(idx, _)| idx);
    &text[start..]
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: Component, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: Component, reason: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: Component, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: Component, message: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

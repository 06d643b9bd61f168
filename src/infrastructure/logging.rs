//! Logging system configuration and initialization
//!
//! - Console and/or file output, plain or JSON
//! - Level from configuration, `RUST_LOG` overrides everything
//! - Dependency noise (sqlx, hyper, reqwest) suppressed below TRACE
//! - Timestamps in Moscow time (UTC+3), the listing site's timezone

use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Utc};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Keeps the file writer alive for the life of the process
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

const MSK_OFFSET_SECONDS: i32 = 3 * 3600;

/// Dependencies that are only interesting at TRACE
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("sqlx::query", "warn"),
    ("sqlx::postgres", "warn"),
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

/// Custom time formatter for MSK (Moscow Standard Time, UTC+3)
struct MskTimeFormatter;

impl FormatTime for MskTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let offset = FixedOffset::east_opt(MSK_OFFSET_SECONDS).ok_or(std::fmt::Error)?;
        let now = Utc::now().with_timezone(&offset);
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Build the level filter from configuration.
///
/// Per-module filters from the configuration are applied last so they can
/// re-enable anything the built-in suppression turned down.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let level = config.level.to_lowercase();
    let mut filter = EnvFilter::try_new(&level)
        .map_err(|e| anyhow!("Invalid log level {:?}: {}", config.level, e))?;

    if !level.contains("trace") {
        for (target, target_level) in QUIET_TARGETS {
            filter = filter.add_directive(format!("{target}={target_level}").parse()?);
        }
    }

    let mut modules: Vec<_> = config.module_filters.iter().collect();
    modules.sort();
    for (module, module_level) in modules {
        let directive = format!("{module}={module_level}");
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| anyhow!("Invalid log filter {:?}: {}", directive, e))?,
        );
    }

    Ok(filter)
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initialize logging with custom configuration.
///
/// `RUST_LOG`, when set, replaces the configured filter entirely:
/// ```bash
/// RUST_LOG="debug,sqlx::query=debug" nomera-ingest
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_env_filter(config)?,
    };
    let registry = Registry::default().with(env_filter);

    let log_dir = get_log_directory();
    let file_writer = if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;
        let (writer, guard) = non_blocking(rolling::daily(&log_dir, &config.file_name));
        LOG_GUARD
            .set(guard)
            .map_err(|_| anyhow!("Logging system already initialized"))?;
        Some(writer)
    } else {
        None
    };

    let init_result = match (file_writer, config.console_output, config.json_format) {
        (Some(writer), console, true) => {
            let file_layer = fmt::Layer::new()
                .json()
                .with_writer(writer)
                .with_timer(MskTimeFormatter)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false);
            let console_layer = console.then(|| {
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(MskTimeFormatter)
                    .with_target(false)
            });
            registry.with(file_layer).with(console_layer).try_init()
        }
        (Some(writer), console, false) => {
            let file_layer = fmt::Layer::new()
                .with_writer(writer)
                .with_timer(MskTimeFormatter)
                .with_target(false)
                .with_ansi(false);
            let console_layer = console.then(|| {
                fmt::Layer::new()
                    .with_writer(std::io::stdout)
                    .with_timer(MskTimeFormatter)
                    .with_target(false)
            });
            registry.with(file_layer).with(console_layer).try_init()
        }
        (None, true, true) => {
            let console_layer = fmt::Layer::new()
                .json()
                .with_writer(std::io::stdout)
                .with_timer(MskTimeFormatter)
                .with_target(true);
            registry.with(console_layer).try_init()
        }
        (None, true, false) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(MskTimeFormatter)
                .with_target(false);
            registry.with(console_layer).try_init()
        }
        (None, false, _) => return Err(anyhow!("No logging output configured")),
    };
    init_result.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {:?}", log_dir.join(&config.file_name));
    }
    Ok(())
}

/// Log process information for diagnostics
pub fn log_system_info() {
    info!("=== nomera-ingest ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}

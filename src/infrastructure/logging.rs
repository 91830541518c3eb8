//! Logging system configuration and initialization
//!
//! This module provides the logging setup used by the CLI and by embedding
//! applications:
//! - File logging with rotation of the previous run's file
//! - Configuration file based log level control
//! - Structured JSON logging (optional)
//! - Console (stderr) and file output support
//! - Log files stored relative to executable location
//! - Configurable UTC offset for timestamps

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::{FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::NonBlocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
};

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

/// Crate target used for the application-level filter directive
const CRATE_TARGET: &str = "fitment_engine_lib";

/// Dependencies that are only interesting at TRACE level
const NOISY_TARGETS: &[(&str, &str)] = &[("html5ever", "warn"), ("selectors", "warn")];

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Timestamps in a fixed offset from UTC
#[derive(Clone, Copy)]
struct OffsetTimeFormatter {
    offset: FixedOffset,
}

impl FormatTime for OffsetTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now().with_timezone(&self.offset);
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

fn resolve_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600).unwrap_or_else(|| Utc.fix())
}

/// Get the log directory relative to the executable location
pub fn get_log_directory() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    exe_dir.join("logs")
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Rotate an existing log file by renaming it with its timestamp
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str, offset: FixedOffset) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {e}"))?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let datetime: chrono::DateTime<Utc> = file_time.into();
    let stamped = datetime.with_timezone(&offset);

    let file_stem = log_file_name.trim_end_matches(".log");
    let timestamped_name = format!("{}.{}.log", file_stem, stamped.format("%Y%m%dT%H%M%S"));
    let timestamped_path = log_dir.join(&timestamped_name);

    std::fs::rename(&log_file_path, &timestamped_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {e}",
            log_file_path.display(),
            timestamped_path.display()
        )
    })?;

    Ok(())
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level plus
/// per-module directives, with dependency noise suppressed below TRACE.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .map_err(|e| anyhow!("Invalid log level '{}': {e}", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        for (target, level) in NOISY_TARGETS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
    }

    let mut module_filters: Vec<_> = config.module_filters.iter().collect();
    module_filters.sort();
    for (module, level) in module_filters {
        match format!("{module}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log filter {module}={level}: {e}"),
        }
    }

    Ok(filter.add_directive(format!("{CRATE_TARGET}={}", config.level).parse()?))
}

/// Subscriber stack the output layers sit on
type FilteredRegistry = Layered<EnvFilter, Registry>;

type OutputLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// File layer (JSON or plain) and stderr console layer, as configured.
fn output_layers(config: &LoggingConfig, timer: OffsetTimeFormatter, file_writer: Option<NonBlocking>) -> Vec<OutputLayer> {
    let mut layers = Vec::new();

    if let Some(writer) = file_writer {
        if config.json_format {
            layers.push(
                fmt::Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_timer(timer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .boxed(),
            );
        } else {
            layers.push(
                fmt::Layer::new()
                    .with_writer(writer)
                    .with_timer(timer)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .boxed(),
            );
        }
    }

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_timer(timer)
                .with_target(false)
                .boxed(),
        );
    }

    layers
}

/// Initialize logging with custom configuration
///
/// # Environment Variable Override
/// The filter can be overridden with `RUST_LOG`:
/// ```bash
/// # Show per-strategy attempts and rejected records
/// RUST_LOG="info,fitment_engine_lib=debug" fitment-engine extract ...
///
/// # Include HTML parser internals
/// RUST_LOG="trace" fitment-engine extract ...
/// ```
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    let offset = resolve_offset(config.utc_offset_hours);
    let timer = OffsetTimeFormatter { offset };
    let log_dir = get_log_directory();

    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {}: {e}", log_dir.display()))?;

        rotate_existing_log_file(&log_dir, &config.file_name, offset)?;

        if config.auto_cleanup_logs {
            cleanup_old_logs(&log_dir, config.max_files)?;
        }
    }

    let file_writer = if config.file_output {
        let file_appender = rolling::never(&log_dir, &config.file_name);
        let (file_writer, file_guard) = non_blocking(file_appender);

        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);
        Some(file_writer)
    } else {
        None
    };

    let layers = output_layers(&config, timer, file_writer);
    if layers.is_empty() {
        return Err(anyhow!("No logging output configured"));
    }

    Registry::default()
        .with(build_env_filter(&config)?)
        .with(layers)
        .try_init()
        .map_err(|e| anyhow!("Failed to install subscriber: {e}"))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {}", log_dir.join(&config.file_name).display());
    }
    if config.level.to_lowercase().contains("trace") {
        info!("TRACE level active - HTML parser internals will be shown");
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Fitment Engine System Information ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);
    info!("Log directory: {}", get_log_directory().display());
}

/// Keep the `max_files` most recently modified `.log` files, delete the rest.
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".log"));
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.iter().skip(max_files as usize) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove old log file {}: {}", path.display(), e);
        } else {
            removed += 1;
        }
    }
    Ok(removed)
}

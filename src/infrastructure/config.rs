//! Configuration infrastructure
//!
//! Contains configuration loading and management for the fitment engine.
//!
//! Configuration is layered:
//! 1. Built-in defaults (the [`defaults`] module)
//! 2. An optional JSON/TOML file (by default under the user config directory)
//! 3. Environment variables prefixed `FITMENT__`, with `__` separating
//!    nested keys (e.g. `FITMENT__EXTRACTION__MAX_DOCUMENTS=5`)

#![allow(clippy::derivable_impls)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::domain::{ConfidenceCurve, StrategyId, VendorConfig, YearBounds};

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Document budget and early-exit thresholds
    pub extraction: ExtractionConfig,

    /// Acceptance window for model years
    pub validation: ValidationConfig,

    /// Confidence curves and heuristic bands for every strategy
    pub tuning: TuningConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Caller-side batch pipeline settings
    pub batch: BatchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Vendors appended to the built-in registry at startup
    pub extra_vendors: Vec<VendorConfig>,
}

/// Document budget and early-exit thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Maximum candidate documents inspected per call
    pub max_documents: usize,

    /// Confidence at which no further strategies run on the current document
    pub definitive_confidence: f64,

    /// Best-so-far confidence at which no further documents are inspected
    pub sufficient_confidence: f64,
}

/// Acceptance window for model years
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_year: i32,
    pub max_year: i32,
}

/// Scoring for the plausibility-based heuristic strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicTuning {
    pub base_score: f64,
    pub exact_make_bonus: f64,
    pub partial_make_bonus: f64,
    pub plausible_year_bonus: f64,
    pub plausible_min_year: i32,
    pub plausible_max_year: i32,
    /// Candidates scoring below this are discarded
    pub accept_threshold: f64,
}

/// Confidence curves and heuristic bands for every strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    pub structured_data: ConfidenceCurve,
    pub table_parser: ConfidenceCurve,
    pub list_parser: ConfidenceCurve,
    pub text_extraction: ConfidenceCurve,
    pub concatenated_text: ConfidenceCurve,
    pub labeled_fields: ConfidenceCurve,
    pub heuristic_ml: ConfidenceCurve,
    pub fallback_heuristic: ConfidenceCurve,

    pub heuristic: HeuristicTuning,

    /// Year band the last-resort heuristic accepts
    pub fallback_min_year: i32,
    pub fallback_max_year: i32,

    /// List items this short or shorter are skipped
    pub list_min_item_len: usize,

    /// Segmented fragments shorter than this are discarded
    pub segment_min_len: usize,

    /// Text must be longer than this before the triple-scan fallback runs
    pub fallback_split_min_len: usize,
}

/// Result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Cache file location; `None` means the application data directory
    pub path: Option<PathBuf>,

    /// Entries older than this are treated as absent
    pub retention_days: u32,
}

/// Caller-side batch pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum concurrent extractions
    pub concurrency: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output (stderr, so stdout stays machine readable)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log file name inside the log directory
    pub file_name: String,

    /// Offset from UTC used for log timestamps and rotated file names
    pub utc_offset_hours: i32,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "html5ever": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            validation: ValidationConfig::default(),
            tuning: TuningConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
            logging: LoggingConfig::default(),
            extra_vendors: Vec::new(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_documents: defaults::MAX_DOCUMENTS,
            definitive_confidence: defaults::DEFINITIVE_CONFIDENCE,
            sufficient_confidence: defaults::SUFFICIENT_CONFIDENCE,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_year: defaults::MIN_MODEL_YEAR,
            max_year: defaults::MAX_MODEL_YEAR,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub const fn year_bounds(&self) -> YearBounds {
        YearBounds::new(self.min_year, self.max_year)
    }
}

impl Default for HeuristicTuning {
    fn default() -> Self {
        Self {
            base_score: defaults::HEURISTIC_BASE_SCORE,
            exact_make_bonus: defaults::HEURISTIC_EXACT_MAKE_BONUS,
            partial_make_bonus: defaults::HEURISTIC_PARTIAL_MAKE_BONUS,
            plausible_year_bonus: defaults::HEURISTIC_YEAR_BONUS,
            plausible_min_year: defaults::HEURISTIC_MIN_YEAR,
            plausible_max_year: defaults::HEURISTIC_MAX_YEAR,
            accept_threshold: defaults::HEURISTIC_ACCEPT_THRESHOLD,
        }
    }
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            structured_data: defaults::STRUCTURED_DATA_CURVE,
            table_parser: defaults::TABLE_PARSER_CURVE,
            list_parser: defaults::LIST_PARSER_CURVE,
            text_extraction: defaults::TEXT_EXTRACTION_CURVE,
            concatenated_text: defaults::CONCATENATED_TEXT_CURVE,
            labeled_fields: defaults::LABELED_FIELDS_CURVE,
            heuristic_ml: defaults::HEURISTIC_ML_CURVE,
            fallback_heuristic: defaults::FALLBACK_HEURISTIC_CURVE,
            heuristic: HeuristicTuning::default(),
            fallback_min_year: defaults::FALLBACK_MIN_YEAR,
            fallback_max_year: defaults::FALLBACK_MAX_YEAR,
            list_min_item_len: defaults::LIST_MIN_ITEM_LEN,
            segment_min_len: defaults::SEGMENT_MIN_LEN,
            fallback_split_min_len: defaults::FALLBACK_SPLIT_MIN_LEN,
        }
    }
}

impl TuningConfig {
    /// Confidence curve configured for `strategy`.
    #[must_use]
    pub const fn curve(&self, strategy: StrategyId) -> ConfidenceCurve {
        match strategy {
            StrategyId::StructuredData => self.structured_data,
            StrategyId::TableParser => self.table_parser,
            StrategyId::ListParser => self.list_parser,
            StrategyId::TextExtraction => self.text_extraction,
            StrategyId::ConcatenatedText => self.concatenated_text,
            StrategyId::LabeledFields => self.labeled_fields,
            StrategyId::HeuristicMl => self.heuristic_ml,
            StrategyId::FallbackHeuristic => self.fallback_heuristic,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::CACHE_ENABLED,
            path: None,
            retention_days: defaults::CACHE_RETENTION_DAYS,
        }
    }
}

impl CacheConfig {
    /// Configured cache path, or the default one under the app data directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigManager::get_app_data_dir()?
                .join("cache")
                .join(defaults::CACHE_FILE_NAME)),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::BATCH_CONCURRENCY,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            file_name: defaults::LOG_FILE_NAME.to_string(),
            utc_offset_hours: defaults::LOG_UTC_OFFSET_HOURS,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("selectors".to_string(), "warn".to_string());
                filters.insert("tokio".to_string(), "info".to_string());
                filters
            },
        }
    }
}

impl EngineConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let extraction = &self.extraction;
        if extraction.max_documents == 0 {
            bail!("extraction.max_documents must be at least 1");
        }
        if !(0.0..=1.0).contains(&extraction.definitive_confidence)
            || !(0.0..=1.0).contains(&extraction.sufficient_confidence)
        {
            bail!("extraction confidence thresholds must lie in [0, 1]");
        }
        if extraction.sufficient_confidence > extraction.definitive_confidence {
            bail!(
                "extraction.sufficient_confidence ({}) exceeds definitive_confidence ({})",
                extraction.sufficient_confidence,
                extraction.definitive_confidence
            );
        }
        if self.validation.min_year > self.validation.max_year {
            bail!(
                "validation.min_year ({}) is after validation.max_year ({})",
                self.validation.min_year,
                self.validation.max_year
            );
        }
        for strategy in StrategyId::ALL {
            let curve = self.tuning.curve(strategy);
            if curve.per_item <= 0.0 || !(0.0..=1.0).contains(&curve.cap) {
                bail!("tuning.{strategy} needs per_item > 0 and cap in [0, 1]");
            }
        }
        if self.batch.concurrency == 0 {
            bail!("batch.concurrency must be at least 1");
        }
        if self.cache.retention_days == 0 {
            bail!("cache.retention_days must be at least 1");
        }
        for vendor in &self.extra_vendors {
            if vendor.key.trim().is_empty() || vendor.brand_names.is_empty() {
                bail!("extra vendor entries need a key and at least one brand name");
            }
            if vendor.authority_score > 100 {
                bail!(
                    "vendor {} has authority_score {} (max 100)",
                    vendor.key,
                    vendor.authority_score
                );
            }
        }
        Ok(())
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
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Create a configuration manager for the default location
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Create a configuration manager for an explicit file
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Initialize configuration system on first run
    pub async fn initialize_on_first_run(&self) -> Result<EngineConfig> {
        if self.config_path.exists() {
            return self.load_config().await;
        }

        info!("🎉 First run detected - writing default configuration");
        let default_config = EngineConfig::default();
        self.save_config(&default_config).await?;

        let cache_dir = Self::get_app_data_dir()?.join("cache");
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)
                .await
                .with_context(|| format!("Failed to create directory: {}", cache_dir.display()))?;
            info!("📁 Created directory: {}", cache_dir.display());
        }

        self.load_config().await
    }

    /// Load configuration from defaults, the file (if present) and the environment.
    ///
    /// A file that cannot be parsed is backed up next to itself with a
    /// `.corrupted` suffix and ignored.
    pub async fn load_config(&self) -> Result<EngineConfig> {
        let config = match Self::build_layers(Some(&self.config_path)) {
            Ok(config) => config,
            Err(parse_error) if self.config_path.exists() => {
                warn!("⚠️  Configuration file could not be parsed: {}", parse_error);

                let backup_path = corrupted_backup_path(&self.config_path);
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to create backup of corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {}", backup_path.display());
                }

                warn!("⚠️  Falling back to defaults and environment overrides");
                Self::build_layers(None)?
            }
            Err(e) => return Err(e),
        };

        config.validate().with_context(|| {
            format!("Invalid configuration in {}", self.config_path.display())
        })?;

        info!("Loaded configuration (file: {})", self.config_path.display());
        Ok(config)
    }

    fn build_layers(file: Option<&Path>) -> Result<EngineConfig> {
        let defaults = Config::try_from(&EngineConfig::default())
            .context("Failed to serialize default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder
            .add_source(
                Environment::with_prefix(defaults::ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to assemble configuration layers")?
            .try_deserialize::<EngineConfig>()
            .context("Failed to deserialize configuration")
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &EngineConfig) -> Result<()> {
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

        info!("Saved configuration to: {}", self.config_path.display());
        Ok(())
    }

    /// Reset configuration to defaults (useful for troubleshooting)
    pub async fn reset_to_defaults(&self) -> Result<EngineConfig> {
        info!("🔄 Resetting configuration to defaults");

        let default_config = EngineConfig::default();
        self.save_config(&default_config).await?;
        Ok(default_config)
    }
}

fn corrupted_backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupted");
    path.with_file_name(name)
}

/// Default engine configuration values
pub mod defaults {
    use crate::domain::ConfidenceCurve;

    /// Directory name under the user config/data directories
    pub const APP_DIR_NAME: &str = "fitment-engine";

    /// Default configuration file name
    pub const CONFIG_FILE_NAME: &str = "fitment_config.json";

    /// Environment variable prefix for overrides
    pub const ENV_PREFIX: &str = "FITMENT";

    // Extraction defaults
    /// Candidate documents inspected per call
    pub const MAX_DOCUMENTS: usize = 3;

    /// Stop trying strategies on a document at this confidence
    pub const DEFINITIVE_CONFIDENCE: f64 = 0.9;

    /// Stop inspecting documents once the best result reaches this confidence
    pub const SUFFICIENT_CONFIDENCE: f64 = 0.7;

    // Validation defaults
    pub const MIN_MODEL_YEAR: i32 = 1900;
    pub const MAX_MODEL_YEAR: i32 = 2035;

    // Strategy confidence curves
    pub const STRUCTURED_DATA_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.25, 0.98);
    pub const TABLE_PARSER_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.18, 0.85);
    pub const LIST_PARSER_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.15, 0.80);
    pub const TEXT_EXTRACTION_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.12, 0.70);
    pub const CONCATENATED_TEXT_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.15, 0.95);
    pub const LABELED_FIELDS_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.20, 0.92);
    pub const HEURISTIC_ML_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.10, 0.75);
    pub const FALLBACK_HEURISTIC_CURVE: ConfidenceCurve = ConfidenceCurve::new(0.08, 0.50);

    // Heuristic scoring
    pub const HEURISTIC_BASE_SCORE: f64 = 0.5;
    pub const HEURISTIC_EXACT_MAKE_BONUS: f64 = 0.3;
    pub const HEURISTIC_PARTIAL_MAKE_BONUS: f64 = 0.1;
    pub const HEURISTIC_YEAR_BONUS: f64 = 0.2;
    pub const HEURISTIC_MIN_YEAR: i32 = 1990;
    pub const HEURISTIC_MAX_YEAR: i32 = 2025;
    pub const HEURISTIC_ACCEPT_THRESHOLD: f64 = 0.7;

    pub const FALLBACK_MIN_YEAR: i32 = 1990;
    pub const FALLBACK_MAX_YEAR: i32 = 2030;

    pub const LIST_MIN_ITEM_LEN: usize = 10;
    pub const SEGMENT_MIN_LEN: usize = 8;
    pub const FALLBACK_SPLIT_MIN_LEN: usize = 50;

    // Cache defaults
    pub const CACHE_ENABLED: bool = true;
    pub const CACHE_FILE_NAME: &str = "vehicle_applications.json";
    pub const CACHE_RETENTION_DAYS: u32 = 7;

    // Batch defaults
    /// Maximum concurrent extractions in the batch pipeline
    pub const BATCH_CONCURRENCY: usize = 5;

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = true;

    /// Default log file name
    pub const LOG_FILE_NAME: &str = "fitment-engine.log";

    /// Default timestamp offset (UTC)
    pub const LOG_UTC_OFFSET_HOURS: i32 = 0;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;

    /// Default auto cleanup logs setting
    pub const LOG_AUTO_CLEANUP: bool = true;

    /// CSS selectors tried when a vendor has none of its own
    pub const FITMENT_SELECTORS: &[&str] = &[
        ".vehicle-fitment",
        ".fitment",
        ".compatibility",
        ".vehicle-applications",
        "#fitment",
        "[data-fitment]",
        "table.fitment-table",
        ".product-applications",
    ];
}

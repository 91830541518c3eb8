//! Infrastructure layer for parsing, vendor profiles, caching and configuration
//!
//! This module provides HTML parsing and the extraction strategies, the
//! vendor registry, the result cache, configuration loading and logging.

pub mod config; // Configuration layers and defaults
pub mod extraction_cache; // Persistent outcome cache
pub mod logging; // Logging infrastructure
pub mod parsing; // Document parsing and extraction strategies
pub mod parsing_error; // Strategy-internal error types
pub mod vendor_registry; // Brand/domain to vendor profile lookup

// Re-export commonly used items
pub use config::{ConfigManager, EngineConfig};
pub use extraction_cache::{CacheEntry, ExtractionCache};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{ParseContext, ParsingError, ParsingResult, StrategySet, TextSegmenter};
pub use vendor_registry::{VendorProfile, VendorRegistry};

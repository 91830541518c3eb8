//! Fitment Engine - vehicle fitment extraction from product pages
//!
//! Given a part number, a brand and a few already-fetched HTML documents,
//! the engine identifies the vendor, runs that vendor's strategy chain and
//! returns validated, deduplicated vehicle applications.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry points for easier access
pub use application::{
    BatchExtractor, BatchItem, BatchReport, DocumentSupplier, ExtractionOrchestrator,
    ExtractionReport, ExtractionSettings, StatsSnapshot,
};
pub use domain::{ParseResult, SourceDocument, StrategyId, VehicleApplication, VendorConfig, YearBounds};
pub use infrastructure::{EngineConfig, ExtractionCache, VendorRegistry};

//! Application layer - Extraction workflows
//!
//! This module coordinates the domain types and the parsing infrastructure:
//! the per-part orchestrator, its statistics, candidate URL discovery and the
//! concurrent batch pipeline.

pub mod batch;
pub mod discovery;
pub mod orchestrator;
pub mod statistics;

// Re-export commonly used items
pub use batch::{BatchExtractor, BatchItem, BatchOutcome, BatchReport, DocumentSupplier};
pub use discovery::{SearchResultHints, candidate_urls, rank_by_authority, sanitize_part_number};
pub use orchestrator::{
    ExtractionOrchestrator, ExtractionReport, ExtractionSettings, StrategyAttempt, StrategyExecutor,
};
pub use statistics::{ExtractionStats, StatsSnapshot};

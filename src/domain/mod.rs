//! Domain module - Core fitment entities
//!
//! This module contains the entities and value objects the extraction engine
//! produces and consumes: fitment records, source documents, strategy
//! outcomes and vendor profiles.

pub mod document;
pub mod parse_result;
pub mod vehicle_application;
pub mod vendor;

// Re-export commonly used items
pub use document::SourceDocument;
pub use parse_result::{ConfidenceCurve, ParseResult, StrategyId, UnknownStrategy};
pub use vehicle_application::{
    ApplicationDraft, ApplicationRecord, RejectReason, VehicleApplication, YearBounds,
    dedup_applications,
};
pub use vendor::{ParsingRules, VendorConfig, VendorPatterns};

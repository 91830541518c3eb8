//! Extraction orchestration
//!
//! For one part the orchestrator identifies the vendor, picks its strategy
//! chain and runs the chain over the candidate documents in caller order,
//! keeping the most confident result. A strategy that reaches the definitive
//! confidence ends work on its document; a best result at the sufficient
//! confidence ends work on the remaining documents. Outcomes (including
//! empty ones) are cached per first document and part number.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use super::statistics::{ExtractionStats, StatsSnapshot};
use crate::domain::{ParseResult, SourceDocument, StrategyId, VehicleApplication, YearBounds};
use crate::infrastructure::config::{EngineConfig, TuningConfig};
use crate::infrastructure::extraction_cache::{CacheEntry, ExtractionCache};
use crate::infrastructure::parsing::{ParseContext, StrategySet};
use crate::infrastructure::vendor_registry::VendorRegistry;

/// Runs one strategy on one parsed document.
pub trait StrategyExecutor: Send + Sync {
    fn execute(&self, strategy: StrategyId, ctx: &ParseContext<'_>) -> ParseResult;
}

impl StrategyExecutor for StrategySet {
    fn execute(&self, strategy: StrategyId, ctx: &ParseContext<'_>) -> ParseResult {
        self.run(strategy, ctx)
    }
}

/// Document budget, early-exit thresholds and the year window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionSettings {
    pub max_documents: usize,
    pub definitive_confidence: f64,
    pub sufficient_confidence: f64,
    pub bounds: YearBounds,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ExtractionSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_documents: config.extraction.max_documents,
            definitive_confidence: config.extraction.definitive_confidence,
            sufficient_confidence: config.extraction.sufficient_confidence,
            bounds: config.validation.year_bounds(),
        }
    }
}

/// One strategy run as seen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAttempt {
    /// Source identity of the document
    pub document: String,
    pub strategy: StrategyId,
    pub confidence: f64,
    pub success: bool,
    pub applications: usize,
    pub errors: Vec<String>,
}

/// Everything an extraction call decided, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub part_number: String,
    pub brand: String,
    pub applications: Vec<VehicleApplication>,
    pub vendor: Option<String>,
    pub strategy_chain: Vec<StrategyId>,
    pub attempts: Vec<StrategyAttempt>,
    pub best_strategy: Option<StrategyId>,
    pub best_confidence: f64,
    pub cache_hit: bool,
}

impl ExtractionReport {
    fn empty(part_number: &str, brand: &str) -> Self {
        Self {
            part_number: part_number.to_string(),
            brand: brand.to_string(),
            ..Self::default()
        }
    }
}

pub struct ExtractionOrchestrator {
    registry: Arc<VendorRegistry>,
    executor: Arc<dyn StrategyExecutor>,
    cache: Option<Arc<ExtractionCache>>,
    stats: Mutex<ExtractionStats>,
    settings: ExtractionSettings,
}

impl std::fmt::Debug for ExtractionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionOrchestrator")
            .field("vendors", &self.registry.len())
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ExtractionOrchestrator {
    /// Orchestrator with the built-in strategies tuned by `tuning` and no cache.
    pub fn new(registry: Arc<VendorRegistry>, settings: ExtractionSettings, tuning: &TuningConfig) -> Self {
        Self {
            registry,
            executor: Arc::new(StrategySet::new(tuning, settings.bounds)),
            cache: None,
            stats: Mutex::new(ExtractionStats::new()),
            settings,
        }
    }

    /// Everything wired from configuration: registry with extra vendors,
    /// tuned strategies and the cache when enabled.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate().context("Invalid engine configuration")?;

        let registry = VendorRegistry::with_extra_vendors(&config.extra_vendors)
            .context("Failed to build vendor registry")?;
        let cache = ExtractionCache::from_config(&config.cache, config.validation.year_bounds())
            .context("Failed to open extraction cache")?;

        let orchestrator = Self::new(Arc::new(registry), ExtractionSettings::from(config), &config.tuning);
        Ok(match cache {
            Some(cache) => orchestrator.with_cache(Arc::new(cache)),
            None => orchestrator,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ExtractionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the strategy runner.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn StrategyExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn registry(&self) -> &VendorRegistry {
        &self.registry
    }

    pub const fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    fn lock_stats(&self) -> MutexGuard<'_, ExtractionStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.lock_stats().snapshot()
    }

    /// Fitment records for `part_number` from the best strategy result.
    pub fn extract(&self, part_number: &str, brand: &str, documents: &[SourceDocument]) -> Vec<VehicleApplication> {
        self.extract_with_report(part_number, brand, documents).applications
    }

    /// Same as [`Self::extract`], with every decision recorded.
    pub fn extract_with_report(
        &self,
        part_number: &str,
        brand: &str,
        documents: &[SourceDocument],
    ) -> ExtractionReport {
        let part_number = part_number.trim();
        let brand = brand.trim();
        let span = info_span!("extract", part_number, brand);
        let _guard = span.enter();

        self.lock_stats().record_extraction();
        let mut report = ExtractionReport::empty(part_number, brand);

        if part_number.is_empty() || brand.is_empty() || documents.is_empty() {
            warn!(
                documents = documents.len(),
                "Missing part number, brand or documents; nothing to extract"
            );
            return report;
        }

        let vendor = self.registry.identify_vendor_by_brand(brand).or_else(|| {
            documents
                .iter()
                .find_map(|doc| self.registry.identify_vendor_by_domain(&doc.source_url))
        });
        report.vendor = vendor.map(str::to_string);

        let cache_key = ExtractionCache::key(&documents[0].source_identity(), part_number);
        if let Some(entry) = self.cache.as_ref().and_then(|cache| cache.get(&cache_key)) {
            info!(
                applications = entry.applications.len(),
                "Using cached applications for {part_number}"
            );
            self.lock_stats().record_cache_hit();
            report.cache_hit = true;
            report.vendor = entry.vendor.or(report.vendor);
            report.best_strategy = entry.strategy;
            report.best_confidence = entry.confidence;
            report.applications = entry.applications;
            return report;
        }

        report.strategy_chain = self.registry.get_strategy_chain(vendor);
        info!(
            vendor = vendor.unwrap_or("none"),
            chain = ?report.strategy_chain,
            "Extracting applications for {brand} {part_number}"
        );

        let best = self.run_chain(part_number, vendor, documents, &mut report);

        if let Some(best) = best {
            info!(
                strategy = %best.strategy_used,
                confidence = best.confidence,
                "Found {} applications",
                best.applications.len()
            );
            report.best_strategy = Some(best.strategy_used);
            report.best_confidence = best.confidence;
            report.applications = best.applications;
        } else {
            warn!("No applications found for {part_number}");
        }

        if let Some(cache) = &self.cache {
            cache.insert(
                cache_key,
                CacheEntry::new(
                    report.applications.clone(),
                    report.vendor.clone(),
                    report.best_strategy,
                    report.best_confidence,
                ),
            );
        }

        report
    }

    fn run_chain(
        &self,
        part_number: &str,
        vendor: Option<&str>,
        documents: &[SourceDocument],
        report: &mut ExtractionReport,
    ) -> Option<ParseResult> {
        let profile = vendor.and_then(|key| self.registry.profile(key));
        let mut best: Option<ParseResult> = None;

        for document in documents.iter().take(self.settings.max_documents) {
            let identity = document.source_identity();
            if document.is_blank() {
                debug!(document = %identity, "Skipping empty document");
                continue;
            }

            let ctx = ParseContext::new(document, part_number)
                .with_vendor(profile)
                .with_bounds(self.settings.bounds);

            for strategy in &report.strategy_chain {
                let result = self.executor.execute(*strategy, &ctx);
                debug!(
                    document = %identity,
                    strategy = %strategy,
                    success = result.success,
                    confidence = result.confidence,
                    "Strategy attempt"
                );
                self.lock_stats().record_attempt(vendor, &result);
                report.attempts.push(StrategyAttempt {
                    document: identity.clone(),
                    strategy: *strategy,
                    confidence: result.confidence,
                    success: result.success,
                    applications: result.applications.len(),
                    errors: result.errors.clone(),
                });

                let definitive = result.confidence >= self.settings.definitive_confidence;
                let improves = best
                    .as_ref()
                    .is_none_or(|current| result.confidence > current.confidence);
                if result.success && result.confidence > 0.0 && improves {
                    best = Some(result);
                }
                if definitive {
                    debug!(strategy = %strategy, "Definitive result; skipping remaining strategies");
                    break;
                }
            }

            if best
                .as_ref()
                .is_some_and(|b| b.confidence >= self.settings.sufficient_confidence)
            {
                debug!("Sufficient result; skipping remaining documents");
                break;
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator() -> ExtractionOrchestrator {
        let registry = Arc::new(VendorRegistry::with_builtin_catalog().unwrap());
        ExtractionOrchestrator::new(registry, ExtractionSettings::default(), &TuningConfig::default())
    }

    #[test]
    fn test_missing_inputs_return_empty() {
        let orchestrator = orchestrator();
        let doc = SourceDocument::new("https://example.com", "<li>2019 Honda Civic Si</li>");

        assert!(orchestrator.extract("", "Hawk", &[doc.clone()]).is_empty());
        assert!(orchestrator.extract("HB1", "  ", &[doc]).is_empty());
        assert!(orchestrator.extract("HB1", "Hawk", &[]).is_empty());
        assert_eq!(orchestrator.stats().total_attempts, 0);
        assert_eq!(orchestrator.stats().extractions, 3);
    }

    #[test]
    fn test_vendor_from_document_domain_when_brand_unknown() {
        let orchestrator = orchestrator();
        let doc = SourceDocument::new(
            "https://www.bilstein.com/en/p/24-186728",
            r#"<div class="fitment-info">Years: 2005 – 2023, Make: TOYOTA, Model: Tacoma</div>"#,
        );

        let report = orchestrator.extract_with_report("24-186728", "Zzyzx", &[doc]);
        assert_eq!(report.vendor.as_deref(), Some("BILSTEIN"));
        assert_eq!(report.strategy_chain[0], StrategyId::LabeledFields);
        assert_eq!(report.best_strategy, Some(StrategyId::LabeledFields));
        assert_eq!(report.applications.len(), 1);
    }

    #[test]
    fn test_blank_documents_are_skipped() {
        let orchestrator = orchestrator();
        let docs = [
            SourceDocument::new("https://a.example.com", "   "),
            SourceDocument::new("https://b.example.com", "<ul><li>2019 Honda Civic Si</li></ul>"),
        ];

        let report = orchestrator.extract_with_report("X1", "Unknown Brand", &docs);
        assert!(report.attempts.iter().all(|a| a.document == "https://b.example.com"));
        assert_eq!(report.applications.len(), 1);
    }
}

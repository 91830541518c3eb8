//! Running extraction statistics
//!
//! Every strategy attempt is recorded; [`ExtractionStats::snapshot`] turns the
//! counters into a serializable report with derived rates.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{ParseResult, StrategyId};

/// Number of 0.1-wide confidence buckets
pub const CONFIDENCE_BUCKETS: usize = 10;

/// Vendor label used for calls where no vendor was identified
pub const UNKNOWN_VENDOR: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptCounter {
    pub attempts: u64,
    pub successes: u64,
}

impl AttemptCounter {
    fn record(&mut self, success: bool) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.successes as f64 / self.attempts as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    total_attempts: u64,
    successful_parses: u64,
    cache_hits: u64,
    extractions: u64,
    strategies: BTreeMap<StrategyId, AttemptCounter>,
    vendors: BTreeMap<String, AttemptCounter>,
    confidence_buckets: [u64; CONFIDENCE_BUCKETS],
    confidence_sum: f64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one strategy run.
    pub fn record_attempt(&mut self, vendor: Option<&str>, result: &ParseResult) {
        self.total_attempts += 1;
        if result.success {
            self.successful_parses += 1;
        }

        self.strategies
            .entry(result.strategy_used)
            .or_default()
            .record(result.success);
        self.vendors
            .entry(vendor.unwrap_or(UNKNOWN_VENDOR).to_string())
            .or_default()
            .record(result.success);

        let confidence = result.confidence.clamp(0.0, 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bucket = ((confidence * CONFIDENCE_BUCKETS as f64) as usize).min(CONFIDENCE_BUCKETS - 1);
        self.confidence_buckets[bucket] += 1;
        self.confidence_sum += confidence;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    /// Count one top-level extraction call (cache hits included).
    pub fn record_extraction(&mut self) {
        self.extractions += 1;
    }

    /// Fold another set of counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total_attempts += other.total_attempts;
        self.successful_parses += other.successful_parses;
        self.cache_hits += other.cache_hits;
        self.extractions += other.extractions;
        for (strategy, counter) in &other.strategies {
            let mine = self.strategies.entry(*strategy).or_default();
            mine.attempts += counter.attempts;
            mine.successes += counter.successes;
        }
        for (vendor, counter) in &other.vendors {
            let mine = self.vendors.entry(vendor.clone()).or_default();
            mine.attempts += counter.attempts;
            mine.successes += counter.successes;
        }
        for (mine, theirs) in self.confidence_buckets.iter_mut().zip(other.confidence_buckets) {
            *mine += theirs;
        }
        self.confidence_sum += other.confidence_sum;
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> StatsSnapshot {
        let rate = |part: u64, whole: u64| if whole == 0 { 0.0 } else { part as f64 / whole as f64 };

        StatsSnapshot {
            extractions: self.extractions,
            total_attempts: self.total_attempts,
            successful_parses: self.successful_parses,
            cache_hits: self.cache_hits,
            overall_success_rate: rate(self.successful_parses, self.total_attempts),
            average_confidence: if self.total_attempts == 0 {
                0.0
            } else {
                self.confidence_sum / self.total_attempts as f64
            },
            strategy_success: self
                .strategies
                .iter()
                .map(|(id, counter)| (id.as_str().to_string(), *counter))
                .collect(),
            vendor_success_rates: self
                .vendors
                .iter()
                .map(|(vendor, counter)| (vendor.clone(), counter.success_rate()))
                .collect(),
            confidence_distribution: self.confidence_buckets,
        }
    }
}

/// Serializable view of [`ExtractionStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub extractions: u64,
    pub total_attempts: u64,
    pub successful_parses: u64,
    pub cache_hits: u64,
    pub overall_success_rate: f64,
    pub average_confidence: f64,
    pub strategy_success: BTreeMap<String, AttemptCounter>,
    pub vendor_success_rates: BTreeMap<String, f64>,
    /// Attempts per 0.1-wide confidence bucket, `[0.0, 0.1)` first
    pub confidence_distribution: [u64; CONFIDENCE_BUCKETS],
}

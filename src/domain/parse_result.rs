//! Strategy identifiers and per-strategy outcomes

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::vehicle_application::{VehicleApplication, dedup_applications};

/// Every extraction strategy the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    StructuredData,
    TableParser,
    ListParser,
    TextExtraction,
    /// Vendor-custom parser for fitment rendered as one unbroken string
    #[serde(alias = "custom_hawk_parser")]
    ConcatenatedText,
    /// Vendor-custom parser for `Years: .., Make: .., Model: ..` listings
    #[serde(alias = "custom_bilstein_parser")]
    LabeledFields,
    #[serde(alias = "machine_learning")]
    HeuristicMl,
    FallbackHeuristic,
}

impl StrategyId {
    pub const ALL: [Self; 8] = [
        Self::StructuredData,
        Self::TableParser,
        Self::ListParser,
        Self::TextExtraction,
        Self::ConcatenatedText,
        Self::LabeledFields,
        Self::HeuristicMl,
        Self::FallbackHeuristic,
    ];

    /// Chain used when no vendor could be identified.
    pub const GENERIC_CHAIN: [Self; 6] = [
        Self::StructuredData,
        Self::TableParser,
        Self::ListParser,
        Self::TextExtraction,
        Self::HeuristicMl,
        Self::FallbackHeuristic,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructuredData => "structured_data",
            Self::TableParser => "table_parser",
            Self::ListParser => "list_parser",
            Self::TextExtraction => "text_extraction",
            Self::ConcatenatedText => "concatenated_text",
            Self::LabeledFields => "labeled_fields",
            Self::HeuristicMl => "heuristic_ml",
            Self::FallbackHeuristic => "fallback_heuristic",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyId {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .or(match wanted.as_str() {
                "custom_hawk_parser" => Some(Self::ConcatenatedText),
                "custom_bilstein_parser" => Some(Self::LabeledFields),
                "machine_learning" => Some(Self::HeuristicMl),
                _ => None,
            })
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Monotone, capped confidence shape: `min(cap, count * per_item * quality)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceCurve {
    pub per_item: f64,
    pub cap: f64,
}

impl ConfidenceCurve {
    #[must_use]
    pub const fn new(per_item: f64, cap: f64) -> Self {
        Self { per_item, cap }
    }

    /// Confidence for `count` records whose average quality is `quality`.
    #[must_use]
    pub fn score(&self, count: usize, quality: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        (count as f64 * self.per_item * quality)
            .min(self.cap)
            .clamp(0.0, 1.0)
    }
}

/// Outcome of running one strategy on one document.
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub success: bool,
    pub applications: Vec<VehicleApplication>,
    pub confidence: f64,
    pub strategy_used: StrategyId,
    pub errors: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ParseResult {
    /// Successful iff at least one application survives deduplication;
    /// confidence is forced to zero otherwise.
    #[must_use]
    pub fn from_applications(
        strategy: StrategyId,
        applications: Vec<VehicleApplication>,
        confidence: f64,
    ) -> Self {
        let applications = dedup_applications(applications);
        let success = !applications.is_empty();
        Self {
            success,
            applications,
            confidence: if success { confidence.clamp(0.0, 1.0) } else { 0.0 },
            strategy_used: strategy,
            errors: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn failure(strategy: StrategyId, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            applications: Vec::new(),
            confidence: 0.0,
            strategy_used: strategy,
            errors: vec![error.to_string()],
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors.extend(errors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApplicationDraft, YearBounds};
    use rstest::rstest;

    #[rstest]
    #[case("structured_data", StrategyId::StructuredData)]
    #[case("custom_hawk_parser", StrategyId::ConcatenatedText)]
    #[case("CUSTOM_BILSTEIN_PARSER", StrategyId::LabeledFields)]
    #[case("machine_learning", StrategyId::HeuristicMl)]
    fn test_strategy_id_parsing(#[case] raw: &str, #[case] expected: StrategyId) {
        assert_eq!(raw.parse::<StrategyId>().unwrap(), expected);
    }

    #[test]
    fn test_strategy_id_serde_aliases() {
        let parsed: Vec<StrategyId> =
            serde_json::from_str(r#"["custom_hawk_parser","table_parser"]"#).unwrap();
        assert_eq!(parsed, vec![StrategyId::ConcatenatedText, StrategyId::TableParser]);
        assert_eq!(
            serde_json::to_string(&StrategyId::LabeledFields).unwrap(),
            "\"labeled_fields\""
        );
        assert!("telepathy".parse::<StrategyId>().is_err());
    }

    #[test]
    fn test_generic_chain_ends_in_fallback() {
        assert_eq!(StrategyId::GENERIC_CHAIN.last(), Some(&StrategyId::FallbackHeuristic));
    }

    #[test]
    fn test_confidence_curve_is_capped_and_monotone() {
        let curve = ConfidenceCurve::new(0.25, 0.98);
        assert!((curve.score(0, 1.0) - 0.0).abs() < f64::EPSILON);
        assert!((curve.score(2, 1.0) - 0.5).abs() < 1e-9);
        assert!((curve.score(10, 1.0) - 0.98).abs() < 1e-9);
        let mut previous = 0.0;
        for n in 0..20 {
            let score = curve.score(n, 1.0);
            assert!(score >= previous);
            previous = score;
        }
    }

    #[test]
    fn test_empty_result_has_zero_confidence() {
        let result = ParseResult::from_applications(StrategyId::TableParser, Vec::new(), 0.8);
        assert!(!result.success);
        assert!(result.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn test_result_deduplicates() {
        let app = ApplicationDraft::new(2019, "Honda", "Civic")
            .build(&YearBounds::default())
            .unwrap();
        let result = ParseResult::from_applications(
            StrategyId::ListParser,
            vec![app.clone(), app],
            0.3,
        );
        assert!(result.success);
        assert_eq!(result.applications.len(), 1);
    }
}

//! Extraction strategies
//!
//! Every strategy is a pure function of a [`ParseContext`]: it reads the
//! document, proposes fitment records and reports how much it trusts them.
//! [`Strategy`] is a tagged union whose variants carry their own parameters,
//! so dispatch is a single `match` and tuning comes from configuration.

pub mod heuristic;
pub mod list;
pub mod structured_data;
pub mod table;
pub mod text;
pub mod vendor_custom;

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use super::segmenter::TextSegmenter;
use super::{ContextualParser, ParseContext, ParsingError, ParsingResult};
use crate::domain::{
    ApplicationDraft, ConfidenceCurve, ParseResult, StrategyId, VehicleApplication, YearBounds,
    dedup_applications,
};
use crate::infrastructure::config::{HeuristicTuning, TuningConfig};

static YEAR_RANGE_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})(?:\s*[-–—]\s*(\d{4}))?").expect("valid year range regex")
});

/// What a strategy found before scoring.
#[derive(Debug, Default)]
pub struct Extraction {
    pub applications: Vec<VehicleApplication>,
    /// Average plausibility of the records, 1.0 for deterministic strategies
    pub quality: f64,
    pub errors: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Extraction {
    pub fn new(applications: Vec<VehicleApplication>) -> Self {
        Self {
            applications,
            quality: 1.0,
            ..Self::default()
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

    #[must_use]
    pub const fn with_quality(mut self, quality: f64) -> Self {
        self.quality = quality;
        self
    }
}

/// One configured strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    StructuredData {
        curve: ConfidenceCurve,
    },
    TableParser {
        curve: ConfidenceCurve,
    },
    ListParser {
        curve: ConfidenceCurve,
        min_item_len: usize,
        segmenter: TextSegmenter,
    },
    TextExtraction {
        curve: ConfidenceCurve,
    },
    ConcatenatedText {
        curve: ConfidenceCurve,
        segmenter: TextSegmenter,
    },
    LabeledFields {
        curve: ConfidenceCurve,
    },
    HeuristicMl {
        curve: ConfidenceCurve,
        tuning: HeuristicTuning,
    },
    FallbackHeuristic {
        curve: ConfidenceCurve,
        min_year: i32,
        max_year: i32,
    },
}

impl Strategy {
    /// Build the strategy `id` with parameters from `tuning`.
    pub fn configure(id: StrategyId, tuning: &TuningConfig, bounds: YearBounds) -> Self {
        let curve = tuning.curve(id);
        match id {
            StrategyId::StructuredData => Self::StructuredData { curve },
            StrategyId::TableParser => Self::TableParser { curve },
            StrategyId::ListParser => Self::ListParser {
                curve,
                min_item_len: tuning.list_min_item_len,
                segmenter: TextSegmenter::new(bounds, tuning),
            },
            StrategyId::TextExtraction => Self::TextExtraction { curve },
            StrategyId::ConcatenatedText => Self::ConcatenatedText {
                curve,
                segmenter: TextSegmenter::new(bounds, tuning),
            },
            StrategyId::LabeledFields => Self::LabeledFields { curve },
            StrategyId::HeuristicMl => Self::HeuristicMl {
                curve,
                tuning: tuning.heuristic.clone(),
            },
            StrategyId::FallbackHeuristic => Self::FallbackHeuristic {
                curve,
                min_year: tuning.fallback_min_year,
                max_year: tuning.fallback_max_year,
            },
        }
    }

    pub const fn id(&self) -> StrategyId {
        match self {
            Self::StructuredData { .. } => StrategyId::StructuredData,
            Self::TableParser { .. } => StrategyId::TableParser,
            Self::ListParser { .. } => StrategyId::ListParser,
            Self::TextExtraction { .. } => StrategyId::TextExtraction,
            Self::ConcatenatedText { .. } => StrategyId::ConcatenatedText,
            Self::LabeledFields { .. } => StrategyId::LabeledFields,
            Self::HeuristicMl { .. } => StrategyId::HeuristicMl,
            Self::FallbackHeuristic { .. } => StrategyId::FallbackHeuristic,
        }
    }

    pub const fn curve(&self) -> ConfidenceCurve {
        match self {
            Self::StructuredData { curve }
            | Self::TableParser { curve }
            | Self::ListParser { curve, .. }
            | Self::TextExtraction { curve }
            | Self::ConcatenatedText { curve, .. }
            | Self::LabeledFields { curve }
            | Self::HeuristicMl { curve, .. }
            | Self::FallbackHeuristic { curve, .. } => *curve,
        }
    }

    /// Run the strategy and score its output. Never fails: internal errors
    /// come back as an unsuccessful result carrying the message.
    pub fn apply(&self, ctx: &ParseContext<'_>) -> ParseResult {
        let id = self.id();

        match self.parse_with_context(ctx) {
            Ok(extraction) => {
                let applications = dedup_applications(extraction.applications);
                let confidence = self.curve().score(applications.len(), extraction.quality);
                let mut result = ParseResult::from_applications(id, applications, confidence)
                    .with_errors(extraction.errors);
                result.metadata.extend(extraction.metadata);
                result
            }
            Err(e) => {
                debug!(strategy = %id, error = %e, "Strategy failed");
                ParseResult::failure(id, e)
            }
        }
    }
}

impl ContextualParser for Strategy {
    type Output = Extraction;

    fn parse_with_context(&self, ctx: &ParseContext<'_>) -> ParsingResult<Extraction> {
        if ctx.is_blank() {
            return Err(ParsingError::empty_document(ctx.document.source_identity()));
        }

        match self {
            Self::StructuredData { .. } => structured_data::extract(ctx),
            Self::TableParser { .. } => table::extract(ctx),
            Self::ListParser {
                min_item_len,
                segmenter,
                ..
            } => list::extract(ctx, segmenter, *min_item_len),
            Self::TextExtraction { .. } => text::extract(ctx),
            Self::ConcatenatedText { segmenter, .. } => vendor_custom::extract_concatenated(ctx, segmenter),
            Self::LabeledFields { .. } => vendor_custom::extract_labeled(ctx),
            Self::HeuristicMl { tuning, .. } => heuristic::extract_scored(ctx, tuning),
            Self::FallbackHeuristic {
                min_year, max_year, ..
            } => heuristic::extract_loose(ctx, *min_year, *max_year),
        }
    }
}

/// Every strategy, configured once and shared by all extraction calls.
#[derive(Debug, Clone)]
pub struct StrategySet {
    strategies: Vec<Strategy>,
}

impl StrategySet {
    pub fn new(tuning: &TuningConfig, bounds: YearBounds) -> Self {
        Self {
            strategies: StrategyId::ALL
                .into_iter()
                .map(|id| Strategy::configure(id, tuning, bounds))
                .collect(),
        }
    }

    pub fn get(&self, id: StrategyId) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.id() == id)
    }

    /// Run one strategy by id.
    pub fn run(&self, id: StrategyId, ctx: &ParseContext<'_>) -> ParseResult {
        self.get(id).map_or_else(
            || ParseResult::failure(id, format!("strategy {id} is not configured")),
            |strategy| strategy.apply(ctx),
        )
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::new(&TuningConfig::default(), YearBounds::default())
    }
}

/// Parse `2019`, `2019-2021` or `2019 – 2021`.
pub(crate) fn parse_year_range(text: &str) -> Option<(i32, Option<i32>)> {
    let caps = YEAR_RANGE_VALUE.captures(text)?;
    let start = caps.get(1)?.as_str().parse().ok()?;
    let end = caps.get(2).and_then(|m| m.as_str().parse().ok());
    Some((start, end))
}

/// Draft from a pattern using the named groups `years` or `start`/`end`,
/// `make`, `model` and optionally `trim`, `engine`.
pub(crate) fn draft_from_captures(caps: &Captures<'_>) -> Option<ApplicationDraft> {
    let (start, end) = match caps.name("years") {
        Some(years) => parse_year_range(years.as_str())?,
        None => (
            caps.name("start")?.as_str().parse().ok()?,
            caps.name("end").and_then(|m| m.as_str().parse().ok()),
        ),
    };

    let text = |name: &str| caps.name(name).map(|m| m.as_str().trim().to_string());

    let mut draft = ApplicationDraft::new(start, text("make")?, text("model")?)
        .with_trim(text("trim"))
        .with_engine(text("engine"));
    draft.year_end = end;
    Some(draft)
}

/// Validate drafts, logging and dropping the rejects.
pub(crate) fn build_all(
    drafts: impl IntoIterator<Item = ApplicationDraft>,
    bounds: &YearBounds,
) -> Vec<VehicleApplication> {
    drafts
        .into_iter()
        .filter_map(|draft| match draft.clone().build(bounds) {
            Ok(application) => Some(application),
            Err(reason) => {
                debug!(?draft, %reason, "Rejected fitment record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceDocument;

    #[test]
    fn test_parse_year_range() {
        assert_eq!(parse_year_range("2019"), Some((2019, None)));
        assert_eq!(parse_year_range("2019-2021"), Some((2019, Some(2021))));
        assert_eq!(parse_year_range("2005 – 2023"), Some((2005, Some(2023))));
        assert_eq!(parse_year_range("n/a"), None);
    }

    #[test]
    fn test_every_strategy_fails_cleanly_on_empty_html() {
        let set = StrategySet::default();
        for html in ["", "   \n  "] {
            let doc = SourceDocument::new("https://example.com/p/1", html);
            let ctx = ParseContext::new(&doc, "P-1");
            for id in StrategyId::ALL {
                let result = set.run(id, &ctx);
                assert!(!result.success, "{id} succeeded on empty html");
                assert!(result.applications.is_empty());
                assert!(result.confidence.abs() < f64::EPSILON);
                assert_eq!(result.strategy_used, id);
                assert_eq!(result.errors.len(), 1);
            }
        }
    }

    #[test]
    fn test_every_strategy_finds_nothing_in_unrelated_markup() {
        let set = StrategySet::default();
        let doc = SourceDocument::new(
            "https://example.com/p/1",
            "<html><body><h1>Gift card</h1><p>Redeemable online.</p></body></html>",
        );
        let ctx = ParseContext::new(&doc, "GC-25");
        for id in StrategyId::ALL {
            let result = set.run(id, &ctx);
            assert!(!result.success, "{id} invented applications");
            assert!(result.errors.is_empty(), "{id} reported {:?}", result.errors);
        }
    }

    #[test]
    fn test_strategy_ids_round_trip_through_configure() {
        let tuning = TuningConfig::default();
        for id in StrategyId::ALL {
            let strategy = Strategy::configure(id, &tuning, YearBounds::default());
            assert_eq!(strategy.id(), id);
            assert_eq!(strategy.curve(), tuning.curve(id));
        }
    }
}

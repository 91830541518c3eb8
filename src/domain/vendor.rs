//! Vendor extraction profiles

use serde::{Deserialize, Serialize};

use super::parse_result::StrategyId;

/// Ordered strategy preference for one vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsingRules {
    pub primary: StrategyId,
    #[serde(default)]
    pub fallbacks: Vec<StrategyId>,
}

/// Named regex patterns a vendor's pages are known to follow.
///
/// `concatenated` marks where one vehicle ends and the next begins inside a
/// run-together fitment string. `structured` and `simple` are searched on page
/// text and must expose the named groups `make` and `model` plus either
/// `years` or `start` (and optionally `end`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorPatterns {
    pub concatenated: Option<String>,
    pub structured: Option<String>,
    pub simple: Option<String>,
}

impl VendorPatterns {
    /// Text patterns in the order they should be tried.
    pub fn text_patterns(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("structured", &self.structured), ("simple", &self.simple)]
            .into_iter()
            .filter_map(|(name, pattern)| pattern.as_deref().map(|p| (name, p)))
    }
}

/// One vendor's extraction profile. Read-only once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Registry key, e.g. `BILSTEIN`
    pub key: String,
    pub brand_names: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    /// 0 (unknown reseller) to 100 (the manufacturer itself)
    #[serde(default)]
    pub authority_score: u8,
    pub parsing_rules: ParsingRules,
    /// CSS selectors hinting where fitment lives on the vendor's pages
    #[serde(default)]
    pub selectors: Vec<String>,
    #[serde(default)]
    pub patterns: VendorPatterns,
}

impl VendorConfig {
    /// `[primary] + fallbacks`, skipping repeats.
    #[must_use]
    pub fn strategy_chain(&self) -> Vec<StrategyId> {
        let mut chain = vec![self.parsing_rules.primary];
        for fallback in &self.parsing_rules.fallbacks {
            if !chain.contains(fallback) {
                chain.push(*fallback);
            }
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_config_from_json() {
        let json = r#"{
            "key": "MOOG",
            "brand_names": ["Moog", "MOOG Parts"],
            "domains": ["moogparts.com"],
            "authority_score": 90,
            "parsing_rules": {"primary": "table_parser", "fallbacks": ["text_extraction", "table_parser"]},
            "patterns": {"simple": "(?P<years>\\d{4})\\s+(?P<make>\\w+)\\s+(?P<model>\\w+)"}
        }"#;
        let config: VendorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(
            config.strategy_chain(),
            vec![StrategyId::TableParser, StrategyId::TextExtraction]
        );
        assert!(config.selectors.is_empty());
        assert_eq!(config.patterns.text_patterns().count(), 1);
    }
}

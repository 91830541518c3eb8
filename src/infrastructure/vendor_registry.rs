//! Vendor registry
//!
//! Maps brand names and URLs to vendor extraction profiles. The registry is
//! built once at startup (patterns and selectors compiled up front) and then
//! shared read-only behind an `Arc`.

pub mod catalog;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::Selector;
use tracing::{debug, info};
use url::Url;

use crate::domain::{StrategyId, VendorConfig};
use crate::infrastructure::config::defaults;
use crate::infrastructure::parsing::html_text::compile_selectors;
use crate::infrastructure::parsing::ParsingError;

/// Words shorter than this never take part in substring matching.
const MIN_PARTIAL_LEN: usize = 3;

/// A vendor configuration with its selectors and patterns compiled.
#[derive(Debug, Clone)]
pub struct VendorProfile {
    pub config: VendorConfig,
    pub selectors: Vec<Selector>,
    /// Boundary pattern for run-together fitment text
    pub boundary: Option<Regex>,
    /// Named text patterns in the order they are tried
    pub text_patterns: Vec<(String, Regex)>,
}

impl VendorProfile {
    pub fn compile(config: VendorConfig) -> Result<Self> {
        let key = config.key.clone();

        let selectors = compile_selectors(&config.selectors)
            .with_context(|| format!("Vendor {key} has no usable selectors"))?;

        let compile_pattern = |name: &str, pattern: &str| {
            Regex::new(pattern).map_err(|e| ParsingError::invalid_pattern(&key, name, e))
        };

        let boundary = config
            .patterns
            .concatenated
            .as_deref()
            .map(|p| compile_pattern("concatenated", p))
            .transpose()?;

        let text_patterns = config
            .patterns
            .text_patterns()
            .map(|(name, p)| compile_pattern(name, p).map(|re| (name.to_string(), re)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            selectors,
            boundary,
            text_patterns,
        })
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }
}

/// Ordered, immutable table of vendor profiles.
#[derive(Debug, Clone)]
pub struct VendorRegistry {
    vendors: Vec<VendorProfile>,
    /// Every lookup name with the index of its vendor, in insertion order
    brand_index: Vec<(String, usize)>,
}

impl VendorRegistry {
    /// Registry with the built-in vendor table.
    pub fn with_builtin_catalog() -> Result<Self> {
        Self::from_configs(catalog::builtin_vendors())
    }

    /// Built-in table plus configured vendors. An extra vendor whose key
    /// already exists replaces the built-in entry in place.
    pub fn with_extra_vendors(extra: &[VendorConfig]) -> Result<Self> {
        let mut configs = catalog::builtin_vendors();
        for vendor in extra {
            match configs.iter_mut().find(|c| c.key == vendor.key) {
                Some(existing) => *existing = vendor.clone(),
                None => configs.push(vendor.clone()),
            }
        }
        Self::from_configs(configs)
    }

    pub fn from_configs(configs: Vec<VendorConfig>) -> Result<Self> {
        let vendors = configs
            .into_iter()
            .map(|config| {
                let key = config.key.clone();
                VendorProfile::compile(config)
                    .with_context(|| format!("Failed to compile vendor profile {key}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut brand_index = Vec::new();
        for (idx, vendor) in vendors.iter().enumerate() {
            for name in &vendor.config.brand_names {
                brand_index.push((name.clone(), idx));
                // Compound names are also reachable through their longer words.
                if name.contains(' ') {
                    for part in name.split_whitespace() {
                        if part.chars().count() >= MIN_PARTIAL_LEN {
                            brand_index.push((part.to_string(), idx));
                        }
                    }
                }
            }
        }

        info!(
            "Vendor registry ready: {} vendors, {} brand names",
            vendors.len(),
            brand_index.len()
        );
        Ok(Self {
            vendors,
            brand_index,
        })
    }

    /// Resolve a brand to a vendor key: exact match, then case-insensitive,
    /// then substring containment in either direction.
    pub fn identify_vendor_by_brand(&self, brand: &str) -> Option<&str> {
        let brand = brand.trim();
        if brand.is_empty() {
            return None;
        }
        let upper = brand.to_uppercase();

        let found = self
            .brand_index
            .iter()
            .find(|(name, _)| name == brand)
            .or_else(|| {
                self.brand_index
                    .iter()
                    .find(|(name, _)| name.to_uppercase() == upper)
            })
            .or_else(|| {
                if upper.chars().count() < MIN_PARTIAL_LEN {
                    return None;
                }
                self.brand_index.iter().find(|(name, _)| {
                    let name = name.to_uppercase();
                    name.chars().count() >= MIN_PARTIAL_LEN
                        && (name.contains(&upper) || upper.contains(&name))
                })
            })
            .map(|(_, idx)| self.vendors[*idx].key());

        debug!(brand, vendor = ?found, "Brand lookup");
        found
    }

    /// Resolve a URL to a vendor key by its host. A registered domain, or the
    /// last two labels of it, must occur in the host.
    pub fn identify_vendor_by_domain(&self, url: &str) -> Option<&str> {
        let host = Url::parse(url.trim())
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase))
            .unwrap_or_else(|| url.trim().to_lowercase());
        if host.is_empty() {
            return None;
        }

        self.vendors
            .iter()
            .find(|vendor| {
                vendor.config.domains.iter().any(|domain| {
                    let domain = domain.to_lowercase();
                    host.contains(&domain) || host.contains(two_label_suffix(&domain))
                })
            })
            .map(VendorProfile::key)
    }

    /// Strategies to run, in order, for `vendor_key` (generic chain if none).
    pub fn get_strategy_chain(&self, vendor_key: Option<&str>) -> Vec<StrategyId> {
        vendor_key
            .and_then(|key| self.profile(key))
            .map_or_else(
                || StrategyId::GENERIC_CHAIN.to_vec(),
                |vendor| vendor.config.strategy_chain(),
            )
    }

    pub fn profile(&self, vendor_key: &str) -> Option<&VendorProfile> {
        self.vendors.iter().find(|v| v.key() == vendor_key)
    }

    pub fn vendors(&self) -> impl Iterator<Item = &VendorProfile> {
        self.vendors.iter()
    }

    pub fn authority_score(&self, vendor_key: &str) -> Option<u8> {
        self.profile(vendor_key).map(|v| v.config.authority_score)
    }

    /// Vendor selectors, or the generic fitment selectors for unknown vendors.
    pub fn selectors(&self, vendor_key: Option<&str>) -> Vec<String> {
        vendor_key
            .and_then(|key| self.profile(key))
            .filter(|v| !v.config.selectors.is_empty())
            .map_or_else(
                || {
                    defaults::FITMENT_SELECTORS
                        .iter()
                        .map(|s| (*s).to_string())
                        .collect()
                },
                |v| v.config.selectors.clone(),
            )
    }

    /// Every brand name the registry answers to, sorted and deduplicated.
    pub fn all_supported_brands(&self) -> Vec<String> {
        self.vendors
            .iter()
            .flat_map(|v| v.config.brand_names.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

fn two_label_suffix(domain: &str) -> &str {
    domain
        .rmatch_indices('.')
        .nth(1)
        .map_or(domain, |(idx, _)| &domain[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ParsingRules, VendorPatterns};
    use rstest::rstest;

    fn registry() -> VendorRegistry {
        VendorRegistry::with_builtin_catalog().unwrap()
    }

    #[rstest]
    #[case("BILSTEIN", Some("BILSTEIN"))]
    #[case("bilstein", Some("BILSTEIN"))]
    #[case("Motorcraft", Some("FORD"))]
    #[case("Hawk Performance Brakes", Some("HAWK_PERFORMANCE"))]
    #[case("Performance", Some("HAWK_PERFORMANCE"))]
    #[case("K&N", Some("KN_FILTERS"))]
    #[case("chevy", Some("CHEVROLET"))]
    #[case("Zzyzx Widgets", None)]
    #[case("", None)]
    fn test_identify_vendor_by_brand(#[case] brand: &str, #[case] expected: Option<&str>) {
        assert_eq!(registry().identify_vendor_by_brand(brand), expected);
    }

    #[rstest]
    #[case("https://www.bilstein.com/en/products/24-186728", Some("BILSTEIN"))]
    #[case("https://shop.motorcraft.com/part/BRF-1", Some("FORD"))]
    #[case("https://parts.ford.com/shop/en/us/brake-pads", Some("FORD"))]
    #[case("https://hawkperformance.com/hb-453f", Some("HAWK_PERFORMANCE"))]
    #[case("https://example.org/fitment", None)]
    #[case("", None)]
    fn test_identify_vendor_by_domain(#[case] url: &str, #[case] expected: Option<&str>) {
        assert_eq!(registry().identify_vendor_by_domain(url), expected);
    }

    #[test]
    fn test_two_label_suffix() {
        assert_eq!(two_label_suffix("parts.ford.com"), "ford.com");
        assert_eq!(two_label_suffix("ford.com"), "ford.com");
        assert_eq!(two_label_suffix("localhost"), "localhost");
    }

    #[test]
    fn test_strategy_chains() {
        let registry = registry();

        let generic = registry.get_strategy_chain(None);
        assert!(!generic.is_empty());
        assert_eq!(generic.last(), Some(&StrategyId::FallbackHeuristic));
        assert_eq!(registry.get_strategy_chain(Some("NOPE")), generic);

        let bilstein = registry.get_strategy_chain(Some("BILSTEIN"));
        assert_eq!(bilstein[0], StrategyId::LabeledFields);
        assert_eq!(
            registry.get_strategy_chain(Some("HAWK_PERFORMANCE"))[0],
            StrategyId::ConcatenatedText
        );
    }

    #[test]
    fn test_every_builtin_vendor_compiles_patterns() {
        let registry = registry();
        assert_eq!(registry.len(), 16);
        for vendor in registry.vendors() {
            assert!(!vendor.selectors.is_empty(), "{} has no selectors", vendor.key());
            assert!(!vendor.text_patterns.is_empty(), "{} has no text patterns", vendor.key());
            assert!(vendor.config.authority_score <= 100);
        }
        assert!(registry.profile("HAWK_PERFORMANCE").unwrap().boundary.is_some());
    }

    #[test]
    fn test_introspection() {
        let registry = registry();
        let brands = registry.all_supported_brands();
        assert!(brands.windows(2).all(|w| w[0] < w[1]));
        assert!(brands.contains(&"Bilstein".to_string()));

        assert_eq!(registry.authority_score("FORD"), Some(95));
        assert_eq!(registry.authority_score("NOPE"), None);
        assert_eq!(
            registry.selectors(None).len(),
            defaults::FITMENT_SELECTORS.len()
        );
        assert!(registry.selectors(Some("BREMBO")).contains(&".vehicle-application".to_string()));
    }

    fn moog() -> VendorConfig {
        VendorConfig {
            key: "MOOG".into(),
            brand_names: vec!["Moog".into()],
            domains: vec!["moogparts.com".into()],
            authority_score: 86,
            parsing_rules: ParsingRules {
                primary: StrategyId::TableParser,
                fallbacks: vec![StrategyId::TextExtraction],
            },
            selectors: vec![".moog-fitment".into()],
            patterns: VendorPatterns::default(),
        }
    }

    #[test]
    fn test_extra_vendors_extend_the_table() {
        let registry = VendorRegistry::with_extra_vendors(&[moog()]).unwrap();
        assert_eq!(registry.len(), 17);
        assert_eq!(registry.identify_vendor_by_brand("MOOG"), Some("MOOG"));
        assert_eq!(
            registry.identify_vendor_by_domain("https://www.moogparts.com/p/K750"),
            Some("MOOG")
        );
    }

    #[test]
    fn test_extra_vendor_replaces_builtin_with_same_key() {
        let mut brembo = moog();
        brembo.key = "BREMBO".into();
        brembo.brand_names = vec!["Brembo".into()];
        let registry = VendorRegistry::with_extra_vendors(&[brembo]).unwrap();
        assert_eq!(registry.len(), 16);
        assert_eq!(registry.authority_score("BREMBO"), Some(86));
    }

    #[test]
    fn test_invalid_vendor_pattern_is_reported() {
        let mut broken = moog();
        broken.patterns.simple = Some("(?P<years>\\d{4}".into());
        let err = VendorRegistry::from_configs(vec![broken]).unwrap_err();
        assert!(format!("{err:#}").contains("MOOG"));
    }
}

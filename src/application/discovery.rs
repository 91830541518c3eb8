//! Candidate document discovery
//!
//! The engine does not fetch anything. These helpers only decide which URLs
//! are worth fetching for a part, and in which order fetched documents should
//! be handed to the orchestrator. The `discover` subcommand prints
//! [`candidate_urls`] for an external fetcher; batch suppliers use
//! [`rank_by_authority`].

use url::Url;

use crate::domain::SourceDocument;
use crate::infrastructure::vendor_registry::VendorRegistry;

/// Upper bound on suggested URLs per part
pub const MAX_CANDIDATE_URLS: usize = 10;

/// Official domains of a vendor that get direct URL guesses
const DOMAINS_PER_VENDOR: usize = 2;

const PRODUCT_PATHS: &[&str] = &["product", "parts", "catalog"];

const GENERIC_SEARCH_ENDPOINT: &str = "https://www.google.com/search";

/// Links found by an earlier search, e.g. by an image-search collaborator.
pub trait SearchResultHints {
    fn result_links(&self) -> Vec<String>;
}

impl SearchResultHints for Vec<String> {
    fn result_links(&self) -> Vec<String> {
        self.clone()
    }
}

/// Part number reduced to `[A-Za-z0-9_-]`, spaces becoming hyphens.
pub fn sanitize_part_number(part_number: &str) -> String {
    part_number
        .trim()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

fn generic_searches(part_number: &str, brand: &str) -> Vec<String> {
    [
        format!("{brand} {part_number} vehicle fitment compatibility"),
        format!("\"{part_number}\" {brand} applications"),
    ]
    .into_iter()
    .filter_map(|query| Url::parse_with_params(GENERIC_SEARCH_ENDPOINT, &[("q", query)]).ok())
    .map(String::from)
    .collect()
}

/// URLs worth fetching for a part, best first: search hints, then guesses on
/// the vendor's official domains, then generic web searches when neither
/// produced anything.
pub fn candidate_urls(
    part_number: &str,
    brand: &str,
    registry: &VendorRegistry,
    hints: Option<&dyn SearchResultHints>,
) -> Vec<String> {
    let mut urls: Vec<String> = hints.map(|h| h.result_links()).unwrap_or_default();

    let safe_part = sanitize_part_number(part_number);
    let vendor = registry
        .identify_vendor_by_brand(brand)
        .and_then(|key| registry.profile(key));

    if let Some(vendor) = vendor.filter(|_| !safe_part.is_empty()) {
        for domain in vendor.config.domains.iter().take(DOMAINS_PER_VENDOR) {
            urls.extend(
                PRODUCT_PATHS
                    .iter()
                    .map(|path| format!("https://{domain}/{path}/{safe_part}")),
            );
            urls.push(format!("https://{domain}/search?q={safe_part}"));
        }
    }

    if urls.is_empty() && !part_number.trim().is_empty() {
        urls = generic_searches(part_number.trim(), brand.trim());
    }

    let mut seen = std::collections::HashSet::new();
    urls.retain(|url| seen.insert(url.clone()));
    urls.truncate(MAX_CANDIDATE_URLS);
    urls
}

/// Stable sort by the authority of the vendor owning each document's domain;
/// documents on unknown domains rank as 0.
pub fn rank_by_authority(documents: &mut [SourceDocument], registry: &VendorRegistry) {
    documents.sort_by_cached_key(|doc| {
        let score = registry
            .identify_vendor_by_domain(&doc.source_url)
            .and_then(|key| registry.authority_score(key))
            .unwrap_or(0);
        std::cmp::Reverse(score)
    });
}

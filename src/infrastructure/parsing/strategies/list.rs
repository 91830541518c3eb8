//! List items that each describe one vehicle

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;

use super::Extraction;
use crate::domain::vehicle_application::collapse_whitespace;
use crate::infrastructure::parsing::html_text::{element_text, static_selector};
use crate::infrastructure::parsing::{ParseContext, ParsingResult, TextSegmenter};

static LIST_ITEM: Lazy<Selector> = Lazy::new(|| static_selector("li"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").expect("valid year regex"));

pub fn extract(
    ctx: &ParseContext<'_>,
    segmenter: &TextSegmenter,
    min_item_len: usize,
) -> ParsingResult<Extraction> {
    let mut candidates = 0usize;

    let applications = ctx
        .html()
        .select(&LIST_ITEM)
        .map(|item| collapse_whitespace(&element_text(item)))
        .filter(|text| text.chars().count() > min_item_len && YEAR.is_match(text))
        .inspect(|_| candidates += 1)
        .filter_map(|text| segmenter.parse_single(&text))
        .collect();

    Ok(Extraction::new(applications).with_metadata("candidate_items", candidates))
}

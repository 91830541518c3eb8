//! Vendor-guided strategies
//!
//! Both read the text of the vendor's fitment containers. The concatenated
//! strategy hands that text to the segmenter (with the vendor's boundary
//! pattern when it has one); the labeled strategy reads
//! `Years: 2005 – 2023, Make: TOYOTA, Model: Tacoma` style records.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use super::{Extraction, build_all, draft_from_captures, parse_year_range};
use crate::domain::ApplicationDraft;
use crate::domain::vehicle_application::collapse_whitespace;
use crate::infrastructure::config::defaults;
use crate::infrastructure::parsing::html_text::{compile_selectors, element_text};
use crate::infrastructure::parsing::{ParseContext, ParsingResult, TextSegmenter};

/// Containers with less text than this cannot hold a vehicle list.
const SUBSTANTIAL_TEXT_LEN: usize = 20;

static GENERIC_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| compile_selectors(defaults::FITMENT_SELECTORS).unwrap_or_default());

static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(years?|make|model|trim|sub-?model|engine|position)\s*:\s*")
        .expect("valid label regex")
});

fn container_texts(ctx: &ParseContext<'_>) -> Vec<String> {
    let selectors = ctx
        .vendor
        .map(|vendor| vendor.selectors.as_slice())
        .filter(|selectors| !selectors.is_empty())
        .unwrap_or(GENERIC_SELECTORS.as_slice());

    let mut seen: Vec<ElementRef<'_>> = Vec::new();
    for selector in selectors {
        for element in ctx.html().select(selector) {
            if !seen.contains(&element) {
                seen.push(element);
            }
        }
    }

    seen.into_iter()
        .map(|element| collapse_whitespace(&element_text(element)))
        .filter(|text| !text.is_empty())
        .collect()
}

pub fn extract_concatenated(
    ctx: &ParseContext<'_>,
    segmenter: &TextSegmenter,
) -> ParsingResult<Extraction> {
    let segmenter = match ctx.vendor.and_then(|vendor| vendor.boundary.clone()) {
        Some(boundary) => segmenter.clone().with_boundary(boundary),
        None => segmenter.clone(),
    };

    let texts = container_texts(ctx);
    let applications = texts
        .iter()
        .filter(|text| text.chars().count() > SUBSTANTIAL_TEXT_LEN)
        .flat_map(|text| segmenter.segment(text))
        .collect();

    Ok(Extraction::new(applications).with_metadata("elements_found", texts.len()))
}

fn canonical_label(label: &str) -> &'static str {
    match label.to_lowercase().replace('-', "").as_str() {
        "year" | "years" => "years",
        "make" => "make",
        "model" => "model",
        "engine" => "engine",
        "position" => "position",
        _ => "trim",
    }
}

fn record_draft(fields: &HashMap<&'static str, String>) -> Option<ApplicationDraft> {
    let (start, end) = parse_year_range(fields.get("years")?)?;
    let field = |name: &str| fields.get(name).cloned();

    let mut draft = ApplicationDraft::new(start, field("make")?, field("model")?)
        .with_trim(field("trim"))
        .with_engine(field("engine"))
        .with_position(field("position"));
    draft.year_end = end;
    Some(draft)
}

/// Every labeled record in `text`. A label seen twice starts a new record.
fn labeled_drafts(text: &str) -> Vec<ApplicationDraft> {
    let labels: Vec<(usize, usize, &'static str)> = LABEL
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), canonical_label(caps.get(1)?.as_str())))
        })
        .collect();

    let mut drafts = Vec::new();
    let mut record: HashMap<&'static str, String> = HashMap::new();

    for (idx, (_, value_start, name)) in labels.iter().enumerate() {
        let value_end = labels.get(idx + 1).map_or(text.len(), |(start, _, _)| *start);
        let value = text[*value_start..value_end]
            .trim()
            .trim_end_matches([',', ';', '|'])
            .trim();

        if record.contains_key(name) {
            drafts.extend(record_draft(&record));
            record.clear();
        }
        if !value.is_empty() {
            record.insert(*name, value.to_string());
        }
    }
    drafts.extend(record_draft(&record));
    drafts
}

pub fn extract_labeled(ctx: &ParseContext<'_>) -> ParsingResult<Extraction> {
    let mut texts = container_texts(ctx);
    if texts.is_empty() {
        texts.push(collapse_whitespace(ctx.visible_text()));
    }

    let structured = ctx.vendor.and_then(|vendor| {
        vendor
            .text_patterns
            .iter()
            .find(|(name, _)| name == "structured")
            .map(|(_, pattern)| pattern)
    });

    let mut drafts = Vec::new();
    for text in &texts {
        let found = labeled_drafts(text);
        if found.is_empty() {
            if let Some(pattern) = structured {
                drafts.extend(pattern.captures_iter(text).filter_map(|caps| draft_from_captures(&caps)));
            }
        } else {
            drafts.extend(found);
        }
    }

    Ok(Extraction::new(build_all(drafts, &ctx.bounds)).with_metadata("containers", texts.len()))
}

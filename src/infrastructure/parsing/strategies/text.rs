//! Free-text year/make/model patterns over the rendered page

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Extraction, build_all, draft_from_captures};
use crate::infrastructure::parsing::{MAKE_LEXICON, ParseContext, ParsingResult};
use crate::infrastructure::vendor_registry::catalog::{MODEL_TOKEN, YEAR_RANGE};

/// `<years> <make> <model>` and `<make> <model> <years>` over known makes.
static GENERIC_PATTERNS: Lazy<Vec<(String, Regex)>> = Lazy::new(|| {
    let makes = MAKE_LEXICON.alternation();
    [
        (
            "year_make_model",
            format!(r"(?i)\b(?P<years>{YEAR_RANGE})[ \t]+(?P<make>{makes})[ \t]+(?P<model>{MODEL_TOKEN})"),
        ),
        (
            "make_model_year",
            format!(r"(?i)\b(?P<make>{makes})[ \t]+(?P<model>{MODEL_TOKEN})[ \t]+(?P<years>{YEAR_RANGE})\b"),
        ),
    ]
    .into_iter()
    .map(|(name, source)| {
        let regex = Regex::new(&source).expect("generic fitment pattern is a valid regex");
        (name.to_string(), regex)
    })
    .collect()
});

fn overlaps(taken: &[Range<usize>], span: &Range<usize>) -> bool {
    taken.iter().any(|t| t.start < span.end && span.start < t.end)
}

pub fn extract(ctx: &ParseContext<'_>) -> ParsingResult<Extraction> {
    let patterns = ctx
        .vendor
        .map(|vendor| vendor.text_patterns.as_slice())
        .filter(|patterns| !patterns.is_empty())
        .unwrap_or(GENERIC_PATTERNS.as_slice());

    let text = ctx.visible_text();
    let mut taken: Vec<Range<usize>> = Vec::new();
    let mut drafts = Vec::new();

    // Earlier patterns are more specific; later ones only fill the gaps.
    for (_, pattern) in patterns {
        for caps in pattern.captures_iter(text) {
            let Some(span) = caps.get(0).map(|m| m.range()) else {
                continue;
            };
            if overlaps(&taken, &span) {
                continue;
            }
            if let Some(draft) = draft_from_captures(&caps) {
                taken.push(span);
                drafts.push(draft);
            }
        }
    }

    Ok(Extraction::new(build_all(drafts, &ctx.bounds))
        .with_metadata("patterns_used", patterns.len())
        .with_metadata("text_length", text.len()))
}

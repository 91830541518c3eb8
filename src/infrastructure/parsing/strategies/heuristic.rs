//! Scored and last-resort heuristics over the rendered page text
//!
//! `extract_scored` rates every `<year> <word> <word>` candidate on how
//! plausible its make and year look and keeps those above a threshold; the
//! average score feeds the confidence. `extract_loose` only asks for a year
//! in a sane band followed by a word resembling a known make.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Extraction, build_all};
use crate::domain::ApplicationDraft;
use crate::infrastructure::config::HeuristicTuning;
use crate::infrastructure::parsing::{MAKE_LEXICON, ParseContext, ParsingResult};

static CLAUSE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,;|\n]+(?:\s|$)|\n").expect("valid clause regex"));
static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})(?:\s*[-–—]\s*(\d{4}))?\b").expect("valid year token regex")
});
static LOOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})[ \t]+([A-Za-z][A-Za-z \t]{3,30})").expect("valid loose regex")
});

/// Words shorter than this must be an exact make to count in the loose scan.
const MIN_OVERLAP_LEN: usize = 3;
const SCORE_EPSILON: f64 = 1e-9;

fn clean_word(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
}

#[derive(Debug)]
struct Candidate {
    draft: ApplicationDraft,
    score: f64,
}

fn score_make(make: &str, year: i32, tuning: &HeuristicTuning) -> f64 {
    let mut score = tuning.base_score;
    if MAKE_LEXICON.is_exact(make) {
        score += tuning.exact_make_bonus;
    }
    if MAKE_LEXICON.contains_make(make) {
        score += tuning.partial_make_bonus;
    }
    if (tuning.plausible_min_year..=tuning.plausible_max_year).contains(&year) {
        score += tuning.plausible_year_bonus;
    }
    score
}

/// Candidates in one clause: each year token owns the words up to the next one.
fn clause_candidates(clause: &str, tuning: &HeuristicTuning) -> Vec<Candidate> {
    let years: Vec<_> = YEAR_TOKEN.captures_iter(clause).collect();
    let mut candidates = Vec::new();

    for (idx, caps) in years.iter().enumerate() {
        let (Some(whole), Some(start)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Ok(year_start) = start.as_str().parse::<i32>() else {
            continue;
        };
        let year_end = caps.get(2).and_then(|m| m.as_str().parse::<i32>().ok());

        let tail_end = years
            .get(idx + 1)
            .and_then(|next| next.get(0))
            .map_or(clause.len(), |m| m.start());
        let words: Vec<&str> = clause[whole.end()..tail_end]
            .split_whitespace()
            .map(clean_word)
            .filter(|w| !w.is_empty())
            .collect();
        if words.len() < 2 || !words[0].chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }

        let make_len = usize::from(words.len() >= 3 && MAKE_LEXICON.is_exact(&words[..2].join(" "))) + 1;
        if words.len() <= make_len {
            continue;
        }
        let make = words[..make_len].join(" ");
        let score = score_make(&make, year_start, tuning);
        if score + SCORE_EPSILON < tuning.accept_threshold {
            continue;
        }

        let trim = Some(words[make_len + 1..].join(" ")).filter(|t| !t.is_empty());
        let mut draft = ApplicationDraft::new(year_start, make, words[make_len]).with_trim(trim);
        draft.year_end = year_end;
        candidates.push(Candidate { draft, score });
    }
    candidates
}

pub fn extract_scored(ctx: &ParseContext<'_>, tuning: &HeuristicTuning) -> ParsingResult<Extraction> {
    let candidates: Vec<Candidate> = CLAUSE_BREAK
        .split(ctx.visible_text())
        .flat_map(|clause| clause_candidates(clause, tuning))
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let avg_score = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.score).sum::<f64>() / candidates.len() as f64
    };
    let scored = candidates.len();

    let applications = build_all(candidates.into_iter().map(|c| c.draft), &ctx.bounds);
    Ok(Extraction::new(applications)
        .with_quality(avg_score)
        .with_metadata("scored_matches", scored)
        .with_metadata("avg_score", avg_score))
}

fn resembles_make(word: &str) -> bool {
    if word.chars().count() < MIN_OVERLAP_LEN {
        MAKE_LEXICON.is_exact(word)
    } else {
        MAKE_LEXICON.overlaps(word)
    }
}

pub fn extract_loose(ctx: &ParseContext<'_>, min_year: i32, max_year: i32) -> ParsingResult<Extraction> {
    let mut loose_matches = 0usize;
    let mut drafts = Vec::new();

    for caps in LOOSE.captures_iter(ctx.visible_text()) {
        loose_matches += 1;
        let (Some(year), Some(rest)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(year) = year.as_str().parse::<i32>() else {
            continue;
        };
        if !(min_year..=max_year).contains(&year) {
            continue;
        }

        let words: Vec<&str> = rest.as_str().split_whitespace().collect();
        if words.len() < 2 || !resembles_make(words[0]) {
            continue;
        }
        let model = words[1..words.len().min(3)].join(" ");
        drafts.push(ApplicationDraft::new(year, words[0], model));
    }

    Ok(Extraction::new(build_all(drafts, &ctx.bounds)).with_metadata("loose_matches", loose_matches))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceDocument;
    use crate::infrastructure::config::TuningConfig;

    fn scored(html: &str) -> Extraction {
        let doc = SourceDocument::new("https://example.com/p", html);
        extract_scored(&ParseContext::new(&doc, "P"), &TuningConfig::default().heuristic).unwrap()
    }

    #[test]
    fn test_scoring_rewards_known_makes() {
        let tuning = TuningConfig::default().heuristic;
        let exact = score_make("Honda", 2019, &tuning);
        let unknown = score_make("Ghostbrand", 2019, &tuning);
        let old = score_make("Honda", 1972, &tuning);

        assert!((exact - 1.1).abs() < 1e-9);
        assert!((unknown - 0.7).abs() < 1e-9);
        assert!((old - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_scored_candidates_per_clause() {
        let extraction = scored(
            "<p>Compatible with 2015-2017 Land Rover Discovery Sport HSE, 2019 Jeep Wrangler.</p>",
        );
        let apps = &extraction.applications;
        assert_eq!(apps.len(), 2);
        assert_eq!((apps[0].make(), apps[0].model()), ("Land Rover", "Discovery"));
        assert_eq!(apps[0].trim(), Some("Sport HSE"));
        assert_eq!(apps[0].year_end(), 2017);
        assert_eq!((apps[1].make(), apps[1].model()), ("Jeep", "Wrangler"));
        assert!(extraction.quality > 1.0);
    }

    #[test]
    fn test_old_unknown_make_is_rejected() {
        let extraction = scored("<p>Established 1965 Acme Garage</p>");
        assert!(extraction.applications.is_empty());
    }

    #[test]
    fn test_loose_scan() {
        let doc = SourceDocument::new(
            "https://example.com/p",
            "<p>Fits 2008 Toyota Camry LE and 2031 Honda Fit</p><p>Since 2004 a family business</p>",
        );
        let extraction = extract_loose(&ParseContext::new(&doc, "P"), 1990, 2030).unwrap();
        let apps = &extraction.applications;

        assert_eq!(apps.len(), 1);
        assert_eq!((apps[0].year_start(), apps[0].make()), (2008, "Toyota"));
        assert_eq!(apps[0].model(), "Camry LE");
    }
}

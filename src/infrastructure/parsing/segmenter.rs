//! Splitting run-together fitment text into per-vehicle fragments
//!
//! Vendor pages often render every application as one unbroken string, e.g.
//! `2019 Honda Civic Si 2.0L Turbo 2020 Acura ILX 2.4L`. The segmenter cuts
//! such text in front of every year that is followed by a capitalized word and
//! parses each piece on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::lexicon::MAKE_LEXICON;
use crate::domain::{ApplicationDraft, VehicleApplication, YearBounds, dedup_applications};
use crate::infrastructure::config::TuningConfig;

// Same range separators as LEADING_YEARS, so a cut never lands inside a range.
static DEFAULT_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}(?:\s*[-–—]\s*\d{4})?\s+[A-Z]").expect("valid boundary regex")
});
static LEADING_YEARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})(?:\s*[-–—]\s*(\d{4}))?\s+").expect("valid leading year regex")
});
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid parenthetical regex"));
static NOISE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\bOE\s+Incl\b.*$").expect("valid noise regex"));
static ENGINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d+(?:\.\d+)?\s*L\b(?:\s*[VIH]\d{1,2}\b)?(?:\s*Turbo\b)?|\b\d+(?:\.\d+)?\s*Turbo\b",
    )
    .expect("valid engine regex")
});
static FALLBACK_TRIPLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})\s+([A-Z][a-zA-Z]+)\s+([A-Za-z0-9\-]+)").expect("valid triple regex")
});

fn clean_token(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | '|'))
}

/// Splits concatenated fitment text and parses the pieces.
#[derive(Debug, Clone)]
pub struct TextSegmenter {
    boundary: Regex,
    bounds: YearBounds,
    min_fragment_len: usize,
    fallback_min_len: usize,
}

impl TextSegmenter {
    pub fn new(bounds: YearBounds, tuning: &TuningConfig) -> Self {
        Self {
            boundary: DEFAULT_BOUNDARY.clone(),
            bounds,
            min_fragment_len: tuning.segment_min_len,
            fallback_min_len: tuning.fallback_split_min_len,
        }
    }

    /// Use a vendor-specific boundary pattern instead of the generic one.
    #[must_use]
    pub fn with_boundary(mut self, boundary: Regex) -> Self {
        self.boundary = boundary;
        self
    }

    /// Cut `text` in front of every boundary match that does not sit inside a
    /// longer number. Fragments shorter than the minimum length are dropped.
    pub fn split_concatenated(&self, text: &str) -> Vec<String> {
        let mut cuts: Vec<usize> = self
            .boundary
            .find_iter(text)
            .map(|m| m.start())
            .filter(|&start| {
                start == 0 || !text[..start].ends_with(|c: char| c.is_ascii_digit())
            })
            .collect();
        if cuts.first() != Some(&0) {
            cuts.insert(0, 0);
        }
        cuts.push(text.len());

        cuts.windows(2)
            .map(|w| text[w[0]..w[1]].trim())
            .filter(|fragment| fragment.chars().count() >= self.min_fragment_len)
            .map(str::to_string)
            .collect()
    }

    /// Parse one `<year>[-<year>] <make> <model> [trim...]` fragment.
    pub fn parse_single(&self, fragment: &str) -> Option<VehicleApplication> {
        let without_asides = PARENTHETICAL.replace_all(fragment, "");
        let cleaned = NOISE_SUFFIX.replace(&without_asides, "");
        let cleaned = cleaned.trim();

        let caps = LEADING_YEARS.captures(cleaned)?;
        let year_start: i32 = caps.get(1)?.as_str().parse().ok()?;
        let year_end: Option<i32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
        let rest = &cleaned[caps.get(0)?.end()..];

        let engine = ENGINE.find(fragment).map(|m| m.as_str().to_string());
        let rest = match &engine {
            Some(engine_text) => rest.replacen(engine_text.as_str(), " ", 1),
            None => rest.to_string(),
        };

        let tokens: Vec<&str> = rest
            .split_whitespace()
            .map(clean_token)
            .filter(|t| !t.is_empty())
            .collect();

        // Two-word makes ("Land Rover") consume two tokens.
        let make_len = if tokens.len() >= 3 && MAKE_LEXICON.is_exact(&tokens[..2].join(" ")) {
            2
        } else {
            1
        };
        if tokens.len() < make_len + 1 {
            return None;
        }

        let make = tokens[..make_len].join(" ");
        let model = tokens[make_len].to_string();
        let trim = Some(tokens[make_len + 1..].join(" ")).filter(|t| !t.is_empty());

        let mut draft = ApplicationDraft::new(year_start, make, model)
            .with_trim(trim)
            .with_engine(engine);
        draft.year_end = year_end;

        match draft.build(&self.bounds) {
            Ok(application) => Some(application),
            Err(reason) => {
                debug!(fragment, %reason, "Rejected fitment fragment");
                None
            }
        }
    }

    /// Last-resort scan for `<year> <Make> <model>` triples in long text.
    pub fn fallback_split(&self, text: &str) -> Vec<VehicleApplication> {
        if text.chars().count() <= self.fallback_min_len {
            return Vec::new();
        }

        let applications = FALLBACK_TRIPLE
            .captures_iter(text)
            .filter_map(|caps| {
                let year: i32 = caps.get(1)?.as_str().parse().ok()?;
                let draft = ApplicationDraft::new(year, caps.get(2)?.as_str(), caps.get(3)?.as_str());
                draft
                    .build(&self.bounds)
                    .map_err(|reason| debug!(%reason, "Rejected fallback triple"))
                    .ok()
            })
            .collect();

        dedup_applications(applications)
    }

    /// Split, parse every fragment, and fall back to the triple scan when
    /// nothing parsed.
    pub fn segment(&self, text: &str) -> Vec<VehicleApplication> {
        let parsed: Vec<VehicleApplication> = self
            .split_concatenated(text)
            .iter()
            .filter_map(|fragment| self.parse_single(fragment))
            .collect();

        if parsed.is_empty() {
            self.fallback_split(text)
        } else {
            dedup_applications(parsed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn segmenter() -> TextSegmenter {
        TextSegmenter::new(YearBounds::default(), &TuningConfig::default())
    }

    #[test]
    fn test_concatenated_text_splits_into_vehicles() {
        let text = "2019 Honda Civic Si 2.0L Turbo 2020 Acura ILX 2.4L";
        let seg = segmenter();

        let fragments = seg.split_concatenated(text);
        assert_eq!(fragments, vec!["2019 Honda Civic Si 2.0L Turbo", "2020 Acura ILX 2.4L"]);

        let apps = seg.segment(text);
        assert_eq!(apps.len(), 2);
        assert_eq!((apps[0].year_start(), apps[0].make(), apps[0].model()), (2019, "Honda", "Civic"));
        assert_eq!(apps[0].trim(), Some("Si"));
        assert_eq!(apps[0].engine(), Some("2.0L Turbo"));
        assert_eq!((apps[1].year_start(), apps[1].make(), apps[1].model()), (2020, "Acura", "ILX"));
        assert_eq!(apps[1].engine(), Some("2.4L"));
    }

    #[rstest]
    #[case(
        "2005 – 2023 Toyota Tacoma 2010 – 2015 Toyota 4Runner SR5",
        &["2005 – 2023 Toyota Tacoma", "2010 – 2015 Toyota 4Runner SR5"],
        &[(2005, 2023, "Tacoma"), (2010, 2015, "4Runner")]
    )]
    #[case(
        "2005-2023 Toyota Tacoma 2010 - 2015 Toyota 4Runner",
        &["2005-2023 Toyota Tacoma", "2010 - 2015 Toyota 4Runner"],
        &[(2005, 2023, "Tacoma"), (2010, 2015, "4Runner")]
    )]
    #[case(
        "2007 — 2013 Chevrolet Silverado 1500 2014 GMC Sierra 1500",
        &["2007 — 2013 Chevrolet Silverado 1500", "2014 GMC Sierra 1500"],
        &[(2007, 2013, "Silverado"), (2014, 2014, "Sierra")]
    )]
    fn test_spaced_ranges_stay_whole(
        #[case] text: &str,
        #[case] fragments: &[&str],
        #[case] expected: &[(i32, i32, &str)],
    ) {
        let seg = segmenter();
        assert_eq!(seg.split_concatenated(text), fragments);

        let apps = seg.segment(text);
        let found: Vec<(i32, i32, &str)> = apps
            .iter()
            .map(|a| (a.year_start(), a.year_end(), a.model()))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_short_fragments_are_dropped() {
        let fragments = segmenter().split_concatenated("Fits: 2019 Kia Soul");
        assert_eq!(fragments, vec!["2019 Kia Soul"]);
    }

    #[test]
    fn test_year_inside_longer_number_is_not_a_boundary() {
        let fragments = segmenter().split_concatenated("Part 12019 Honda fits 2018 Honda Fit");
        assert_eq!(fragments, vec!["Part 12019 Honda fits", "2018 Honda Fit"]);
    }

    #[rstest]
    #[case("2005-2010 Toyota Tacoma (4WD) OE Incl. Shims and Clips", 2005, 2010, "Toyota", "Tacoma")]
    #[case("2012 Land Rover LR4 HSE", 2012, 2012, "Land Rover", "LR4")]
    #[case("2016 – 2018 chevy Silverado, 1500", 2016, 2018, "Chevrolet", "Silverado")]
    fn test_parse_single(
        #[case] fragment: &str,
        #[case] start: i32,
        #[case] end: i32,
        #[case] make: &str,
        #[case] model: &str,
    ) {
        let app = segmenter().parse_single(fragment).unwrap();
        assert_eq!(app.year_start(), start);
        assert_eq!(app.year_end(), end);
        assert_eq!(app.make(), make);
        assert_eq!(app.model(), model);
    }

    #[rstest]
    #[case("9999 Ghostbrand Mystery")]
    #[case("2019 Honda")]
    #[case("Honda Civic 2019")]
    #[case("2021 Ford")]
    fn test_parse_single_rejects(#[case] fragment: &str) {
        assert!(segmenter().parse_single(fragment).is_none());
    }

    #[test]
    fn test_fallback_split_on_long_unsegmentable_text() {
        let seg = TextSegmenter::new(YearBounds::default(), &TuningConfig::default())
            .with_boundary(Regex::new(r"NEVER_MATCHES").unwrap());
        let text = "This kit is listed for 2011 Ford Ranger and also for 2011 Ford Ranger and 2013 Mazda B2300 trucks";

        let apps = seg.segment(text);
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[1].model(), "B2300");
    }

    #[test]
    fn test_fallback_needs_long_text() {
        assert!(segmenter().fallback_split("2011 Ford Ranger").is_empty());
    }
}

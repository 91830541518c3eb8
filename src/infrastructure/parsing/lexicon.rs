//! Known vehicle makes
//!
//! The lexicon answers "is this word a car make?" for the table, text and
//! heuristic strategies. It is the union of the manufacturers catalogs list
//! and every spelling in the make alias table.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::vehicle_application::make_aliases;

const KNOWN_CAR_MAKES: &[&str] = &[
    "ABARTH", "ACURA", "ALFA ROMEO", "ASTON MARTIN", "AUDI", "BENTLEY", "BMW", "BUICK",
    "CADILLAC", "CHEVROLET", "CHRYSLER", "CITROEN", "DODGE", "FERRARI", "FIAT", "FORD", "GMC",
    "HONDA", "HUMMER", "HYUNDAI", "INFINITI", "JAGUAR", "JEEP", "KIA", "LAMBORGHINI",
    "LAND ROVER", "LEXUS", "LINCOLN", "LOTUS", "MASERATI", "MAZDA", "MCLAREN", "MERCEDES BENZ",
    "MERCURY", "MINI", "MITSUBISHI", "NISSAN", "OLDSMOBILE", "PEUGEOT", "PLYMOUTH", "PONTIAC",
    "PORSCHE", "RAM", "RENAULT", "ROLLS ROYCE", "SAAB", "SATURN", "SCION", "SEAT", "SMART",
    "SUBARU", "SUZUKI", "TESLA", "TOYOTA", "VOLKSWAGEN", "VOLVO",
];

/// Process-wide lexicon, built on first use.
pub static MAKE_LEXICON: Lazy<MakeLexicon> = Lazy::new(MakeLexicon::builtin);

#[derive(Debug, Clone)]
pub struct MakeLexicon {
    makes: BTreeSet<String>,
    /// Longest names first so "LAND ROVER" wins over a bare "ROVER"
    by_length: Vec<String>,
    pattern: Regex,
}

impl MakeLexicon {
    fn builtin() -> Self {
        Self::from_names(KNOWN_CAR_MAKES.iter().copied().chain(make_aliases()))
    }

    /// Build a lexicon from arbitrary names (case is ignored).
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let makes: BTreeSet<String> = names
            .into_iter()
            .map(|n| n.trim().to_uppercase())
            .filter(|n| !n.is_empty())
            .collect();

        let mut by_length: Vec<String> = makes.iter().cloned().collect();
        by_length.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = by_length
            .iter()
            .map(|name| {
                name.split([' ', '-'])
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"[\s\-]+")
            })
            .collect::<Vec<_>>()
            .join("|");
        // Alternation of escaped literals always compiles.
        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .expect("escaped make alternation is a valid regex");

        Self {
            makes,
            by_length,
            pattern,
        }
    }

    /// Case-insensitive alternation matching any known make as a whole word.
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Regex source of the alternation without flags, for embedding.
    pub fn alternation(&self) -> &str {
        let source = self.pattern.as_str();
        source
            .strip_prefix(r"(?i)\b(?:")
            .and_then(|s| s.strip_suffix(r")\b"))
            .unwrap_or(source)
    }

    /// `word` is exactly a known make.
    pub fn is_exact(&self, word: &str) -> bool {
        let upper = word.trim().to_uppercase();
        self.makes.contains(&upper) || self.makes.contains(&upper.replace('-', " "))
    }

    /// Some known make occurs inside `word`.
    pub fn contains_make(&self, word: &str) -> bool {
        let upper = word.to_uppercase();
        self.by_length.iter().any(|make| upper.contains(make.as_str()))
    }

    /// `word` and a known make overlap in either direction.
    pub fn overlaps(&self, word: &str) -> bool {
        let upper = word.trim().to_uppercase();
        !upper.is_empty()
            && self
                .by_length
                .iter()
                .any(|make| make.contains(upper.as_str()) || upper.contains(make.as_str()))
    }

    /// First known make found in `text`, as written in the text.
    pub fn find_in<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern.find(text).map(|m| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.makes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Toyota", true)]
    #[case("chevy", true)]
    #[case("Land Rover", true)]
    #[case("Mercedes-Benz", true)]
    #[case("Hawk", false)]
    fn test_exact_lookup(#[case] word: &str, #[case] expected: bool) {
        assert_eq!(MAKE_LEXICON.is_exact(word), expected);
    }

    #[test]
    fn test_longest_name_wins() {
        assert_eq!(MAKE_LEXICON.find_in("fits 2012 land  rover LR4"), Some("land  rover"));
        assert_eq!(MAKE_LEXICON.find_in("2015 Ford F-150"), Some("Ford"));
        assert_eq!(MAKE_LEXICON.find_in("Fordham University"), None);
    }

    #[test]
    fn test_overlap_in_both_directions() {
        assert!(MAKE_LEXICON.overlaps("Hond"));
        assert!(MAKE_LEXICON.overlaps("Toyotas"));
        assert!(!MAKE_LEXICON.overlaps("Qwxz"));
        assert!(!MAKE_LEXICON.overlaps("  "));
    }

    #[test]
    fn test_alternation_is_embeddable() {
        let embedded = Regex::new(&format!(r"(?i)^(?:{})$", MAKE_LEXICON.alternation())).unwrap();
        assert!(embedded.is_match("volkswagen"));
        assert!(!MAKE_LEXICON.is_empty());
    }
}

//! Vehicle application (fitment) records
//!
//! A [`VehicleApplication`] states that a part fits one vehicle (a year range,
//! make and model, optionally refined by trim, engine and position). Records are
//! only created through [`ApplicationDraft::build`], which normalizes the text
//! fields and rejects anything that fails validation, so an invalid record can
//! never leave a strategy.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::config::defaults;

/// Canonical spellings for makes that vendors write in many different ways.
/// Anything not listed here is title-cased.
const MAKE_ALIASES: &[(&str, &str)] = &[
    ("HONDA", "Honda"),
    ("ACURA", "Acura"),
    ("TOYOTA", "Toyota"),
    ("LEXUS", "Lexus"),
    ("SCION", "Scion"),
    ("NISSAN", "Nissan"),
    ("INFINITI", "Infiniti"),
    ("FORD", "Ford"),
    ("LINCOLN", "Lincoln"),
    ("MERCURY", "Mercury"),
    ("CHEVROLET", "Chevrolet"),
    ("CHEVY", "Chevrolet"),
    ("GMC", "GMC"),
    ("CADILLAC", "Cadillac"),
    ("BUICK", "Buick"),
    ("DODGE", "Dodge"),
    ("CHRYSLER", "Chrysler"),
    ("JEEP", "Jeep"),
    ("RAM", "Ram"),
    ("BMW", "BMW"),
    ("MINI", "Mini"),
    ("MERCEDES", "Mercedes-Benz"),
    ("MERCEDES-BENZ", "Mercedes-Benz"),
    ("MERCEDES BENZ", "Mercedes-Benz"),
    ("AUDI", "Audi"),
    ("VOLKSWAGEN", "Volkswagen"),
    ("VW", "Volkswagen"),
    ("VOLVO", "Volvo"),
    ("SUBARU", "Subaru"),
    ("MAZDA", "Mazda"),
    ("MITSUBISHI", "Mitsubishi"),
    ("HYUNDAI", "Hyundai"),
    ("KIA", "Kia"),
    ("SUZUKI", "Suzuki"),
    ("LAND ROVER", "Land Rover"),
    ("ALFA ROMEO", "Alfa Romeo"),
];

/// Every spelling in the alias table, upper-cased.
pub fn make_aliases() -> impl Iterator<Item = &'static str> {
    MAKE_ALIASES.iter().map(|(alias, _)| *alias)
}

static ENGINE_DISPLACEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*L\b").expect("valid displacement regex"));
static ENGINE_TURBO_DISPLACEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*turbo\b").expect("valid turbo regex"));
static ENGINE_CYLINDERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([VIHW]\d{1,2})\b").expect("valid cylinder regex"));
static ENGINE_TURBO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bturbo\b").expect("valid turbo regex"));

/// Collapse every whitespace run to a single space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize a make through the alias table, title-casing unknown makes.
pub fn normalize_make(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    let upper = collapsed.to_uppercase();

    MAKE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map_or_else(|| title_case(&collapsed), |(_, canonical)| (*canonical).to_string())
}

/// Normalize an engine description toward `<displacement>L [layout] [Turbo]`.
///
/// Text without a recognizable displacement is only whitespace-collapsed.
pub fn normalize_engine(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);

    let displacement = ENGINE_DISPLACEMENT
        .captures(&collapsed)
        .or_else(|| ENGINE_TURBO_DISPLACEMENT.captures(&collapsed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let Some(displacement) = displacement else {
        return collapsed;
    };

    let mut parts = vec![format!("{displacement}L")];
    if let Some(layout) = ENGINE_CYLINDERS.captures(&collapsed).and_then(|caps| caps.get(1)) {
        parts.push(layout.as_str().to_uppercase());
    }
    if ENGINE_TURBO.is_match(&collapsed) {
        parts.push("Turbo".to_string());
    }
    parts.join(" ")
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_alphabetic = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            out.push(ch);
            previous_alphabetic = false;
        }
    }
    out
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(&v))
        .filter(|v| !v.is_empty())
}

/// Inclusive model-year window a record must fall in to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearBounds {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for YearBounds {
    fn default() -> Self {
        Self {
            min_year: defaults::MIN_MODEL_YEAR,
            max_year: defaults::MAX_MODEL_YEAR,
        }
    }
}

impl YearBounds {
    /// Accepts every year. Only structural checks remain.
    pub const UNBOUNDED: Self = Self::new(i32::MIN, i32::MAX);

    #[must_use]
    pub const fn new(min_year: i32, max_year: i32) -> Self {
        Self { min_year, max_year }
    }

    #[must_use]
    pub const fn contains(&self, year: i32) -> bool {
        year >= self.min_year && year <= self.max_year
    }
}

/// Why a draft was refused. These are expected noise from heuristic
/// extraction and are logged at debug level, never surfaced as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing start year")]
    MissingYear,

    #[error("missing make")]
    MissingMake,

    #[error("missing model")]
    MissingModel,

    #[error("year {year} outside {min}..={max}")]
    YearOutOfBounds { year: i32, min: i32, max: i32 },

    #[error("year range {start}-{end} is inverted")]
    InvertedRange { start: i32, end: i32 },

    #[error("make '{0}' is not alphabetic")]
    NonAlphabeticMake(String),
}

/// Unvalidated fitment fields as pulled out of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDraft {
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub engine: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

impl ApplicationDraft {
    /// Start a draft from the three mandatory facts.
    pub fn new(year_start: i32, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            year_start: Some(year_start),
            make: Some(make.into()),
            model: Some(model.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn through(mut self, year_end: i32) -> Self {
        self.year_end = Some(year_end);
        self
    }

    #[must_use]
    pub fn with_trim(mut self, trim: Option<String>) -> Self {
        self.trim = trim;
        self
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Option<String>) -> Self {
        self.engine = engine;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: Option<String>) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Normalize and validate the draft into an immutable record.
    pub fn build(self, bounds: &YearBounds) -> Result<VehicleApplication, RejectReason> {
        let year_start = self.year_start.ok_or(RejectReason::MissingYear)?;
        let year_end = self.year_end.unwrap_or(year_start);

        for year in [year_start, year_end] {
            if !bounds.contains(year) {
                return Err(RejectReason::YearOutOfBounds {
                    year,
                    min: bounds.min_year,
                    max: bounds.max_year,
                });
            }
        }
        if year_end < year_start {
            return Err(RejectReason::InvertedRange {
                start: year_start,
                end: year_end,
            });
        }

        let make = non_empty(self.make).ok_or(RejectReason::MissingMake)?;
        if !make
            .chars()
            .filter(|c| *c != ' ' && *c != '-')
            .all(char::is_alphabetic)
        {
            return Err(RejectReason::NonAlphabeticMake(make));
        }
        let model = non_empty(self.model).ok_or(RejectReason::MissingModel)?;

        Ok(VehicleApplication {
            year_start,
            year_end,
            make: normalize_make(&make),
            model,
            trim: non_empty(self.trim),
            engine: non_empty(self.engine).map(|e| normalize_engine(&e)),
            position: non_empty(self.position),
            notes: non_empty(self.notes),
        })
    }
}

/// One normalized, validated fitment fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ApplicationRecord", into = "ApplicationRecord")]
pub struct VehicleApplication {
    year_start: i32,
    year_end: i32,
    make: String,
    model: String,
    trim: Option<String>,
    engine: Option<String>,
    position: Option<String>,
    notes: Option<String>,
}

impl VehicleApplication {
    #[must_use]
    pub const fn year_start(&self) -> i32 {
        self.year_start
    }

    #[must_use]
    pub const fn year_end(&self) -> i32 {
        self.year_end
    }

    #[must_use]
    pub fn make(&self) -> &str {
        &self.make
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn trim(&self) -> Option<&str> {
        self.trim.as_deref()
    }

    #[must_use]
    pub fn engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    /// Whether both ends of the year range fall inside `bounds`.
    #[must_use]
    pub const fn within(&self, bounds: &YearBounds) -> bool {
        bounds.contains(self.year_start) && bounds.contains(self.year_end)
    }

    #[must_use]
    pub fn position(&self) -> Option<&str> {
        self.position.as_deref()
    }

    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Identity used for deduplication: years plus case-folded make and model.
    #[must_use]
    pub fn dedup_key(&self) -> (i32, i32, String, String) {
        (
            self.year_start,
            self.year_end,
            self.make.to_uppercase(),
            self.model.to_uppercase(),
        )
    }
}

impl fmt::Display for VehicleApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year_start == self.year_end {
            write!(f, "{}", self.year_start)?;
        } else {
            write!(f, "{}-{}", self.year_start, self.year_end)?;
        }
        write!(f, " {} {}", self.make, self.model)?;
        if let Some(trim) = &self.trim {
            write!(f, " {trim}")?;
        }
        if let Some(engine) = &self.engine {
            write!(f, " ({engine})")?;
        }

        let additional: Vec<&str> = [self.position.as_deref(), self.notes.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !additional.is_empty() {
            write!(f, " - {}", additional.join(", "))?;
        }
        Ok(())
    }
}

/// Flat, fully optional form of an application used for persistence.
///
/// Unknown fields are ignored and missing fields default to `None`, so older or
/// newer cache files stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationRecord {
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub engine: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
}

impl From<VehicleApplication> for ApplicationRecord {
    fn from(app: VehicleApplication) -> Self {
        Self {
            year_start: Some(app.year_start),
            year_end: Some(app.year_end),
            make: Some(app.make),
            model: Some(app.model),
            trim: app.trim,
            engine: app.engine,
            position: app.position,
            notes: app.notes,
        }
    }
}

impl ApplicationRecord {
    pub fn into_draft(self) -> ApplicationDraft {
        ApplicationDraft {
            year_start: self.year_start,
            year_end: self.year_end,
            make: self.make,
            model: self.model,
            trim: self.trim,
            engine: self.engine,
            position: self.position,
            notes: self.notes,
        }
    }
}

impl TryFrom<ApplicationRecord> for VehicleApplication {
    type Error = RejectReason;

    /// Stored records pass the same gate as fresh drafts. Year bounds are
    /// left open here; callers holding configured bounds apply them with
    /// [`VehicleApplication::within`].
    fn try_from(record: ApplicationRecord) -> Result<Self, Self::Error> {
        record.into_draft().build(&YearBounds::UNBOUNDED)
    }
}

/// Drop records whose [`VehicleApplication::dedup_key`] was already seen.
/// Order is preserved and the first occurrence wins.
pub fn dedup_applications(applications: Vec<VehicleApplication>) -> Vec<VehicleApplication> {
    let mut seen = HashSet::new();
    applications
        .into_iter()
        .filter(|app| seen.insert(app.dedup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn app(year: i32, make: &str, model: &str) -> VehicleApplication {
        ApplicationDraft::new(year, make, model)
            .build(&YearBounds::default())
            .unwrap()
    }

    #[rstest]
    #[case("CHEVY", "Chevrolet")]
    #[case("chevrolet", "Chevrolet")]
    #[case("TOYOTA", "Toyota")]
    #[case("vw", "Volkswagen")]
    #[case("Mercedes", "Mercedes-Benz")]
    #[case("gmc", "GMC")]
    #[case("ghostbrand", "Ghostbrand")]
    #[case("  land   rover ", "Land Rover")]
    fn test_make_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_make(raw), expected);
    }

    #[rstest]
    #[case("2.0L", "2.0L")]
    #[case("2.0 l turbo", "2.0L Turbo")]
    #[case("3.5L v6", "3.5L V6")]
    #[case("2.0 Turbo", "2.0L Turbo")]
    #[case("Hybrid   electric", "Hybrid electric")]
    fn test_engine_normalization(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_engine(raw), expected);
    }

    #[test]
    fn test_engine_normalization_is_idempotent() {
        let once = normalize_engine("5.7 L  V8 turbo");
        assert_eq!(normalize_engine(&once), once);
    }

    #[test]
    fn test_build_defaults_year_end_to_start() {
        let built = app(2019, "honda", "Civic");
        assert_eq!(built.year_end(), 2019);
        assert_eq!(built.make(), "Honda");
    }

    #[rstest]
    #[case(ApplicationDraft::new(9999, "Ghostbrand", "Mystery"))]
    #[case(ApplicationDraft::new(1899, "Ford", "Model T"))]
    #[case(ApplicationDraft::new(2020, "Ford", "F-150").through(2010))]
    #[case(ApplicationDraft::new(2020, "F0rd", "F-150"))]
    #[case(ApplicationDraft::new(2020, "Ford", "   "))]
    #[case(ApplicationDraft { year_start: None, ..ApplicationDraft::new(2020, "Ford", "Focus") })]
    fn test_invalid_drafts_are_rejected(#[case] draft: ApplicationDraft) {
        assert!(draft.build(&YearBounds::default()).is_err());
    }

    #[test]
    fn test_ceiling_is_configurable() {
        let draft = ApplicationDraft::new(2036, "Ford", "Bronco");
        assert!(draft.clone().build(&YearBounds::default()).is_err());
        assert!(draft.build(&YearBounds::new(1900, 2040)).is_ok());
    }

    #[test]
    fn test_display_string() {
        let full = ApplicationDraft::new(2019, "Honda", "Civic")
            .through(2021)
            .with_trim(Some("Si".into()))
            .with_engine(Some("2.0l turbo".into()))
            .with_position(Some("Front".into()))
            .build(&YearBounds::default())
            .unwrap();
        assert_eq!(full.to_string(), "2019-2021 Honda Civic Si (2.0L Turbo) - Front");
        assert_eq!(app(2020, "Acura", "ILX").to_string(), "2020 Acura ILX");
    }

    #[test]
    fn test_record_roundtrip_ignores_unknown_fields() {
        let json = r#"{"year_start":2005,"make":"Toyota","model":"Tacoma","color":"red"}"#;
        let parsed: VehicleApplication = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.year_end(), 2005);
        assert_eq!(parsed.trim(), None);
    }

    #[test]
    fn test_record_is_normalized_on_load() {
        let json = r#"{"year_start":2010,"year_end":2014,"make":"chevy","model":"Tahoe","engine":"5.3L v8"}"#;
        let parsed: VehicleApplication = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.make(), "Chevrolet");
        assert_eq!(parsed.engine(), Some("5.3L V8"));
        assert!(!parsed.within(&YearBounds::new(2012, 2035)));
        assert!(parsed.within(&YearBounds::default()));
    }

    #[rstest]
    #[case(r#"{"year_start":2010,"make":"GM 1500","model":"Sierra"}"#)]
    #[case(r#"{"year_start":2014,"year_end":2010,"make":"GMC","model":"Sierra"}"#)]
    #[case(r#"{"year_start":2010,"make":"GMC","model":"   "}"#)]
    fn test_stored_record_failing_the_gate_is_refused(#[case] json: &str) {
        assert!(serde_json::from_str::<VehicleApplication>(json).is_err());
    }

    #[test]
    fn test_record_without_make_is_refused() {
        let json = r#"{"year_start":2005,"model":"Tacoma"}"#;
        assert!(serde_json::from_str::<VehicleApplication>(json).is_err());
    }

    #[test]
    fn test_dedup_is_case_insensitive_and_first_wins() {
        let first = ApplicationDraft::new(2019, "Honda", "Civic")
            .with_trim(Some("Si".into()))
            .build(&YearBounds::default())
            .unwrap();
        let apps = vec![first.clone(), app(2019, "HONDA", "CIVIC"), app(2020, "Honda", "Civic")];
        let unique = dedup_applications(apps);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], first);
    }

    fn arb_application() -> impl Strategy<Value = VehicleApplication> {
        (
            1990..2030i32,
            0..3i32,
            prop::sample::select(vec!["Honda", "honda", "Ford", "Toyota", "Kia"]),
            prop::sample::select(vec!["Civic", "CIVIC", "F-150", "Camry", "Soul"]),
        )
            .prop_map(|(year, span, make, model)| {
                ApplicationDraft::new(year, make, model)
                    .through(year + span)
                    .build(&YearBounds::default())
                    .unwrap()
            })
    }

    proptest! {
        #[test]
        fn prop_dedup_is_idempotent(apps in prop::collection::vec(arb_application(), 0..40)) {
            let once = dedup_applications(apps);
            let twice = dedup_applications(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_built_records_hold_the_validity_invariant(
            year in 1800..2100i32,
            span in -5..5i32,
            make in "[A-Za-z0-9 ]{0,12}",
            model in "[A-Za-z0-9 ]{0,12}",
        ) {
            let draft = ApplicationDraft::new(year, make, model).through(year + span);
            if let Ok(built) = draft.build(&YearBounds::default()) {
                prop_assert!(built.year_start() <= built.year_end());
                prop_assert!(YearBounds::default().contains(built.year_start()));
                prop_assert!(!built.make().is_empty());
                prop_assert!(!built.model().is_empty());
            }
        }
    }
}

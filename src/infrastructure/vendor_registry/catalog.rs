//! Built-in vendor profiles
//!
//! OEM manufacturers first, then performance/aftermarket brands, then
//! general retailers. Order matters: brand and domain lookups resolve ties
//! by position in this table.

use crate::domain::{ParsingRules, StrategyId, VendorConfig, VendorPatterns};

use StrategyId::{
    ConcatenatedText, FallbackHeuristic, HeuristicMl, LabeledFields, ListParser, StructuredData,
    TableParser, TextExtraction,
};

/// One model token: starts with a letter, or digits glued to letters
/// ("4Runner"), or a short number ("300"). Never a bare 4-digit year.
pub const MODEL_TOKEN: &str = r"(?:[A-Za-z][\w\-]*|\d+[A-Za-z\-][\w\-]*|\d{1,3}\b)";

/// A year or hyphenated year range
pub const YEAR_RANGE: &str = r"\d{4}(?:\s*[-–]\s*\d{4})?";

const OEM_FALLBACKS: &[StrategyId] =
    &[TableParser, ListParser, TextExtraction, HeuristicMl, FallbackHeuristic];
const RETAIL_FALLBACKS: &[StrategyId] =
    &[StructuredData, ListParser, TextExtraction, HeuristicMl, FallbackHeuristic];

/// `<years> <make> <model>` restricted to the given makes.
fn years_make_model(makes: &[&str]) -> String {
    format!(
        r"(?i)\b(?P<years>{YEAR_RANGE})[ \t]+(?P<make>{})[ \t]+(?P<model>{MODEL_TOKEN})",
        makes.join("|")
    )
}

/// `<years> <any word> <model>` for vendors selling across makes.
fn years_word_model() -> String {
    format!(r"\b(?P<years>{YEAR_RANGE})[ \t]+(?P<make>[A-Za-z]+)[ \t]+(?P<model>{MODEL_TOKEN})")
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[allow(clippy::too_many_arguments)]
fn vendor(
    key: &str,
    brand_names: &[&str],
    domains: &[&str],
    authority_score: u8,
    primary: StrategyId,
    fallbacks: &[StrategyId],
    selectors: &[&str],
    patterns: VendorPatterns,
) -> VendorConfig {
    VendorConfig {
        key: key.to_string(),
        brand_names: strings(brand_names),
        domains: strings(domains),
        authority_score,
        parsing_rules: ParsingRules {
            primary,
            fallbacks: fallbacks.to_vec(),
        },
        selectors: strings(selectors),
        patterns,
    }
}

fn oem_patterns(makes: &[&str]) -> VendorPatterns {
    VendorPatterns {
        structured: Some(years_make_model(makes)),
        ..VendorPatterns::default()
    }
}

fn generic_patterns() -> VendorPatterns {
    VendorPatterns {
        simple: Some(years_word_model()),
        ..VendorPatterns::default()
    }
}

/// The built-in vendor table.
pub fn builtin_vendors() -> Vec<VendorConfig> {
    vec![
        // OEM manufacturers
        vendor(
            "FORD",
            &["Ford", "FORD", "ford", "Motorcraft", "MOTORCRAFT"],
            &["parts.ford.com", "fordparts.com", "ford.com", "motorcraft.com", "ford.oempartsonline.com"],
            95,
            StructuredData,
            OEM_FALLBACKS,
            &[
                ".vehicle-compatibility", ".fitment-info", ".application-data",
                "table[class*=\"vehicle\"]", "table[class*=\"fitment\"]",
                ".product-specifications", ".compatibility-table",
            ],
            oem_patterns(&["Ford", "Lincoln", "Mercury"]),
        ),
        vendor(
            "CHEVROLET",
            &["Chevrolet", "CHEVROLET", "Chevy", "CHEVY", "GMC", "Cadillac"],
            &["parts.gm.com", "gmpartsdirect.com", "chevroletparts.com"],
            95,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-fitment", ".compatibility-info", ".application-list", "table[class*=\"compatibility\"]"],
            oem_patterns(&["Chevrolet", "Chevy", "GMC", "Cadillac", "Buick"]),
        ),
        vendor(
            "HONDA",
            &["Honda", "HONDA", "Acura", "ACURA"],
            &["parts.honda.com", "hondapartsnow.com", "acurapartsnow.com"],
            95,
            StructuredData,
            OEM_FALLBACKS,
            &[".fitment-data", ".vehicle-application", "table.compatibility"],
            oem_patterns(&["Honda", "Acura"]),
        ),
        vendor(
            "TOYOTA",
            &["Toyota", "TOYOTA", "Lexus", "LEXUS", "Scion", "SCION"],
            &["parts.toyota.com", "toyotapartsdeal.com", "lexuspartsnow.com"],
            95,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-compatibility", ".fitment-table"],
            oem_patterns(&["Toyota", "Lexus", "Scion"]),
        ),
        vendor(
            "NISSAN",
            &["Nissan", "NISSAN", "Infiniti", "INFINITI"],
            &["parts.nissanusa.com", "nissanpartsdeal.com", "infinitipartsdeal.com"],
            95,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-fitment", ".compatibility-data"],
            oem_patterns(&["Nissan", "Infiniti"]),
        ),
        // Performance and aftermarket brands
        vendor(
            "HAWK_PERFORMANCE",
            &["Hawk Performance", "HAWK PERFORMANCE", "Hawk", "HAWK"],
            &["hawkperformance.com", "hawkperformanceparts.com"],
            90,
            ConcatenatedText,
            &[TextExtraction, TableParser, ListParser, FallbackHeuristic],
            &[
                ".vehicle-applications", ".fitment-list", ".compatibility-info",
                "ul[class*=\"vehicle\"]", "div[class*=\"application\"]",
            ],
            VendorPatterns {
                concatenated: Some(r"\d{4}(?:\s*[-–—]\s*\d{4})?\s+[A-Z]".to_string()),
                simple: Some(years_word_model()),
                ..VendorPatterns::default()
            },
        ),
        vendor(
            "BILSTEIN",
            &["Bilstein", "BILSTEIN"],
            &["bilstein.com", "bilsteincanada.com", "bilsteinparts.com"],
            88,
            LabeledFields,
            &[TextExtraction, TableParser, ConcatenatedText, FallbackHeuristic],
            &[
                ".fitment-info", ".vehicle-compatibility", ".application-data",
                "div[class*=\"fitment\"]", "section[class*=\"compatibility\"]",
            ],
            VendorPatterns {
                concatenated: Some(r"\d{4}\s*[-–—]\s*\d{4}\s+[A-Za-z]".to_string()),
                structured: Some(format!(
                    r"(?i)Years:\s*(?P<start>\d{{4}})\s*[–-]\s*(?P<end>\d{{4}}),\s*Make:\s*(?P<make>[A-Za-z][A-Za-z\-]*(?:[ \t][A-Za-z][A-Za-z\-]*)?),\s*Model:\s*(?P<model>{MODEL_TOKEN})"
                )),
                simple: Some(format!(
                    r"\b(?P<years>\d{{4}}[ \t]*[–-][ \t]*\d{{4}})[ \t]+(?P<make>[A-Za-z]+)[ \t]+(?P<model>{MODEL_TOKEN})"
                )),
            },
        ),
        vendor(
            "BREMBO",
            &["Brembo", "BREMBO"],
            &["brembo.com", "bremboparts.com"],
            87,
            TableParser,
            RETAIL_FALLBACKS,
            &[".vehicle-application", "table[class*=\"fitment\"]"],
            generic_patterns(),
        ),
        vendor(
            "KN_FILTERS",
            &["K&N", "KN", "K&N Filters"],
            &["knfilters.com", "knperformance.com"],
            85,
            TableParser,
            RETAIL_FALLBACKS,
            &[".vehicle-search-results", ".fitment-table"],
            generic_patterns(),
        ),
        vendor(
            "BOSCH",
            &["Bosch", "BOSCH"],
            &["boschparts.com", "boschonline.com"],
            85,
            StructuredData,
            OEM_FALLBACKS,
            &[".product-fitment", ".vehicle-compatibility"],
            generic_patterns(),
        ),
        // European manufacturers
        vendor(
            "BMW",
            &["BMW", "bmw", "Mini", "MINI"],
            &["parts.bmw.com", "bmwpartsnow.com", "minipartsnow.com"],
            90,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-fitment", ".compatibility-info"],
            oem_patterns(&["BMW", "Mini"]),
        ),
        vendor(
            "MERCEDES_BENZ",
            &["Mercedes-Benz", "MERCEDES-BENZ", "Mercedes", "MERCEDES", "MB"],
            &["parts.mbusa.com", "mercedespartscenter.com"],
            90,
            StructuredData,
            OEM_FALLBACKS,
            &[".fitment-data", ".vehicle-application"],
            oem_patterns(&["Mercedes(?:-Benz)?", "MB"]),
        ),
        vendor(
            "AUDI",
            &["Audi", "AUDI"],
            &["parts.audi.com", "audipartsnow.com"],
            88,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-compatibility", ".fitment-table"],
            oem_patterns(&["Audi"]),
        ),
        vendor(
            "VOLKSWAGEN",
            &["Volkswagen", "VOLKSWAGEN", "VW", "vw"],
            &["parts.vw.com", "vwpartsnow.com"],
            88,
            StructuredData,
            OEM_FALLBACKS,
            &[".vehicle-fitment", ".compatibility-data"],
            oem_patterns(&["Volkswagen", "VW"]),
        ),
        // General retailers
        vendor(
            "AUTOZONE",
            &["AutoZone", "AUTOZONE"],
            &["autozone.com", "autozonepro.com"],
            70,
            TableParser,
            RETAIL_FALLBACKS,
            &[".vehicle-fitment", "table[class*=\"compatibility\"]"],
            generic_patterns(),
        ),
        vendor(
            "ADVANCE_AUTO",
            &["Advance Auto Parts", "ADVANCE AUTO PARTS", "Advance"],
            &["advanceautoparts.com"],
            70,
            TableParser,
            RETAIL_FALLBACKS,
            &[".fitment-info", ".vehicle-application"],
            generic_patterns(),
        ),
    ]
}

//! Fitment tables
//!
//! Rows qualify when they mention a 4-digit year and a known make. A header
//! row naming Year/Make/Model columns fixes the column layout for the rows
//! after it; otherwise the year, make and model are located by position.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;

use super::{Extraction, build_all, parse_year_range};
use crate::domain::ApplicationDraft;
use crate::infrastructure::parsing::html_text::{element_text, static_selector};
use crate::infrastructure::parsing::{MAKE_LEXICON, ParseContext, ParsingResult};

static TABLE: Lazy<Selector> = Lazy::new(|| static_selector("table"));
static ROW: Lazy<Selector> = Lazy::new(|| static_selector("tr"));
static CELL: Lazy<Selector> = Lazy::new(|| static_selector("td, th"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}\b").expect("valid year regex"));

/// Column positions announced by a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    year: usize,
    make: usize,
    model: usize,
    trim: Option<usize>,
    engine: Option<usize>,
    position: Option<usize>,
}

impl ColumnMap {
    fn from_header(cells: &[String]) -> Option<Self> {
        if cells.iter().any(|c| YEAR.is_match(c)) {
            return None;
        }
        let labels: Vec<String> = cells.iter().map(|c| c.trim().to_lowercase()).collect();
        let find = |names: &[&str]| labels.iter().position(|l| names.contains(&l.as_str()));

        Some(Self {
            year: find(&["year", "years", "model year", "year range"])?,
            make: find(&["make", "manufacturer", "brand"])?,
            model: find(&["model"])?,
            trim: find(&["trim", "submodel", "sub-model", "series"]),
            engine: find(&["engine", "motor"]),
            position: find(&["position", "location", "side"]),
        })
    }

    fn draft(&self, cells: &[String]) -> Option<ApplicationDraft> {
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim().to_string());
        let optional = |idx: Option<usize>| idx.and_then(cell).filter(|c| !c.is_empty());

        let (start, end) = parse_year_range(&cell(self.year)?)?;
        let mut draft = ApplicationDraft::new(start, cell(self.make)?, cell(self.model)?)
            .with_trim(optional(self.trim))
            .with_engine(optional(self.engine))
            .with_position(optional(self.position));
        draft.year_end = end;
        Some(draft)
    }
}

/// Year from the first cell holding one, make from the first cell holding a
/// known make, model from the next non-empty cell after the make.
fn positional_draft(cells: &[String]) -> Option<ApplicationDraft> {
    let (start, end) = cells.iter().find_map(|c| parse_year_range(c))?;
    let (make_idx, make) = cells
        .iter()
        .enumerate()
        .find_map(|(idx, c)| MAKE_LEXICON.find_in(c).map(|m| (idx, m)))?;
    let model = cells[make_idx + 1..]
        .iter()
        .map(|c| c.trim())
        .find(|c| !c.is_empty() && !YEAR.is_match(c))?;

    let mut draft = ApplicationDraft::new(start, make, model);
    draft.year_end = end;
    Some(draft)
}

pub fn extract(ctx: &ParseContext<'_>) -> ParsingResult<Extraction> {
    let mut drafts = Vec::new();
    let mut tables = 0usize;
    let mut rows_matched = 0usize;

    for table in ctx.html().select(&TABLE) {
        tables += 1;
        let mut columns: Option<ColumnMap> = None;

        for row in table.select(&ROW) {
            let cells: Vec<String> = row.select(&CELL).map(element_text).collect();
            if let Some(header) = ColumnMap::from_header(&cells) {
                columns = Some(header);
                continue;
            }
            if cells.len() < 2 {
                continue;
            }
            let row_text = cells.join(" ");
            if !YEAR.is_match(&row_text) || MAKE_LEXICON.find_in(&row_text).is_none() {
                continue;
            }
            rows_matched += 1;

            let draft = columns
                .as_ref()
                .map_or_else(|| positional_draft(&cells), |map| map.draft(&cells));
            drafts.extend(draft);
        }
    }

    Ok(Extraction::new(build_all(drafts, &ctx.bounds))
        .with_metadata("tables_processed", tables)
        .with_metadata("rows_matched", rows_matched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SourceDocument;

    fn run(html: &str) -> Extraction {
        let doc = SourceDocument::new("https://parts.example.com/p/1", html);
        extract(&ParseContext::new(&doc, "1")).unwrap()
    }

    #[test]
    fn test_header_mapped_columns() {
        let html = r"<table>
            <tr><th>Make</th><th>Model</th><th>Year</th><th>Engine</th><th>Position</th></tr>
            <tr><td>FORD</td><td>F-150</td><td>2015-2020</td><td>3.5L V6 EcoBoost</td><td>Front</td></tr>
            <tr><td>Lincoln</td><td>Navigator</td><td>2018</td><td></td><td>Rear</td></tr>
            <tr><td colspan=5>Prices subject to change</td></tr>
        </table>";

        let extraction = run(html);
        assert_eq!(extraction.applications.len(), 2);

        let f150 = &extraction.applications[0];
        assert_eq!((f150.year_start(), f150.year_end()), (2015, 2020));
        assert_eq!((f150.make(), f150.model()), ("Ford", "F-150"));
        assert_eq!(f150.engine(), Some("3.5L V6"));
        assert_eq!(f150.position(), Some("Front"));

        assert_eq!(extraction.applications[1].engine(), None);
        assert_eq!(extraction.metadata["rows_matched"], 2);
    }

    #[test]
    fn test_positional_rows_without_header() {
        let html = r"<table>
            <tr><td>2012</td><td>Mazda</td><td>MX-5 Miata</td></tr>
            <tr><td>2014 Kia</td><td>Forte</td></tr>
            <tr><td>2013</td><td>Widget</td><td>Gizmo</td></tr>
        </table>";

        let extraction = run(html);
        let found: Vec<_> = extraction
            .applications
            .iter()
            .map(|a| (a.year_start(), a.make().to_string(), a.model().to_string()))
            .collect();
        assert_eq!(
            found,
            vec![
                (2012, "Mazda".to_string(), "MX-5 Miata".to_string()),
                (2014, "Kia".to_string(), "Forte".to_string()),
            ]
        );
    }

    #[test]
    fn test_spec_tables_are_ignored() {
        let html = r"<table>
            <tr><th>Attribute</th><th>Value</th></tr>
            <tr><td>Weight</td><td>2.4 lbs</td></tr>
            <tr><td>Warranty</td><td>Since 1998</td></tr>
        </table>";
        assert!(run(html).applications.is_empty());
    }
}

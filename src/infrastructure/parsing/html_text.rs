//! Text and selector helpers shared by the strategies

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::{ParsingError, ParsingResult};

/// Elements whose text is never rendered
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line of rendered text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tbody", "thead", "tfoot",
    "tr", "ul",
];

/// Elements rendered as separate cells on the same line
const CELL_TAGS: &[&str] = &["td", "th"];

/// Rendered text of the whole document, one block element per line.
pub fn visible_text(html: &Html) -> String {
    element_text(html.root_element())
}

/// Rendered text below `element`, one block element per line, cells separated
/// by tabs. Whitespace inside each line is collapsed and blank lines dropped.
pub fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(|line| {
            line.split('\t')
                .map(|cell| cell.split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if HIDDEN_TAGS.contains(&name) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            let cell = CELL_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_element, out);
            if block {
                out.push('\n');
            } else if cell {
                out.push('\t');
            }
        } else if let Some(text) = child.value().as_text() {
            out.push_str(&text.replace(['\n', '\r', '\t'], " "));
        }
    }
}

/// Compile selector strings, skipping (and logging) the ones that fail.
/// Errors only when nothing compiled out of a non-empty list.
pub fn compile_selectors<S: AsRef<str>>(selector_strings: &[S]) -> ParsingResult<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        let selector_str = selector_str.as_ref();
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push((selector_str.to_string(), e.to_string()));
            }
        }
    }

    if selectors.is_empty() {
        if let Some((selector, reason)) = errors.into_iter().next() {
            return Err(ParsingError::invalid_selector(&selector, reason));
        }
    }

    Ok(selectors)
}

/// Compile a selector literal known to be valid.
pub(crate) fn static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid built-in selector {selector}: {e}"))
}

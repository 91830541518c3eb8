//! Parsing context shared by every strategy run on one document
//!
//! The document is parsed once; strategies borrow the tree and the lazily
//! rendered page text from here.

use once_cell::unsync::OnceCell;
use scraper::Html;

use super::html_text;
use crate::domain::{SourceDocument, YearBounds};
use crate::infrastructure::vendor_registry::VendorProfile;

/// Context information for parsing one document
pub struct ParseContext<'a> {
    /// Document being parsed
    pub document: &'a SourceDocument,

    /// Part number the caller is resolving
    pub part_number: &'a str,

    /// Vendor profile identified for this call, if any
    pub vendor: Option<&'a VendorProfile>,

    /// Acceptance window for model years
    pub bounds: YearBounds,

    html: Html,
    visible_text: OnceCell<String>,
}

impl<'a> ParseContext<'a> {
    /// Create new parse context
    pub fn new(document: &'a SourceDocument, part_number: &'a str) -> Self {
        Self {
            document,
            part_number,
            vendor: None,
            bounds: YearBounds::default(),
            html: Html::parse_document(&document.html),
            visible_text: OnceCell::new(),
        }
    }

    /// Attach the vendor profile
    #[must_use]
    pub fn with_vendor(mut self, vendor: Option<&'a VendorProfile>) -> Self {
        self.vendor = vendor;
        self
    }

    /// Set the acceptance window for model years
    #[must_use]
    pub fn with_bounds(mut self, bounds: YearBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub const fn html(&self) -> &Html {
        &self.html
    }

    /// Rendered page text, computed on first use
    pub fn visible_text(&self) -> &str {
        self.visible_text
            .get_or_init(|| html_text::visible_text(&self.html))
    }

    pub fn is_blank(&self) -> bool {
        self.document.is_blank()
    }
}

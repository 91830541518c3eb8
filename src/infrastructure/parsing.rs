//! HTML parsing infrastructure for fitment extraction
//!
//! A document is parsed once into a [`ParseContext`]; every strategy in
//! [`strategies`] reads from that context and never mutates it.

pub mod context;
pub mod html_text;
pub mod lexicon;
pub mod segmenter;
pub mod strategies;

// Re-export public types
pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use context::ParseContext;
pub use lexicon::{MAKE_LEXICON, MakeLexicon};
pub use segmenter::TextSegmenter;
pub use strategies::{Extraction, Strategy, StrategySet};

/// Parser that reads from a shared per-document context
pub trait ContextualParser {
    type Output;

    /// Parse the context's document
    fn parse_with_context(&self, context: &ParseContext<'_>) -> ParsingResult<Self::Output>;
}

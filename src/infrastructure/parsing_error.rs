//! Parsing error types for extraction strategies
//!
//! Strategies never let these escape: the orchestrator turns every
//! [`ParsingError`] into a message on a failed `ParseResult` and moves on.
//! Data-quality rejects are a different thing and live in
//! [`crate::domain::RejectReason`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid {name} pattern for vendor {vendor}: {reason}")]
    InvalidPattern {
        vendor: String,
        name: String,
        reason: String,
    },

    #[error("Malformed structured data in {source_kind}: {reason}")]
    MalformedStructuredData { source_kind: String, reason: String },

    #[error("Document is empty: {source_identity}")]
    EmptyDocument { source_identity: String },

    #[error("Strategy {strategy} needs a vendor profile")]
    MissingVendorProfile { strategy: String },

    #[error("No fitment content found (tried: {})", tried_selectors.join(", "))]
    NoFitmentContent { tried_selectors: Vec<String> },
}

impl ParsingError {
    /// Create an invalid selector error
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid vendor pattern error
    pub fn invalid_pattern(vendor: &str, name: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            vendor: vendor.to_string(),
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed structured data error
    pub fn malformed_structured_data(source_kind: &str, reason: impl ToString) -> Self {
        Self::MalformedStructuredData {
            source_kind: source_kind.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn empty_document(source_identity: impl Into<String>) -> Self {
        Self::EmptyDocument {
            source_identity: source_identity.into(),
        }
    }

    /// Whether later strategies can still be expected to find something on
    /// the same document.
    pub const fn is_document_level(&self) -> bool {
        matches!(self, Self::EmptyDocument { .. })
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = ParsingError::invalid_pattern("HAWK_PERFORMANCE", "concatenated", "unclosed group");
        assert_eq!(
            err.to_string(),
            "Invalid concatenated pattern for vendor HAWK_PERFORMANCE: unclosed group"
        );

        let err = ParsingError::NoFitmentContent {
            tried_selectors: vec![".fitment".into(), "table".into()],
        };
        assert!(err.to_string().ends_with("(tried: .fitment, table)"));
    }

    #[test]
    fn test_document_level_errors() {
        assert!(ParsingError::empty_document("sha:0123").is_document_level());
        assert!(!ParsingError::invalid_selector("div[", "unexpected end").is_document_level());
    }
}

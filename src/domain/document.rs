//! Already-fetched source documents handed to the engine

use serde::{Deserialize, Serialize};
use url::Url;

/// One fetched HTML page together with the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Where the page was fetched from. May be empty for ad-hoc documents.
    #[serde(default)]
    pub source_url: String,

    /// Raw HTML body
    pub html: String,
}

impl SourceDocument {
    pub fn new(source_url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            html: html.into(),
        }
    }

    /// Stable identity used as the cache key prefix.
    ///
    /// The URL when there is one, otherwise `sha:` followed by the first 16 hex
    /// characters of the BLAKE3 digest of the body.
    #[must_use]
    pub fn source_identity(&self) -> String {
        let url = self.source_url.trim();
        if url.is_empty() {
            let digest = blake3::hash(self.html.as_bytes()).to_hex();
            format!("sha:{}", &digest.as_str()[..16])
        } else {
            url.to_string()
        }
    }

    /// Lower-cased host of the source URL, if it parses.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(self.source_url.trim())
            .ok()
            .and_then(|url| url.host_str().map(str::to_lowercase))
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.html.trim().is_empty()
    }
}

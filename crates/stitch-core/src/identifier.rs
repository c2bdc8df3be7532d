//! Structural classification of operator input
//!
//! The trace lookup accepts three kinds of identifiers: a previously
//! requested URL, a CDN request id assigned by the edge layer, or an opaque
//! string (an activation id or free-text search term). Classification is
//! purely structural; no backend is consulted.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// CDN request ids are hyphenated hex groups of 8-4-(3|4)-4-12 characters.
/// The 3-character third group is the historical format; both are accepted.
static CDN_REQUEST_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{3,4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("CDN request id pattern is valid")
});

/// A classified input identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Absolute URL (scheme and host present). Carries the normalized href.
    Url(String),

    /// Edge-assigned CDN request id, either historical format.
    CdnRequestId(String),

    /// Anything else: an activation id or free-text search term.
    Opaque(String),
}

impl Identifier {
    /// Classify an input string into exactly one variant.
    ///
    /// A bare hostname without a scheme is not a URL; scheme-only inputs
    /// without a host (`mailto:`, `data:`) are not URLs either.
    pub fn classify(input: &str) -> Self {
        if CDN_REQUEST_ID.is_match(input) {
            return Identifier::CdnRequestId(input.to_string());
        }
        if let Ok(parsed) = Url::parse(input) {
            if parsed.has_host() {
                return Identifier::Url(parsed.to_string());
            }
        }
        Identifier::Opaque(input.to_string())
    }
}

//! Search query construction
//!
//! The backend takes a single `query_string` expression, a sort order and a
//! size cap. Results always come back newest first; the size cap makes the
//! query a "most recent first" cursor, not a full scan.

use serde_json::json;

/// Indexed fields used in query expressions.
pub mod fields {
    pub const ACTIVATION_ID: &str = "ow.activationId";
    pub const ACTION_NAME: &str = "ow.actionName";
    pub const TRANSACTION_ID: &str = "ow.transactionId";
    pub const APPLICATION_NAME: &str = "meta.applicationName";
    pub const CDN_URL: &str = "cdn.url";
    pub const CDN_METHOD: &str = "cdn.request.method";
    pub const CDN_REQUEST_ID: &str = "cdn.request.id";
    pub const CDN_REQUEST_ID_HEADER: &str =
        "actionOptions.params.__ow_headers.x-cdn-request-id";
}

/// The keyword (exact-match) index stores at most this many characters.
/// Longer candidates must fall back to substring matching.
pub const KEYWORD_INDEX_LIMIT: usize = 70;

/// A query against the log-search backend.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// `query_string` expression.
    pub expression: String,

    /// Result-size cap, applied after the newest-first sort.
    pub size: usize,
}

impl SearchQuery {
    pub fn new(expression: impl Into<String>, size: usize) -> Self {
        Self {
            expression: expression.into(),
            size,
        }
    }

    /// Request body in the backend's wire format.
    pub fn body(&self) -> serde_json::Value {
        json!({
            "query": {
                "query_string": {
                    "query": self.expression,
                }
            },
            "sort": [
                { "timestamp.keyword": "desc" }
            ],
            "size": self.size,
        })
    }
}

/// `(field: "value")` term.
pub fn term(field: &str, value: &str) -> String {
    format!("({}: \"{}\")", field, value)
}

/// Exact match via the keyword index, degrading to a substring match when
/// the value exceeds the index limit. The substring form can produce false
/// positives; that precision loss is accepted.
pub fn exact_or_substring(field: &str, value: &str) -> String {
    if value.len() > KEYWORD_INDEX_LIMIT {
        term(field, value)
    } else {
        format!("({}.keyword: \"{}\")", field, value)
    }
}

/// `(_exists_: field)` presence check.
pub fn exists(field: &str) -> String {
    format!("(_exists_: {})", field)
}

/// Disjunction of the same field over several values.
pub fn any_of(field: &str, values: &[String]) -> String {
    values
        .iter()
        .map(|v| term(field, v))
        .collect::<Vec<_>>()
        .join(" OR ")
}

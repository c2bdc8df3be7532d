//! CDN-request resolution
//!
//! Any supported input — a URL, an opaque activation id / search term, or an
//! already-canonical CDN request id — resolves to the CDN request id that
//! anchors the trace. Every branch that finds nothing returns `Ok(None)`:
//! "not found" is a normal outcome, not an error.

use crate::client::LogSearchClient;
use crate::error::LogSearchResult;
use crate::query::{self, fields, SearchQuery};
use stitch_core::Identifier;
use tracing::debug;

impl LogSearchClient {
    /// Resolve an arbitrary identifier into a canonical CDN request id.
    pub async fn resolve(&self, id: &str) -> LogSearchResult<Option<String>> {
        match Identifier::classify(id) {
            // already canonical, no query needed
            Identifier::CdnRequestId(id) => Ok(Some(id)),
            Identifier::Url(href) => self.resolve_from_url(&href).await,
            Identifier::Opaque(term) => self.resolve_from_opaque(&term).await,
        }
    }

    /// Most recent GET dispatch for this URL; the CDN request id comes from
    /// that hit's edge-request metadata.
    async fn resolve_from_url(&self, href: &str) -> LogSearchResult<Option<String>> {
        let expression = format!(
            "{} AND {} AND {}",
            query::exact_or_substring(fields::CDN_URL, href),
            query::term(
                fields::ACTION_NAME,
                &format!("{}*", self.settings().dispatch_action)
            ),
            query::term(fields::CDN_METHOD, "GET"),
        );

        let hits = self.run_query(&SearchQuery::new(expression, 1)).await?;
        let Some(source) = hits.first().and_then(|hit| hit.source.as_ref()) else {
            debug!("No dispatch entry found for URL");
            return Ok(None);
        };

        Ok(source
            .header_cdn_request_id()
            .or_else(|| source.cdn_request_id())
            .map(str::to_string))
    }

    /// Two-step indirection for opaque inputs: free-text search to a
    /// transaction id, then transaction id (or direct activation id) to the
    /// CDN request id. The header value wins over the direct field.
    async fn resolve_from_opaque(&self, term: &str) -> LogSearchResult<Option<String>> {
        let expression = format!(
            "(\"{}\") AND {}",
            term,
            query::exists(fields::TRANSACTION_ID)
        );

        let hits = self.run_query(&SearchQuery::new(expression, 1)).await?;
        let Some(transaction_id) = hits
            .first()
            .and_then(|hit| hit.source.as_ref())
            .and_then(|source| source.transaction_id())
            .map(str::to_string)
        else {
            debug!("No log entry with a transaction id matched the input");
            return Ok(None);
        };

        let expression = format!(
            "({} AND {}) OR ({} AND {})",
            query::term(fields::TRANSACTION_ID, &transaction_id),
            query::exists(fields::CDN_REQUEST_ID_HEADER),
            query::term(fields::ACTIVATION_ID, term),
            query::exists(fields::CDN_REQUEST_ID),
        );

        let hits = self.run_query(&SearchQuery::new(expression, 1)).await?;
        let Some(source) = hits.first().and_then(|hit| hit.source.as_ref()) else {
            debug!("Transaction {} has no entry with CDN metadata", transaction_id);
            return Ok(None);
        };

        Ok(source
            .header_cdn_request_id()
            .or_else(|| source.cdn_request_id())
            .map(str::to_string))
    }
}

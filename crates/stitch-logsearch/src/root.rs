//! Root-span location
//!
//! Finds the edge-layer entry for a resolved CDN request id and the pivot
//! activation id that seeds the deeper tracing query.

use crate::client::LogSearchClient;
use crate::error::LogSearchResult;
use crate::hit::{normalize_activation_id, HitSource};
use crate::query::{self, fields, SearchQuery};
use serde_json::Value;
use stitch_core::span::date_from_millis;
use stitch_core::RootSpan;
use tracing::debug;
use url::Url;

/// How many recent entries to partition when locating the root.
const ROOT_WINDOW_SIZE: usize = 100;

impl LogSearchClient {
    /// Locate the edge-layer root entry and pivot activation id for an
    /// identifier. `Ok(None)` when the identifier does not resolve or
    /// matches no log entry at all.
    pub async fn root_span(&self, id: &str) -> LogSearchResult<Option<RootSpan>> {
        let Some(cdn_request_id) = self.resolve(id).await? else {
            return Ok(None);
        };

        let expression = format!(
            "({} AND {}) OR {}",
            query::term(fields::CDN_REQUEST_ID, &cdn_request_id),
            query::term(fields::APPLICATION_NAME, &self.settings().edge_app_name),
            query::term(fields::CDN_REQUEST_ID_HEADER, &cdn_request_id),
        );

        let hits = self
            .run_query(&SearchQuery::new(expression, ROOT_WINDOW_SIZE))
            .await?;
        if hits.is_empty() {
            debug!("No log entries for CDN request id {}", cdn_request_id);
            return Ok(None);
        }

        // Hits arrive newest first and each match overwrites the previous
        // one, so for the pivot the earliest entry in the window wins.
        let mut edge: Option<&HitSource> = None;
        let mut pivot: Option<String> = None;
        let mut total = 0usize;
        for hit in &hits {
            let Some(source) = hit.source.as_ref() else {
                continue;
            };
            total += 1;
            if source.application_name() == Some(self.settings().edge_app_name.as_str()) {
                edge = Some(source);
            } else if let Some(activation_id) =
                normalize_activation_id(source.activation_id())
            {
                pivot = Some(activation_id);
            }
        }

        let Some(edge) = edge else {
            debug!("No edge entry found; returning pivot-only root");
            return Ok(Some(RootSpan::empty(pivot)));
        };

        let activation_id = normalize_activation_id(edge.activation_id());
        if total == 1 && pivot.is_none() {
            // the edge entry was the only hit; its own activation anchors
            // the deeper trace
            pivot = activation_id.clone();
        }

        let timestamp = edge.timestamp_millis().unwrap_or(0);
        let url = edge.cdn_url().map(str::to_string);
        let path = url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .map(|u| u.path().to_string());

        Ok(Some(RootSpan {
            pivot_activation_id: pivot,
            activation_id,
            name: self.settings().edge_app_name.clone(),
            duration: edge.cdn_duration(),
            timestamp,
            date: date_from_millis(timestamp),
            path,
            status: edge.cdn_status(),
            response: edge.cdn.as_ref().and_then(|cdn| cdn.response.clone()),
            url,
            data: residual(edge),
            empty: false,
        }))
    }
}

/// Residual edge-log fields not mapped to a typed attribute.
fn residual(source: &HitSource) -> Option<Value> {
    if source.extra.is_empty() {
        None
    } else {
        Some(Value::Object(source.extra.clone()))
    }
}

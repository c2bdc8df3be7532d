//! Log decoration
//!
//! One batched query fetches the log lines for every activation id in the
//! assembled span list; each hit is attached to the first span with that
//! activation id. Hits without a message are noise and dropped.

use crate::client::LogSearchClient;
use crate::error::LogSearchResult;
use crate::query::{self, fields, SearchQuery};
use stitch_core::span::date_from_millis;
use stitch_core::{LogEntry, Span};
use tracing::debug;

/// Hard ceiling on correlated log lines per trace. Combined with the
/// newest-first sort, traces producing more lines lose the oldest ones.
const DECORATION_WINDOW_SIZE: usize = 200;

impl LogSearchClient {
    /// Attach correlated log entries to the spans, in place. Issues no
    /// query when no span carries an activation id.
    pub async fn decorate(&self, spans: &mut [Span]) -> LogSearchResult<()> {
        let mut activation_ids: Vec<String> = Vec::new();
        for span in spans.iter() {
            if let Some(id) = span.activation_id.as_ref() {
                if !activation_ids.contains(id) {
                    activation_ids.push(id.clone());
                }
            }
        }
        if activation_ids.is_empty() {
            return Ok(());
        }

        let expression = query::any_of(fields::ACTIVATION_ID, &activation_ids);
        let hits = self
            .run_query(&SearchQuery::new(expression, DECORATION_WINDOW_SIZE))
            .await?;
        debug!(
            "Decorating {} spans from {} log hits",
            spans.len(),
            hits.len()
        );

        for hit in &hits {
            let Some(source) = hit.source.as_ref() else {
                continue;
            };
            let Some(activation_id) = source.activation_id() else {
                continue;
            };
            // noise filter: a hit without a message attaches nothing
            let Some(message) = source.message.as_ref().filter(|m| !m.is_empty()) else {
                continue;
            };
            // first span wins when activation ids repeat within a trace
            let Some(span) = spans
                .iter_mut()
                .find(|s| s.activation_id.as_deref() == Some(activation_id))
            else {
                continue;
            };

            let timestamp = source.timestamp_millis().unwrap_or(0);
            span.logs.push(LogEntry {
                activation_id: Some(activation_id.to_string()),
                action_name: source.action_name().map(str::to_string),
                application_name: source.application_name().map(str::to_string),
                subsystem_name: source.subsystem_name().map(str::to_string),
                transaction_id: source.transaction_id().map(str::to_string),
                level: source.level_str(),
                message: message.clone(),
                timestamp,
                date: date_from_millis(timestamp),
                url: source.cdn_url().map(str::to_string),
            });

            // Hits arrive newest first and every URL-carrying hit
            // overwrites, so the earliest one in the window wins.
            if let Some(url) = source.cdn_url() {
                span.url = Some(url.to_string());
            }
        }

        for span in spans.iter_mut() {
            span.logs.sort_by_key(|entry| entry.timestamp);
        }

        Ok(())
    }
}

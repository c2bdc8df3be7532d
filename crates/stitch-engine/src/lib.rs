//! Trace reconstruction pipeline
//!
//! Composes the pipeline stages in their fixed order: identifier resolution
//! and root lookup, tracing-backend fetch, tree reassembly, then one batched
//! log decoration. Every stage's "nothing found" degrades to an empty or
//! partial result; only upstream failures surface as errors.

use stitch_apm::{flatten, ApmClient, ApmError, TraceFetch};
use stitch_assemble::reassemble;
use stitch_core::{Span, StitchConfig};
use stitch_logsearch::{LogSearchClient, LogSearchError};
use thiserror::Error;
use tracing::{debug, info};

/// Errors surfaced by the reconstruction pipeline
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    LogSearch(#[from] LogSearchError),

    #[error(transparent)]
    Apm(#[from] ApmError),
}

/// The trace reconstruction engine. Stateless across invocations; each
/// reconstruction is an independent chain of backend calls.
pub struct Engine {
    logsearch: LogSearchClient,
    apm: ApmClient,
}

impl Engine {
    /// Build an engine from injected configuration.
    pub fn new(config: &StitchConfig) -> Self {
        Self {
            logsearch: LogSearchClient::new(config.log_search.clone()),
            apm: ApmClient::new(config.apm.clone()),
        }
    }

    /// Reconstruct the enriched, ordered span list for an identifier.
    ///
    /// An identifier that resolves to nothing yields an empty list, not an
    /// error.
    pub async fn reconstruct(&self, id: &str) -> Result<Vec<Span>, EngineError> {
        let Some(root) = self.logsearch.root_span(id).await? else {
            info!("No trace found for identifier");
            return Ok(Vec::new());
        };

        let pivot = root.pivot_activation_id.clone();
        let mut spans = Vec::new();
        if !root.empty {
            spans.push(root.into_span());
        }

        let Some(pivot) = pivot else {
            debug!("Root entry has no pivot activation; returning edge span only");
            return Ok(spans);
        };

        match self.apm.fetch_trace(&pivot).await? {
            TraceFetch::Graph(containers) => {
                let flat = flatten(&containers);
                debug!("Reassembling {} spans", flat.len());
                spans.extend(reassemble(flat));
            }
            TraceFetch::NotFound => {
                debug!("No tracing span for pivot {} within the window", pivot);
            }
            TraceFetch::SpanOnly => {
                debug!("Pivot {} has a span but no reachable graph", pivot);
            }
        }

        if !spans.is_empty() {
            self.logsearch.decorate(&mut spans).await?;
        }

        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stitch_core::config::{ApmSettings, LogSearchSettings};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CDN_ID: &str = "adcb424f-c397-d51c-a3cd-76d2559a0b40";

    fn engine(server: &MockServer) -> Engine {
        let config = StitchConfig {
            log_search: LogSearchSettings {
                endpoint: format!("{}/logs/_search", server.uri()),
                token: "log-token".to_string(),
                ..LogSearchSettings::default()
            },
            apm: ApmSettings {
                endpoint: server.uri(),
                token: "apm-token".to_string(),
            },
            ..StitchConfig::default()
        };
        Engine::new(&config)
    }

    async fn mount_root_query(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .and(body_string_contains("cdn.request.id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "hits": [
                    { "_source": {
                        "timestamp": "2020-05-13T07:00:00.000Z",
                        "ow": { "activationId": "act-edge" },
                        "meta": { "applicationName": "fastly" },
                        "cdn": {
                            "url": "https://www.hlx.page/",
                            "duration": 40.0,
                            "request": { "id": CDN_ID, "method": "GET" },
                            "response": { "status": 200 }
                        }
                    } }
                ] }
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_full_pipeline_for_cdn_request_id() {
        let server = MockServer::start().await;
        mount_root_query(&server).await;

        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "span_id": "s-root" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/spans/graph"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "name": "dispatch", "type": "action", "spans": [
                        {
                            "span_id": "s-root",
                            "operation_name": "invoke",
                            "start_time": 1589353200.0,
                            "duration": 1500.0,
                            "tags": { "activation_id": "act-edge" },
                            "references": []
                        },
                        {
                            "span_id": "s-child",
                            "operation_name": "render",
                            "start_time": 1589353201.0,
                            "duration": 900.0,
                            "tags": { "activation_id": "act-child" },
                            "references": [ { "spanID": "s-root" } ]
                        }
                    ] }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        // decoration: one batched query over both activation ids
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .and(body_string_contains("ow.activationId"))
            .and(body_string_contains("act-edge"))
            .and(body_string_contains("act-child"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "hits": [
                    { "_source": {
                        "timestamp": "2020-05-13T07:00:01.500Z",
                        "message": "rendered",
                        "ow": { "activationId": "act-child" }
                    } }
                ] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spans = engine(&server).reconstruct(CDN_ID).await.unwrap();

        assert_eq!(spans.len(), 3);
        // edge root first, then the reassembled tree
        assert_eq!(spans[0].name, "fastly");
        assert_eq!(spans[0].level, 0);
        assert_eq!(spans[1].span_id.as_deref(), Some("s-root"));
        assert_eq!(spans[2].span_id.as_deref(), Some("s-child"));
        assert_eq!(spans[2].level, 1);
        assert_eq!(spans[2].logs.len(), 1);
        assert_eq!(spans[2].logs[0].message, "rendered");
    }

    #[tokio::test]
    async fn test_unresolved_identifier_yields_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "hits": [] }
            })))
            .mount(&server)
            .await;

        let spans = engine(&server)
            .reconstruct("https://www.hlx.page/unknown.html")
            .await
            .unwrap();
        assert!(spans.is_empty());
    }

    #[tokio::test]
    async fn test_step_code_zero_skips_graph_and_decoration() {
        let server = MockServer::start().await;

        // pivot-only root: a dispatch entry but no edge entry
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": { "hits": [
                    { "_source": {
                        "timestamp": "2020-05-13T07:00:00.000Z",
                        "ow": { "activationId": "act-dispatch" }
                    } }
                ] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        // stage 1 finds nothing within the window
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let spans = engine(&server).reconstruct(CDN_ID).await.unwrap();
        assert!(spans.is_empty());

        // exactly two requests: the root query and the event search — no
        // graph fetch, no decoration query
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_bubbles_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = engine(&server).reconstruct(CDN_ID).await.unwrap_err();
        assert!(matches!(err, EngineError::LogSearch(_)));
    }
}

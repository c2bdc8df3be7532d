//! HTTP client for the tracing backend
//!
//! Two-stage fetch: a search over recent events locates the span matching
//! the pivot activation id, then the graph endpoint returns every span
//! container reachable from it. An empty first stage is a valid "nothing
//! found" outcome, never an error.

use crate::error::{ApmError, ApmResult};
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use stitch_core::config::ApmSettings;
use tracing::{debug, error};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lookups are bounded to this window; older activations yield empty
/// results, not errors.
const SEARCH_WINDOW_DAYS: i64 = 7;

/// Outcome of a trace fetch.
#[derive(Debug, Clone)]
pub enum TraceFetch {
    /// No span matched the activation id within the search window.
    NotFound,

    /// A matching event was found but exposes no span id, so the graph
    /// cannot be fetched.
    SpanOnly,

    /// The complete reachable span graph.
    Graph(Vec<SpanContainer>),
}

/// One execution unit returned by the graph endpoint, holding the spans of
/// its sub-operations.
#[derive(Debug, Clone, Deserialize)]
pub struct SpanContainer {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

/// One raw span from the graph endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSpan {
    pub span_id: Option<String>,
    pub operation_name: Option<String>,

    /// Start time in epoch seconds (fractional).
    pub start_time: Option<f64>,

    /// Duration in backend-native microseconds.
    pub duration: Option<f64>,

    pub error: Option<bool>,

    /// Heterogeneous tag bag; see the flattening extractor chains.
    #[serde(default)]
    pub tags: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub references: Vec<SpanReference>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpanReference {
    #[serde(rename = "spanID")]
    pub span_id: Option<String>,
}

/// Stage-1 search result event.
#[derive(Debug, Deserialize)]
struct SearchEvent {
    span_id: Option<String>,
}

/// The search endpoint answers either a bare array or an `items` wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventsEnvelope {
    Wrapped { items: Vec<SearchEvent> },
    List(Vec<SearchEvent>),
}

impl EventsEnvelope {
    fn into_events(self) -> Vec<SearchEvent> {
        match self {
            EventsEnvelope::Wrapped { items } => items,
            EventsEnvelope::List(events) => events,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    #[serde(default)]
    data: Vec<SpanContainer>,
}

/// Client for the tracing backend.
pub struct ApmClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl ApmClient {
    /// Create a new client from injected settings.
    pub fn new(settings: ApmSettings) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("tracestitch/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token: settings.token,
        }
    }

    /// Fetch the span graph anchored at the given activation id.
    pub async fn fetch_trace(&self, activation_id: &str) -> ApmResult<TraceFetch> {
        let Some(span_id) = self.search_span_id(activation_id).await? else {
            return Ok(TraceFetch::NotFound);
        };
        let Some(span_id) = span_id else {
            debug!("Event for {} has no span id; graph unavailable", activation_id);
            return Ok(TraceFetch::SpanOnly);
        };

        let containers = self.span_graph(&span_id).await?;
        Ok(TraceFetch::Graph(containers))
    }

    /// Stage 1: search recent events for the activation id.
    ///
    /// Outer `None` = no event at all; inner `None` = event without a
    /// span id.
    async fn search_span_id(&self, activation_id: &str) -> ApmResult<Option<Option<String>>> {
        let now = Utc::now();
        let filter = json!({
            "search_string": [{
                "type": "activation_id",
                "term": activation_id,
            }],
            "time_frame": {
                "type": "last_week",
                "frequency": 86400,
                "from": (now - ChronoDuration::days(SEARCH_WINDOW_DAYS)).timestamp_millis(),
                "to": now.timestamp_millis(),
            },
            "sort": {
                "by": "start_time",
                "direction": "desc",
            },
        });

        let url = format!("{}/search/query_events", self.endpoint);
        debug!("Searching tracing events for activation {}", activation_id);

        let response = self
            .client
            .get(&url)
            .query(&[("query", filter.to_string())])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Tracing event search failed with status {}", status);
            return Err(ApmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: EventsEnvelope = response.json().await?;
        let mut events = envelope.into_events();
        if events.is_empty() {
            return Ok(None);
        }
        Ok(Some(events.remove(0).span_id))
    }

    /// Stage 2: fetch the complete span graph reachable from a span id.
    async fn span_graph(&self, span_id: &str) -> ApmResult<Vec<SpanContainer>> {
        let url = format!("{}/spans/graph", self.endpoint);
        debug!("Fetching span graph for {}", span_id);

        let response = self
            .client
            .get(&url)
            .query(&[("span_id", span_id)])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Span graph fetch failed with status {}", status);
            return Err(ApmError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let graph: GraphResponse = response.json().await?;
        Ok(graph.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param_contains};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApmClient {
        ApmClient::new(ApmSettings {
            endpoint: server.uri(),
            token: "apm-token".to_string(),
        })
    }

    #[tokio::test]
    async fn test_empty_search_short_circuits_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .and(header("authorization", "Bearer apm-token"))
            .and(query_param_contains("query", "act-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        // no /spans/graph mock: stage 2 must not run

        let fetch = client(&server).fetch_trace("act-1").await.unwrap();
        assert!(matches!(fetch, TraceFetch::NotFound));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_event_without_span_id_is_span_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "span_id": null }
            ])))
            .mount(&server)
            .await;

        let fetch = client(&server).fetch_trace("act-1").await.unwrap();
        assert!(matches!(fetch, TraceFetch::SpanOnly));
    }

    #[tokio::test]
    async fn test_full_graph_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "span_id": "span-root" }
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/spans/graph"))
            .and(query_param_contains("span_id", "span-root"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {
                        "name": "dispatch",
                        "type": "action",
                        "spans": [
                            {
                                "span_id": "span-root",
                                "operation_name": "invoke",
                                "start_time": 1589353200.0,
                                "duration": 1500.0,
                                "error": false,
                                "tags": { "activation_id": "act-1" },
                                "references": []
                            }
                        ]
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let fetch = client(&server).fetch_trace("act-1").await.unwrap();
        match fetch {
            TraceFetch::Graph(containers) => {
                assert_eq!(containers.len(), 1);
                assert_eq!(containers[0].name.as_deref(), Some("dispatch"));
                assert_eq!(containers[0].spans.len(), 1);
            }
            other => panic!("expected Graph, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_items_wrapper_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": []
            })))
            .mount(&server)
            .await;

        let fetch = client(&server).fetch_trace("act-1").await.unwrap();
        assert!(matches!(fetch, TraceFetch::NotFound));
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/query_events"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_trace("act-1").await.unwrap_err();
        match err {
            ApmError::Upstream { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }
}

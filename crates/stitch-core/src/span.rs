//! Call-tree data model
//!
//! A reconstructed trace is a flat, ordered list of [`Span`]s: the edge-layer
//! entry first (when one was found), then the tracing-backend spans in
//! pre-order, each carrying its nesting `level` and correlated [`LogEntry`]s.
//!
//! All fields serialize in camelCase, which is the wire contract consumed by
//! the browser front end.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Convert an epoch-millis timestamp into a UTC datetime.
///
/// Out-of-range values fall back to the epoch rather than failing; the
/// timestamp itself is what ordering relies on.
pub fn date_from_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// One node in the reconstructed call tree: either the edge-layer entry or a
/// backend action invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Span {
    /// Present only for tracing-backend-sourced spans.
    pub span_id: Option<String>,

    /// Activation id of the execution unit this span belongs to.
    pub activation_id: Option<String>,

    /// Display name: action name or backend system name (e.g. "fastly").
    pub name: String,

    /// Fully qualified invocation path, when the backend reports one.
    pub invoked_name: Option<String>,

    /// Operation performed within the execution unit.
    pub operation: Option<String>,

    /// Start time in epoch millis; sibling ordering key.
    pub timestamp: i64,

    /// Start time as a UTC datetime.
    pub date: DateTime<Utc>,

    /// Duration in backend-native units: microseconds for tracing-backend
    /// spans, milliseconds for the edge entry.
    pub duration: Option<f64>,

    /// Request path, when known.
    pub path: Option<String>,

    /// Request host, when known.
    pub host: Option<String>,

    /// HTTP-like status resolved through the tag fallback chain.
    pub status: Option<i64>,

    /// Whether the backend flagged this span as failed.
    pub error: bool,

    /// Invocation parameters, verbatim from the backend.
    pub params: Option<serde_json::Value>,

    /// Invocation response, verbatim from the backend.
    pub response: Option<serde_json::Value>,

    /// Residual backend fields not mapped to a typed attribute.
    pub data: Option<serde_json::Value>,

    /// Parent span id; `None` only for top-level spans.
    pub parent_span_id: Option<String>,

    /// Nesting depth assigned by the tree reassembler, starting at 0.
    pub level: u32,

    /// Correlated log lines, ascending by timestamp once decorated.
    pub logs: Vec<LogEntry>,

    /// CDN URL recovered from the correlated logs.
    pub url: Option<String>,
}

impl Span {
    /// Create a span with the given display name and start time.
    pub fn new(name: impl Into<String>, timestamp: i64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            date: date_from_millis(timestamp),
            ..Self::default()
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            span_id: None,
            activation_id: None,
            name: String::new(),
            invoked_name: None,
            operation: None,
            timestamp: 0,
            date: DateTime::<Utc>::UNIX_EPOCH,
            duration: None,
            path: None,
            host: None,
            status: None,
            error: false,
            params: None,
            response: None,
            data: None,
            parent_span_id: None,
            level: 0,
            logs: Vec::new(),
            url: None,
        }
    }
}

/// One correlated log line, owned by exactly one span.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub activation_id: Option<String>,
    pub action_name: Option<String>,
    pub application_name: Option<String>,
    pub subsystem_name: Option<String>,
    pub transaction_id: Option<String>,

    /// Log severity as reported by the backend.
    pub level: Option<String>,

    /// Log line text. Hits without a message are discarded upstream.
    pub message: String,

    /// Epoch millis; ordering key within a span's log list.
    pub timestamp: i64,
    pub date: DateTime<Utc>,

    /// CDN URL metadata attached to the hit, when present.
    pub url: Option<String>,
}

/// The edge-layer record anchoring a reconstructed trace.
///
/// Sourced from the log-search backend rather than the tracing backend, so it
/// has no span id. Carries the pivot activation id that seeds the deeper
/// tracing query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSpan {
    /// Activation id used to seed the tracing-backend query.
    pub pivot_activation_id: Option<String>,

    /// The edge entry's own activation id, when it reports one.
    pub activation_id: Option<String>,

    /// Edge application sentinel (e.g. "fastly").
    pub name: String,

    /// Duration in milliseconds, from the edge log.
    pub duration: Option<f64>,

    pub timestamp: i64,
    pub date: DateTime<Utc>,
    pub path: Option<String>,
    pub status: Option<i64>,
    pub response: Option<serde_json::Value>,
    pub url: Option<String>,

    /// Residual edge-log fields.
    pub data: Option<serde_json::Value>,

    /// No edge-layer hit was found; only a pivot into the deeper trace.
    pub empty: bool,
}

impl RootSpan {
    /// A pivot-only record signalling "no edge summary to show".
    pub fn empty(pivot_activation_id: Option<String>) -> Self {
        Self {
            pivot_activation_id,
            activation_id: None,
            name: String::new(),
            duration: None,
            timestamp: 0,
            date: DateTime::<Utc>::UNIX_EPOCH,
            path: None,
            status: None,
            response: None,
            url: None,
            data: None,
            empty: true,
        }
    }

    /// Convert into a displayable level-0 span.
    pub fn into_span(self) -> Span {
        Span {
            activation_id: self.activation_id,
            name: self.name,
            timestamp: self.timestamp,
            date: self.date,
            duration: self.duration,
            path: self.path,
            status: self.status,
            response: self.response,
            url: self.url,
            data: self.data,
            ..Span::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_millis() {
        let date = date_from_millis(1_600_000_000_000);
        assert_eq!(date.timestamp_millis(), 1_600_000_000_000);
    }

    #[test]
    fn test_span_serializes_camel_case() {
        let mut span = Span::new("dispatch", 1_600_000_000_000);
        span.parent_span_id = Some("abc".to_string());
        span.activation_id = Some("act-1".to_string());

        let value = serde_json::to_value(&span).unwrap();
        assert_eq!(value["parentSpanId"], "abc");
        assert_eq!(value["activationId"], "act-1");
        assert_eq!(value["timestamp"], 1_600_000_000_000_i64);
        assert_eq!(value["level"], 0);
        assert!(value["logs"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_root_span_into_span_is_top_level() {
        let root = RootSpan {
            pivot_activation_id: Some("pivot".to_string()),
            activation_id: Some("act-edge".to_string()),
            name: "fastly".to_string(),
            duration: Some(120.0),
            timestamp: 1_600_000_000_000,
            date: date_from_millis(1_600_000_000_000),
            path: Some("/index.html".to_string()),
            status: Some(200),
            response: None,
            url: Some("https://www.example.com/index.html".to_string()),
            data: None,
            empty: false,
        };

        let span = root.into_span();
        assert_eq!(span.level, 0);
        assert!(span.span_id.is_none());
        assert!(span.parent_span_id.is_none());
        assert_eq!(span.name, "fastly");
        assert_eq!(span.status, Some(200));
    }

    #[test]
    fn test_empty_root_span() {
        let root = RootSpan::empty(Some("pivot".to_string()));
        assert!(root.empty);
        assert_eq!(root.pivot_activation_id.as_deref(), Some("pivot"));
        assert!(root.activation_id.is_none());
    }
}

//! Span-graph flattening
//!
//! The graph endpoint returns containers, each holding the spans of one
//! execution unit. Flattening maps every raw span onto the canonical
//! [`Span`] shape. The backends disagree on where fields live, so each
//! attribute is resolved through an ordered chain of named extractors; a
//! missing nested field fails only that extractor, never the span.

use crate::client::{RawSpan, SpanContainer};
use serde_json::{Map, Value};
use stitch_core::span::date_from_millis;
use stitch_core::Span;

/// Tag keys consumed by the typed extractors. Anything else lands in the
/// span's residual `data`.
const TAG_ACTION_NAME: &str = "action_name";
const TAG_INVOKED_NAME: &str = "invoked_name";
const TAG_ACTIVATION_ID: &str = "activation_id";
const TAG_HOST: &str = "host";
const TAG_PARAMS: &str = "params";
const TAG_RESPONSE: &str = "response";
const TAG_STATUS_CODE: &str = "status_code";
const TAG_STATUS: &str = "status";
const TAG_HTTP_STATUS: &str = "http.status_code";

/// Response header that carries the logically relevant activation id when
/// an action sequence hides it behind the visible one.
const LAST_ACTIVATION_HEADER: &str = "x-last-activation-id";

/// Flatten every container's spans into canonical spans, in backend order.
/// Ordering and nesting levels are the reassembler's job.
pub fn flatten(containers: &[SpanContainer]) -> Vec<Span> {
    let mut spans = Vec::new();
    for container in containers {
        for raw in &container.spans {
            spans.push(span_from_raw(container, raw));
        }
    }
    spans
}

fn span_from_raw(container: &SpanContainer, raw: &RawSpan) -> Span {
    let tags = &raw.tags;
    let timestamp = raw
        .start_time
        .map(|seconds| (seconds * 1000.0) as i64)
        .unwrap_or(0);

    Span {
        span_id: raw.span_id.clone(),
        activation_id: activation_id(tags),
        name: action_name(tags)
            .or_else(|| container.name.clone())
            .unwrap_or_default(),
        invoked_name: string_tag(tags, TAG_INVOKED_NAME),
        operation: raw.operation_name.clone(),
        timestamp,
        date: date_from_millis(timestamp),
        duration: raw.duration,
        path: path(tags),
        host: string_tag(tags, TAG_HOST),
        status: status(tags),
        error: raw.error.unwrap_or(false),
        params: tags.get(TAG_PARAMS).cloned(),
        response: tags.get(TAG_RESPONSE).cloned(),
        data: residual(tags),
        parent_span_id: raw
            .references
            .first()
            .and_then(|reference| reference.span_id.clone()),
        level: 0,
        logs: Vec::new(),
        url: None,
    }
}

/// Display name: the explicit action-name tag, else the container's name
/// (handled by the caller's `or_else`).
fn action_name(tags: &Map<String, Value>) -> Option<String> {
    string_tag(tags, TAG_ACTION_NAME)
}

/// Activation id: the last-activation response header wins over the plain
/// tag, so action sequences report the logically relevant activation.
fn activation_id(tags: &Map<String, Value>) -> Option<String> {
    last_activation_header(tags).or_else(|| string_tag(tags, TAG_ACTIVATION_ID))
}

fn last_activation_header(tags: &Map<String, Value>) -> Option<String> {
    tags.get(TAG_RESPONSE)?
        .get("headers")?
        .get(LAST_ACTIVATION_HEADER)?
        .as_str()
        .map(str::to_string)
}

/// Request path from the invocation parameters.
fn path(tags: &Map<String, Value>) -> Option<String> {
    tags.get(TAG_PARAMS)?
        .get("path")?
        .as_str()
        .map(str::to_string)
}

/// Ordered status fallback chain: explicit status-code tag, response
/// result, generic status tag, HTTP status tag.
fn status(tags: &Map<String, Value>) -> Option<i64> {
    status_code_tag(tags)
        .or_else(|| response_result_status(tags))
        .or_else(|| generic_status_tag(tags))
        .or_else(|| http_status_tag(tags))
}

fn status_code_tag(tags: &Map<String, Value>) -> Option<i64> {
    tags.get(TAG_STATUS_CODE).and_then(numeric)
}

fn response_result_status(tags: &Map<String, Value>) -> Option<i64> {
    tags.get(TAG_RESPONSE)?
        .get("result")?
        .get("statusCode")
        .and_then(numeric)
}

fn generic_status_tag(tags: &Map<String, Value>) -> Option<i64> {
    tags.get(TAG_STATUS).and_then(numeric)
}

fn http_status_tag(tags: &Map<String, Value>) -> Option<i64> {
    tags.get(TAG_HTTP_STATUS).and_then(numeric)
}

/// Statuses arrive as numbers or numeric strings depending on the source.
fn numeric(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn string_tag(tags: &Map<String, Value>, key: &str) -> Option<String> {
    tags.get(key)?.as_str().map(str::to_string)
}

/// Tags not consumed by a typed extractor, kept verbatim.
fn residual(tags: &Map<String, Value>) -> Option<Value> {
    const CONSUMED: [&str; 9] = [
        TAG_ACTION_NAME,
        TAG_INVOKED_NAME,
        TAG_ACTIVATION_ID,
        TAG_HOST,
        TAG_PARAMS,
        TAG_RESPONSE,
        TAG_STATUS_CODE,
        TAG_STATUS,
        TAG_HTTP_STATUS,
    ];

    let rest: Map<String, Value> = tags
        .iter()
        .filter(|(key, _)| !CONSUMED.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if rest.is_empty() {
        None
    } else {
        Some(Value::Object(rest))
    }
}

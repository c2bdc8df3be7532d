//! Raw hit deserialization
//!
//! The backend wraps results as `{hits: {hits: [{_source: {...}}]}}`. Every
//! nested block is optional: a hit missing an expected block fails only the
//! extraction that needed it, never the whole query.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

/// Top-level search response envelope.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub hits: Option<HitsEnvelope>,
}

#[derive(Debug, Deserialize)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// One search hit; only `_source` carries usable data.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_source")]
    pub source: Option<HitSource>,
}

/// The `_source` document of a hit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HitSource {
    /// Backend timestamp: an ISO-8601 string or epoch millis, depending on
    /// the ingesting pipeline.
    pub timestamp: Option<Value>,

    /// Log severity; string or numeric.
    pub level: Option<Value>,

    pub message: Option<String>,

    pub ow: Option<OwBlock>,

    pub meta: Option<MetaBlock>,

    pub cdn: Option<CdnBlock>,

    #[serde(rename = "actionOptions")]
    pub action_options: Option<ActionOptions>,

    /// Residual fields kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Action-platform fields of a log line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwBlock {
    #[serde(rename = "activationId")]
    pub activation_id: Option<String>,
    #[serde(rename = "actionName")]
    pub action_name: Option<String>,
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
}

/// Ingestion metadata.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetaBlock {
    #[serde(rename = "applicationName")]
    pub application_name: Option<String>,
    #[serde(rename = "subsystemName")]
    pub subsystem_name: Option<String>,
}

/// Edge-layer request metadata, present on edge entries and on dispatch
/// entries that saw the CDN request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CdnBlock {
    pub url: Option<String>,

    /// Edge-side duration in milliseconds.
    pub duration: Option<f64>,

    pub request: Option<CdnRequest>,

    /// Edge response record; `status` is read from it when present.
    pub response: Option<Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CdnRequest {
    pub id: Option<String>,
    pub method: Option<String>,
}

/// Invocation options recorded by the dispatch action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionOptions {
    pub params: Option<ActionParams>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActionParams {
    #[serde(rename = "__ow_headers")]
    pub headers: Option<serde_json::Map<String, Value>>,

    pub path: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl HitSource {
    pub fn activation_id(&self) -> Option<&str> {
        self.ow.as_ref()?.activation_id.as_deref()
    }

    pub fn action_name(&self) -> Option<&str> {
        self.ow.as_ref()?.action_name.as_deref()
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.ow.as_ref()?.transaction_id.as_deref()
    }

    pub fn application_name(&self) -> Option<&str> {
        self.meta.as_ref()?.application_name.as_deref()
    }

    pub fn subsystem_name(&self) -> Option<&str> {
        self.meta.as_ref()?.subsystem_name.as_deref()
    }

    pub fn cdn_url(&self) -> Option<&str> {
        self.cdn.as_ref()?.url.as_deref()
    }

    /// CDN request id from the direct edge-log field.
    pub fn cdn_request_id(&self) -> Option<&str> {
        self.cdn.as_ref()?.request.as_ref()?.id.as_deref()
    }

    /// CDN request id from the dispatch entry's header metadata.
    pub fn header_cdn_request_id(&self) -> Option<&str> {
        self.action_options
            .as_ref()?
            .params
            .as_ref()?
            .headers
            .as_ref()?
            .get("x-cdn-request-id")?
            .as_str()
    }

    /// Edge response status, when the hit carries an edge response record.
    pub fn cdn_status(&self) -> Option<i64> {
        self.cdn.as_ref()?.response.as_ref()?.get("status")?.as_i64()
    }

    /// Edge-side duration in milliseconds.
    pub fn cdn_duration(&self) -> Option<f64> {
        self.cdn.as_ref()?.duration
    }

    /// Hit timestamp as epoch millis, accepting ISO-8601 strings and raw
    /// epoch-millis numbers.
    pub fn timestamp_millis(&self) -> Option<i64> {
        match self.timestamp.as_ref()? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Log severity rendered as a string.
    pub fn level_str(&self) -> Option<String> {
        match self.level.as_ref()? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    // some pipelines drop the zone designator; treat those as UTC
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// The backend emits the literal string `"(null)"` for absent activation
/// ids on edge entries; normalize it to a real absence.
pub fn normalize_activation_id(id: Option<&str>) -> Option<String> {
    match id {
        None | Some("(null)") => None,
        Some(other) => Some(other.to_string()),
    }
}

//! Best-effort payload decoding.

use serde::Serialize;
use serde_json::Value;
use tracing::trace;

/// A decoded message body.
///
/// Serializes untagged, so a renderer sees either the JSON value or the raw
/// string without caring which it got.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Body parsed as JSON.
    Structured(Value),
    /// Body that was not valid JSON, kept verbatim.
    Raw(String),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Structured(_) => None,
            Payload::Raw(raw) => Some(raw),
        }
    }
}

/// Parse `raw` as JSON, falling back to the raw body. Never fails.
pub fn decode(raw: &str) -> Payload {
    match serde_json::from_str(raw) {
        Ok(value) => Payload::Structured(value),
        Err(e) => {
            trace!(error = %e, "Payload is not JSON, keeping raw body");
            Payload::Raw(raw.to_string())
        }
    }
}

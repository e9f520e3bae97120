//! Broker configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known socket endpoint of the message bus.
pub const DEFAULT_ENDPOINT: &str = "/ws";

/// Connection configuration shared by every feed on a broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Socket endpoint handed to the transport.
    /// Default: "/ws"
    pub endpoint: String,

    /// Headers sent with the connect frame.
    pub headers: BTreeMap<String, String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl FeedConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

//! Topic naming for live telemetry.
//!
//! Topics live under a fixed namespace:
//!
//! ```text
//! /topic/hydroleaf/v1/<group>/<member>/<metric>
//! ```
//!
//! Members may bypass derivation with an explicit topic override, which is
//! only normalized to carry the `/topic/` prefix.

mod derive;
mod parse;

pub use derive::{derive_topics, normalize_override, DEFAULT_METRIC, TOPIC_NAMESPACE, TOPIC_PREFIX};
pub use parse::ParsedTopic;

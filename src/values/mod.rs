//! Decoded message values, latest per topic.

mod decode;
mod store;

pub use decode::{decode, Payload};
pub use store::{LatestValueStore, LatestValues};

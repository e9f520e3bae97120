//! # Live Telemetry
//!
//! A shared pub/sub connection manager for live telemetry views. Many
//! independent consumers multiplex onto one message-bus connection, each
//! keeping its own subscriptions in step with the parameters it declares.
//!
//! ## Core Concepts
//!
//! - **Topics**: derived from a group, its members and metrics, or taken from
//!   a member's explicit override
//! - **Broker**: owns the one shared connection; lazy connect, one connect in
//!   flight at a time, teardown when the last consumer leaves
//! - **Subscriptions**: per-consumer tables reconciled with minimal deltas
//! - **Values**: per-consumer latest decoded payload per topic
//!
//! ## Example
//!
//! ```ignore
//! use live_telemetry::{ConnectionBroker, FeedConfig, FeedParams, LiveFeed, MemoryTransport};
//!
//! let transport = MemoryTransport::new();
//! let broker = ConnectionBroker::new(transport.clone(), FeedConfig::default());
//!
//! let mut feed = LiveFeed::mount(&broker, FeedParams::new("rack-1", vec!["nodeA"]));
//! feed.sync().await;
//!
//! transport.publish("/topic/hydroleaf/v1/rack-1/nodeA/telemetry", r#"{"temp": 21.5}"#);
//! let latest = feed.latest_values();
//!
//! // Switch racks: rack-1 subscriptions go before rack-2 ones arrive.
//! feed.update(FeedParams::new("rack-2", vec!["nodeA"])).await;
//! ```

pub mod broker;
pub mod config;
pub mod error;
pub mod feed;
pub mod subscriptions;
pub mod topics;
pub mod transport;
pub mod types;
pub mod values;

// Re-exports
pub use broker::{BrokerLease, BrokerPhase, ConnectionBroker, ConnectionHandle};
pub use config::{FeedConfig, DEFAULT_ENDPOINT};
pub use error::{FeedError, Result};
pub use feed::{CancelToken, FeedProjection, LiveFeed, ReconcileOutcome, Reconciliation};
pub use subscriptions::{reconcile, ReconcileStats, SubscriptionTable};
pub use topics::{derive_topics, ParsedTopic, DEFAULT_METRIC, TOPIC_NAMESPACE, TOPIC_PREFIX};
pub use transport::{
    ConnectHeaders, Connection, InboundMessage, MemoryStats, MemoryTransport, MessageCallback,
    TopicSubscription, Transport,
};
pub use types::*;
pub use values::{decode, LatestValueStore, LatestValues, Payload};

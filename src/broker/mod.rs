//! Shared connection brokering.
//!
//! One [`ConnectionBroker`] owns the single connection that every feed in the
//! process multiplexes onto:
//! - the connection is opened lazily by the first [`ConnectionBroker::acquire`]
//! - overlapping acquisitions share one in-flight connect and its outcome
//! - mounted consumers hold a [`BrokerLease`]; dropping the last lease
//!   disconnects and returns the broker to [`BrokerPhase::Absent`]
//!
//! # Example
//!
//! ```ignore
//! let broker = ConnectionBroker::new(transport, FeedConfig::default());
//! let lease = broker.retain();
//! let handle = broker.acquire().await?;
//! // ... subscribe through `handle` ...
//! drop(lease); // last consumer gone: disconnects
//! ```

mod manager;
mod types;

pub use manager::ConnectionBroker;
pub use types::{BrokerLease, BrokerPhase, ConnectionHandle};

//! Transport capability consumed by the broker.
//!
//! The socket and the pub/sub protocol client live outside this crate. They
//! are reached through three traits:
//! - [`Transport`]: opens a connection to an endpoint, or reports that the
//!   host has no such capability
//! - [`Connection`]: connect / subscribe / disconnect plus a liveness flag
//! - [`TopicSubscription`]: a single subscription that can be cancelled
//!
//! [`MemoryTransport`] is an in-process loopback implementation.

mod memory;

pub use memory::{MemoryStats, MemoryTransport};

use crate::error::Result;
use crate::types::Topic;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Headers sent with the connect frame.
pub type ConnectHeaders = BTreeMap<String, String>;

/// A message delivered on a subscribed topic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    /// Raw message body.
    pub body: String,
}

/// Per-topic message callback handed to [`Connection::subscribe`].
pub type MessageCallback = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Factory for connections to the message bus.
pub trait Transport: Send + Sync {
    /// Open a socket + protocol client for `endpoint` without connecting.
    ///
    /// Fails with `CapabilityUnavailable` when the host environment does not
    /// provide the transport.
    fn open(&self, endpoint: &str) -> Result<Arc<dyn Connection>>;
}

/// One protocol client over one socket.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Perform the protocol handshake.
    async fn connect(&self, headers: &ConnectHeaders) -> Result<()>;

    /// Subscribe to `topic`; `callback` runs for every inbound message.
    fn subscribe(&self, topic: &Topic, callback: MessageCallback)
        -> Result<Box<dyn TopicSubscription>>;

    fn disconnect(&self);

    /// Liveness flag. False before connect, after disconnect, and after the
    /// transport dropped the link.
    fn is_connected(&self) -> bool;
}

/// Handle to one active subscription.
pub trait TopicSubscription: Send {
    fn unsubscribe(self: Box<Self>);
}

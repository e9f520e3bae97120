//! Broker handle and lifecycle types.

use crate::error::Result;
use crate::transport::{Connection, MessageCallback, TopicSubscription};
use crate::types::{ConnectionId, Topic};
use std::fmt;
use std::sync::Arc;

use super::ConnectionBroker;

/// Observable phase of the shared connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerPhase {
    /// No connection and no connect in flight.
    Absent,
    /// Exactly one connect attempt in flight.
    Connecting,
    /// A connection handle is held.
    Connected,
}

/// Cheap, cloneable handle to the shared connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    connection: Arc<dyn Connection>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: ConnectionId, connection: Arc<dyn Connection>) -> Self {
        Self { id, connection }
    }

    /// Identity of the physical connection behind this handle.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn subscribe(
        &self,
        topic: &Topic,
        callback: MessageCallback,
    ) -> Result<Box<dyn TopicSubscription>> {
        self.connection.subscribe(topic, callback)
    }

    pub(crate) fn disconnect(&self) {
        self.connection.disconnect();
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// One consumer's reference on a broker.
///
/// Created by [`ConnectionBroker::retain`]; dropping it releases the
/// reference exactly once.
#[must_use = "dropping the lease releases the broker reference"]
pub struct BrokerLease {
    broker: Arc<ConnectionBroker>,
}

impl BrokerLease {
    pub(crate) fn new(broker: Arc<ConnectionBroker>) -> Self {
        Self { broker }
    }

    pub fn broker(&self) -> &Arc<ConnectionBroker> {
        &self.broker
    }

    /// Release the reference now.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for BrokerLease {
    fn drop(&mut self) {
        self.broker.release();
    }
}

impl fmt::Debug for BrokerLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerLease").finish_non_exhaustive()
    }
}

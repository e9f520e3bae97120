//! In-process loopback transport.
//!
//! Every connection opened from one [`MemoryTransport`] shares a single bus:
//! [`MemoryTransport::publish`] delivers to all live subscriptions on a topic.
//! Clones share the bus, so a test can keep one clone for publishing and
//! inspection while the broker owns another.

use super::{
    ConnectHeaders, Connection, InboundMessage, MessageCallback, TopicSubscription, Transport,
};
use crate::error::{FeedError, Result};
use crate::types::Topic;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// Operation counters for a memory transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Connections opened.
    pub opens: usize,
    /// Connect handshakes started.
    pub connect_attempts: usize,
    pub subscribes: usize,
    pub unsubscribes: usize,
    pub disconnects: usize,
}

struct Subscriber {
    id: u64,
    connection: u64,
    callback: MessageCallback,
}

#[derive(Default)]
struct BusState {
    subscribers: HashMap<String, Vec<Subscriber>>,
    connections: HashMap<u64, Arc<AtomicBool>>,
    stats: MemoryStats,
    last_headers: Option<ConnectHeaders>,
    pending_failures: VecDeque<String>,
    gate: Option<watch::Sender<bool>>,
}

struct Bus {
    state: Mutex<BusState>,
    available: AtomicBool,
    next_id: AtomicU64,
}

impl Bus {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn remove_connection_subscribers(state: &mut BusState, connection: u64) {
        for subs in state.subscribers.values_mut() {
            subs.retain(|s| s.connection != connection);
        }
        state.subscribers.retain(|_, subs| !subs.is_empty());
    }
}

/// Loopback [`Transport`] backed by an in-process bus.
#[derive(Clone)]
pub struct MemoryTransport {
    bus: Arc<Bus>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            bus: Arc::new(Bus {
                state: Mutex::new(BusState::default()),
                available: AtomicBool::new(true),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Toggle whether the host "provides" this transport.
    pub fn set_available(&self, available: bool) {
        self.bus.available.store(available, Ordering::SeqCst);
    }

    /// Make the next connect handshake fail with `reason`.
    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.bus
            .state
            .lock()
            .pending_failures
            .push_back(reason.into());
    }

    /// Hold every connect handshake pending until [`release_connects`] runs.
    ///
    /// [`release_connects`]: MemoryTransport::release_connects
    pub fn hold_connects(&self) {
        let mut state = self.bus.state.lock();
        if state.gate.is_none() {
            let (tx, _rx) = watch::channel(false);
            state.gate = Some(tx);
        }
    }

    /// Let held and future connect handshakes proceed.
    pub fn release_connects(&self) {
        if let Some(gate) = self.bus.state.lock().gate.take() {
            gate.send_replace(true);
        }
    }

    /// Deliver `body` to every live subscription on `topic`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, topic: &str, body: impl Into<String>) -> usize {
        let body = body.into();
        let callbacks: Vec<MessageCallback> = {
            let state = self.bus.state.lock();
            state
                .subscribers
                .get(topic)
                .map(|subs| subs.iter().map(|s| Arc::clone(&s.callback)).collect())
                .unwrap_or_default()
        };

        trace!(topic, receivers = callbacks.len(), "Publishing");
        for callback in &callbacks {
            callback(InboundMessage {
                topic: Topic::new(topic),
                body: body.clone(),
            });
        }
        callbacks.len()
    }

    /// Simulate the bus dropping every connection (no disconnect call).
    pub fn drop_connections(&self) {
        let mut state = self.bus.state.lock();
        let ids: Vec<u64> = state.connections.keys().copied().collect();
        for id in ids {
            if let Some(flag) = state.connections.remove(&id) {
                flag.store(false, Ordering::SeqCst);
            }
            Bus::remove_connection_subscribers(&mut state, id);
        }
    }

    /// Live subscriptions on `topic` across all connections.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.bus
            .state
            .lock()
            .subscribers
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Topics with at least one live subscription, sorted.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.bus.state.lock().subscribers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn stats(&self) -> MemoryStats {
        self.bus.state.lock().stats.clone()
    }

    /// Headers of the most recent connect handshake.
    pub fn last_headers(&self) -> Option<ConnectHeaders> {
        self.bus.state.lock().last_headers.clone()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, endpoint: &str) -> Result<Arc<dyn Connection>> {
        if !self.bus.available.load(Ordering::SeqCst) {
            return Err(FeedError::CapabilityUnavailable(
                "memory transport disabled".to_string(),
            ));
        }

        let id = self.bus.next_id();
        self.bus.state.lock().stats.opens += 1;
        trace!(endpoint, connection = id, "Opened memory connection");

        Ok(Arc::new(MemoryConnection {
            id,
            bus: Arc::clone(&self.bus),
            connected: Arc::new(AtomicBool::new(false)),
        }))
    }
}

struct MemoryConnection {
    id: u64,
    bus: Arc<Bus>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn connect(&self, headers: &ConnectHeaders) -> Result<()> {
        let gate = {
            let mut state = self.bus.state.lock();
            state.stats.connect_attempts += 1;
            state.last_headers = Some(headers.clone());
            state.gate.as_ref().map(watch::Sender::subscribe)
        };

        if let Some(mut gate) = gate {
            while !*gate.borrow_and_update() {
                if gate.changed().await.is_err() {
                    break;
                }
            }
        }

        let mut state = self.bus.state.lock();
        if let Some(reason) = state.pending_failures.pop_front() {
            return Err(FeedError::ConnectFailure(reason));
        }
        self.connected.store(true, Ordering::SeqCst);
        state
            .connections
            .insert(self.id, Arc::clone(&self.connected));
        Ok(())
    }

    fn subscribe(
        &self,
        topic: &Topic,
        callback: MessageCallback,
    ) -> Result<Box<dyn TopicSubscription>> {
        if !self.is_connected() {
            return Err(FeedError::Subscribe {
                topic: topic.to_string(),
                reason: "connection is not live".to_string(),
            });
        }

        let id = self.bus.next_id();
        let mut state = self.bus.state.lock();
        state.stats.subscribes += 1;
        state
            .subscribers
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber {
                id,
                connection: self.id,
                callback,
            });

        Ok(Box::new(MemorySubscription {
            id,
            topic: topic.to_string(),
            bus: Arc::clone(&self.bus),
        }))
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let mut state = self.bus.state.lock();
        state.stats.disconnects += 1;
        state.connections.remove(&self.id);
        Bus::remove_connection_subscribers(&mut state, self.id);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

struct MemorySubscription {
    id: u64,
    topic: String,
    bus: Arc<Bus>,
}

impl TopicSubscription for MemorySubscription {
    fn unsubscribe(self: Box<Self>) {
        let mut state = self.bus.state.lock();
        state.stats.unsubscribes += 1;
        if let Some(subs) = state.subscribers.get_mut(&self.topic) {
            subs.retain(|s| s.id != self.id);
            if subs.is_empty() {
                state.subscribers.remove(&self.topic);
            }
        }
    }
}

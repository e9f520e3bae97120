//! Reference-counted owner of the shared connection.

use crate::config::FeedConfig;
use crate::error::{FeedError, Result};
use crate::transport::Transport;
use crate::types::ConnectionId;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{BrokerLease, BrokerPhase, ConnectionHandle};

/// The in-flight connect every concurrent acquirer awaits.
type PendingConnect = Shared<BoxFuture<'static, Result<ConnectionHandle>>>;

enum Phase {
    Absent,
    Connecting(PendingConnect),
    Connected(ConnectionHandle),
}

/// Internal broker state, guarded by one lock.
struct BrokerState {
    phase: Phase,
    /// Mounted consumers.
    references: usize,
    /// Bumped on every teardown; a connect started under an older generation
    /// is discarded when it completes.
    generation: u64,
    /// Counter for generating connection IDs.
    next_connection: u64,
}

/// Owns the one connection all feeds share.
pub struct ConnectionBroker {
    transport: Arc<dyn Transport>,
    config: FeedConfig,
    state: Arc<Mutex<BrokerState>>,
}

impl ConnectionBroker {
    /// Create a broker over `transport`. Nothing connects until the first
    /// [`acquire`](Self::acquire).
    pub fn new(transport: impl Transport + 'static, config: FeedConfig) -> Arc<Self> {
        Self::from_shared(Arc::new(transport), config)
    }

    /// Create a broker over an already shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>, config: FeedConfig) -> Arc<Self> {
        Arc::new(Self {
            transport,
            config,
            state: Arc::new(Mutex::new(BrokerState {
                phase: Phase::Absent,
                references: 0,
                generation: 0,
                next_connection: 0,
            })),
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Take a consumer reference. Pair every mount with exactly one lease.
    pub fn retain(self: &Arc<Self>) -> BrokerLease {
        let mut state = self.state.lock();
        state.references += 1;
        debug!(references = state.references, "Broker retained");
        BrokerLease::new(Arc::clone(self))
    }

    /// Get the shared connection, connecting if needed.
    ///
    /// A live connection is returned as-is. While a connect is in flight every
    /// caller awaits that same attempt and sees the same outcome. Otherwise a
    /// new connection is opened and connected with the configured headers.
    /// Does not change the reference count.
    pub async fn acquire(&self) -> Result<ConnectionHandle> {
        let pending = {
            let mut state = self.state.lock();
            let in_flight = match &state.phase {
                Phase::Connected(handle) if handle.is_live() => return Ok(handle.clone()),
                Phase::Connecting(pending) => Some(pending.clone()),
                Phase::Connected(handle) => {
                    debug!(connection = %handle.id(), "Shared connection no longer live");
                    None
                }
                Phase::Absent => None,
            };
            match in_flight {
                Some(pending) => pending,
                None => self.start_connect(&mut state)?,
            }
        };

        pending.await
    }

    /// Open a new connection and park its connect in `Connecting`.
    fn start_connect(&self, state: &mut BrokerState) -> Result<PendingConnect> {
        let connection = match self.transport.open(&self.config.endpoint) {
            Ok(connection) => connection,
            Err(e) => {
                state.phase = Phase::Absent;
                warn!(endpoint = %self.config.endpoint, error = %e, "Cannot open transport");
                return Err(e);
            }
        };

        state.next_connection += 1;
        let id = ConnectionId(state.next_connection);
        let generation = state.generation;
        let headers = self.config.headers.clone();
        let endpoint = self.config.endpoint.clone();
        let shared_state = Arc::clone(&self.state);

        debug!(%endpoint, connection = %id, "Connecting");

        let pending = async move {
            let outcome = connection.connect(&headers).await;

            let mut state = shared_state.lock();
            if state.generation != generation {
                if outcome.is_ok() {
                    connection.disconnect();
                }
                debug!(connection = %id, "Connect finished after release, discarding");
                return Err(FeedError::ConnectionReleased);
            }

            match outcome {
                Ok(()) => {
                    let handle = ConnectionHandle::new(id, connection);
                    state.phase = Phase::Connected(handle.clone());
                    info!(%endpoint, connection = %id, "Connected");
                    Ok(handle)
                }
                Err(e) => {
                    state.phase = Phase::Absent;
                    warn!(%endpoint, connection = %id, error = %e, "Connect failed");
                    Err(e)
                }
            }
        }
        .boxed()
        .shared();

        state.phase = Phase::Connecting(pending.clone());
        Ok(pending)
    }

    /// Drop one consumer reference; the last one tears the connection down.
    ///
    /// Teardown disconnects a live connection and unconditionally forgets
    /// both the handle and any in-flight connect.
    pub(crate) fn release(&self) {
        let mut state = self.state.lock();
        state.references = state.references.saturating_sub(1);
        debug!(references = state.references, "Broker released");
        if state.references > 0 {
            return;
        }

        state.generation += 1;
        match std::mem::replace(&mut state.phase, Phase::Absent) {
            Phase::Connected(handle) => {
                if handle.is_live() {
                    handle.disconnect();
                }
                info!(connection = %handle.id(), "Disconnected shared connection");
            }
            Phase::Connecting(_) => debug!("Abandoned in-flight connect"),
            Phase::Absent => {}
        }
    }

    pub fn phase(&self) -> BrokerPhase {
        match self.state.lock().phase {
            Phase::Absent => BrokerPhase::Absent,
            Phase::Connecting(_) => BrokerPhase::Connecting,
            Phase::Connected(_) => BrokerPhase::Connected,
        }
    }

    /// Number of mounted consumers.
    pub fn reference_count(&self) -> usize {
        self.state.lock().references
    }
}

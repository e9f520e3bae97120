//! Live feed: one consumer's view onto the shared connection.
//!
//! A [`LiveFeed`] is mounted against a [`ConnectionBroker`], declares
//! [`FeedParams`], and keeps its own subscription table and latest-value map in
//! step with those params. Parameter changes produce a [`Reconciliation`] that
//! acquires the shared connection and applies the subscription delta; a newer
//! reconciliation supersedes any still pending one.

use crate::broker::{BrokerLease, ConnectionBroker};
use crate::error::FeedError;
use crate::subscriptions::{reconcile, ReconcileStats, SubscriptionTable};
use crate::transport::{InboundMessage, MessageCallback};
use crate::types::{FeedParams, Topic, TopicSet};
use crate::values::{LatestValueStore, LatestValues};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Cancellation flag for one reconciliation attempt.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a reconciliation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Subscriptions were brought in line with the topics.
    Applied(ReconcileStats),
    /// No topics: everything was unsubscribed and no connection was acquired.
    Cleared,
    /// A newer reconciliation or an unmount took over; nothing was applied.
    Superseded,
    /// The connection could not be acquired; the table was cleared.
    Failed(FeedError),
}

/// Serializable `{ latestValues, topics }` view of a feed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedProjection {
    pub latest_values: Arc<LatestValues>,
    pub topics: Vec<Topic>,
}

/// A pending reconciliation for one feed.
///
/// Owns everything it needs, so it can be awaited in place or spawned.
#[must_use = "a reconciliation does nothing until run"]
pub struct Reconciliation {
    token: CancelToken,
    broker: Arc<ConnectionBroker>,
    topics: TopicSet,
    table: Arc<Mutex<SubscriptionTable>>,
    values: LatestValueStore,
}

impl Reconciliation {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Acquire the shared connection and apply the subscription delta.
    ///
    /// The cancellation token is checked after the connection resolves and
    /// before any subscription side effect.
    pub async fn run(self) -> ReconcileOutcome {
        if self.token.is_cancelled() {
            return ReconcileOutcome::Superseded;
        }

        if self.topics.is_empty() {
            self.table.lock().unsubscribe_all();
            return ReconcileOutcome::Cleared;
        }

        let acquired = self.broker.acquire().await;

        let mut table = self.table.lock();
        if self.token.is_cancelled() {
            debug!("Reconciliation superseded before applying");
            return ReconcileOutcome::Superseded;
        }

        match acquired {
            Ok(handle) => {
                let values = &self.values;
                let stats = reconcile(&handle, &self.topics, &mut table, |topic| {
                    message_callback(values.clone(), topic.clone())
                });
                ReconcileOutcome::Applied(stats)
            }
            Err(e) => {
                let removed = table.unsubscribe_all();
                warn!(error = %e, removed, "Connection unavailable, subscriptions cleared");
                ReconcileOutcome::Failed(e)
            }
        }
    }
}

fn message_callback(values: LatestValueStore, topic: Topic) -> MessageCallback {
    Arc::new(move |message: InboundMessage| values.on_message(&topic, &message.body))
}

/// One consumer of the shared connection.
///
/// Mounting takes a broker reference; dropping the feed unsubscribes
/// everything and gives the reference back.
pub struct LiveFeed {
    params: FeedParams,
    topics: TopicSet,
    table: Arc<Mutex<SubscriptionTable>>,
    values: LatestValueStore,
    token: CancelToken,
    lease: BrokerLease,
}

impl LiveFeed {
    /// Mount a feed. Nothing is subscribed until [`sync`](Self::sync) or
    /// [`update`](Self::update) runs.
    pub fn mount(broker: &Arc<ConnectionBroker>, params: FeedParams) -> Self {
        let lease = broker.retain();
        let topics = params.topics();

        let mut table = SubscriptionTable::new();
        table.switch_group(params.group_id());

        debug!(topics = topics.len(), "Feed mounted");

        Self {
            params,
            topics,
            table: Arc::new(Mutex::new(table)),
            values: LatestValueStore::new(),
            token: CancelToken::new(),
            lease,
        }
    }

    /// Replace the params and recompute topics.
    ///
    /// Supersedes any pending reconciliation. A group change or an empty topic
    /// set unsubscribes everything right away; other changes are applied as a
    /// delta by the returned reconciliation.
    pub fn set_params(&mut self, params: FeedParams) -> Reconciliation {
        // A pending run checks its token under the table lock, so cancel it
        // before tearing the table down.
        self.token.cancel();
        self.topics = params.topics();
        self.params = params;

        {
            let mut table = self.table.lock();
            table.switch_group(self.params.group_id());
            if self.topics.is_empty() {
                table.unsubscribe_all();
            }
        }

        self.begin()
    }

    /// Start a reconciliation for the current params, superseding any
    /// pending one.
    pub fn begin(&mut self) -> Reconciliation {
        self.token.cancel();
        self.token = CancelToken::new();

        Reconciliation {
            token: self.token.clone(),
            broker: Arc::clone(self.lease.broker()),
            topics: self.topics.clone(),
            table: Arc::clone(&self.table),
            values: self.values.clone(),
        }
    }

    /// Reconcile subscriptions for the current params.
    pub async fn sync(&mut self) -> ReconcileOutcome {
        self.begin().run().await
    }

    /// Replace the params and reconcile.
    pub async fn update(&mut self, params: FeedParams) -> ReconcileOutcome {
        self.set_params(params).run().await
    }

    pub fn params(&self) -> &FeedParams {
        &self.params
    }

    /// Topics the current params resolve to.
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// Topics with an installed subscription, sorted.
    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.table.lock().topics().cloned().collect()
    }

    /// Current latest-value snapshot.
    pub fn latest_values(&self) -> Arc<LatestValues> {
        self.values.snapshot()
    }

    /// Receiver notified whenever a value changes.
    pub fn watch(&self) -> watch::Receiver<Arc<LatestValues>> {
        self.values.watch()
    }

    pub fn values(&self) -> &LatestValueStore {
        &self.values
    }

    pub fn projection(&self) -> FeedProjection {
        FeedProjection {
            latest_values: self.latest_values(),
            topics: self.topics.iter().cloned().collect(),
        }
    }

    /// Tear the feed down now. Same as dropping it.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        self.token.cancel();
        let removed = self.table.lock().unsubscribe_all();
        debug!(removed, "Feed unmounted");
        // `lease` drops after this, releasing the broker reference.
    }
}

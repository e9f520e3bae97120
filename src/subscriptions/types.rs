//! Subscription table and reconciliation results.

use crate::transport::TopicSubscription;
use crate::types::{ConnectionId, Topic};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Subscribe/unsubscribe calls made by one reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Subscriptions installed.
    pub added: usize,
    /// Subscriptions removed (including full teardowns).
    pub removed: usize,
    /// Subscribes the transport rejected.
    pub failed: usize,
}

impl ReconcileStats {
    /// True if nothing was subscribed, unsubscribed or attempted.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.failed == 0
    }
}

/// One consumer's active subscriptions, keyed by topic.
///
/// Remembers which connection the entries were installed on and which group
/// they belong to, so a reconnect or a group switch can clear stale entries.
#[derive(Default)]
pub struct SubscriptionTable {
    pub(crate) entries: BTreeMap<Topic, Box<dyn TopicSubscription>>,
    pub(crate) connection: Option<ConnectionId>,
    group: Option<String>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.entries.contains_key(topic)
    }

    /// Subscribed topics, sorted.
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.entries.keys()
    }

    /// Connection the current entries live on.
    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Record the group the next reconciliation targets.
    ///
    /// A different group than before unsubscribes everything, so no
    /// subscription from the old group survives the switch. Returns the number
    /// of subscriptions removed.
    pub fn switch_group(&mut self, group: Option<&str>) -> usize {
        if self.group.as_deref() == group {
            return 0;
        }
        let removed = self.unsubscribe_all();
        debug!(from = ?self.group, to = ?group, removed, "Group switched");
        self.group = group.map(str::to_string);
        removed
    }

    /// Unsubscribe every entry and clear the table.
    pub fn unsubscribe_all(&mut self) -> usize {
        let removed = self.entries.len();
        for (topic, subscription) in std::mem::take(&mut self.entries) {
            subscription.unsubscribe();
            debug!(%topic, "Unsubscribed");
        }
        self.connection = None;
        removed
    }
}

impl fmt::Debug for SubscriptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionTable")
            .field("topics", &self.entries.keys().collect::<Vec<_>>())
            .field("connection", &self.connection)
            .field("group", &self.group)
            .finish()
    }
}

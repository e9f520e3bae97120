//! Minimal-delta subscription reconciliation.

use super::types::{ReconcileStats, SubscriptionTable};
use crate::broker::ConnectionHandle;
use crate::transport::MessageCallback;
use crate::types::{Topic, TopicSet};
use tracing::{debug, warn};

/// Bring `table` in line with `desired` on `handle`.
///
/// `callback_for` builds the message callback for each newly subscribed
/// topic. Entries installed on a different connection, or an empty desired
/// set, clear the table before anything else. A subscribe the transport
/// rejects is logged, counted in [`ReconcileStats::failed`] and left out of
/// the table, so the next reconciliation retries it.
///
/// Calling this twice with the same desired set performs no operations the
/// second time.
pub fn reconcile<F>(
    handle: &ConnectionHandle,
    desired: &TopicSet,
    table: &mut SubscriptionTable,
    mut callback_for: F,
) -> ReconcileStats
where
    F: FnMut(&Topic) -> MessageCallback,
{
    let mut stats = ReconcileStats::default();

    let stale_connection = table.connection.is_some_and(|id| id != handle.id());
    if desired.is_empty() || stale_connection {
        stats.removed += table.unsubscribe_all();
    }

    let stale: Vec<Topic> = table
        .entries
        .keys()
        .filter(|topic| !desired.contains(topic.as_str()))
        .cloned()
        .collect();
    for topic in stale {
        if let Some(subscription) = table.entries.remove(&topic) {
            subscription.unsubscribe();
            stats.removed += 1;
            debug!(%topic, "Unsubscribed");
        }
    }

    for topic in desired {
        if table.entries.contains_key(topic) {
            continue;
        }
        match handle.subscribe(topic, callback_for(topic)) {
            Ok(subscription) => {
                table.entries.insert(topic.clone(), subscription);
                stats.added += 1;
                debug!(%topic, connection = %handle.id(), "Subscribed");
            }
            Err(e) => {
                stats.failed += 1;
                warn!(%topic, error = %e, "Subscribe rejected");
            }
        }
    }

    if !table.entries.is_empty() {
        table.connection = Some(handle.id());
    }

    if !stats.is_noop() {
        debug!(
            added = stats.added,
            removed = stats.removed,
            failed = stats.failed,
            "Reconciled subscriptions"
        );
    }
    stats
}

//! Per-consumer subscription reconciliation.
//!
//! Each consumer owns a [`SubscriptionTable`] mapping topics to live
//! subscriptions on the shared connection. [`reconcile`] moves that table to a
//! desired [`TopicSet`](crate::TopicSet) with the fewest subscribe and
//! unsubscribe calls:
//! - desired topics missing from the table are subscribed
//! - table topics no longer desired are unsubscribed
//! - an empty desired set, a group switch, or a new connection handle clears
//!   the whole table first
//!
//! # Example
//!
//! ```ignore
//! let mut table = SubscriptionTable::new();
//! let stats = reconcile(&handle, &topics, &mut table, |topic| callback_for(topic));
//! assert!(reconcile(&handle, &topics, &mut table, |topic| callback_for(topic)).is_noop());
//! ```

mod reconciler;
mod types;

pub use reconciler::reconcile;
pub use types::{ReconcileStats, SubscriptionTable};

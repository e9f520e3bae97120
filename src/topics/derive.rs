//! Deriving the topic set a consumer needs.

use crate::types::{FeedParams, Member, Topic, TopicSet};

/// Prefix every topic on the shared connection carries.
pub const TOPIC_PREFIX: &str = "/topic/";

/// Namespace of derived telemetry topics (under [`TOPIC_PREFIX`]).
pub const TOPIC_NAMESPACE: &str = "hydroleaf/v1";

/// Metric used for empty metric names and omitted metric lists.
pub const DEFAULT_METRIC: &str = "telemetry";

/// Compute the topics for a group, its members and the wanted metrics.
///
/// Returns the empty set exactly when the group is absent/empty or there are
/// no members. A member's explicit topic override is used as-is (normalized to
/// the `/topic/` prefix) and is never expanded per metric. Every other member
/// is expanded per metric, a missing id giving an empty segment. An empty
/// metric list means [`DEFAULT_METRIC`]. Pure and deterministic: the set
/// iterates in first-seen order.
pub fn derive_topics<S: AsRef<str>>(
    group: Option<&str>,
    members: &[Member],
    metrics: &[S],
) -> TopicSet {
    let mut topics = TopicSet::new();

    let group = match group {
        Some(g) if !g.is_empty() => g,
        _ => return topics,
    };

    for member in members {
        if let Some(topic) = member.topic_override() {
            topics.insert(normalize_override(topic));
            continue;
        }

        let member_id = member.member_id();
        if metrics.is_empty() {
            topics.insert(member_topic(group, member_id, DEFAULT_METRIC));
        }
        for metric in metrics {
            let metric = match metric.as_ref() {
                "" => DEFAULT_METRIC,
                m => m,
            };
            topics.insert(member_topic(group, member_id, metric));
        }
    }

    topics
}

fn member_topic(group: &str, member_id: &str, metric: &str) -> Topic {
    Topic::new(format!(
        "{TOPIC_PREFIX}{TOPIC_NAMESPACE}/{group}/{member_id}/{metric}"
    ))
}

/// Apply the `/topic/` prefix to an override unless it already has it.
pub fn normalize_override(topic: &str) -> Topic {
    if topic.starts_with(TOPIC_PREFIX) {
        Topic::new(topic)
    } else {
        Topic::new(format!("{TOPIC_PREFIX}{}", topic.trim_start_matches('/')))
    }
}

impl FeedParams {
    /// Topics these params resolve to.
    pub fn topics(&self) -> TopicSet {
        derive_topics(self.group_id(), &self.members, self.metrics.as_slice())
    }
}

//! Core types for the live telemetry feed.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use crate::topics::DEFAULT_METRIC;

/// Canonical key of a pub/sub channel on the shared connection.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Wrap an already-normalized topic string.
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Topic(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Deduplicated set of topics.
///
/// Iterates in first-seen order so derivation output is deterministic;
/// equality ignores order.
#[derive(Clone, Default)]
pub struct TopicSet {
    order: Vec<Topic>,
    seen: HashSet<Topic>,
}

impl TopicSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a topic. Returns false if it was already present.
    pub fn insert(&mut self, topic: Topic) -> bool {
        if self.seen.contains(&topic) {
            return false;
        }
        self.seen.insert(topic.clone());
        self.order.push(topic);
        true
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.seen.contains(topic)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Topic> {
        self.order.iter()
    }

    /// Topics as plain strings, in iteration order.
    pub fn to_strings(&self) -> Vec<String> {
        self.order.iter().map(|t| t.0.clone()).collect()
    }
}

impl PartialEq for TopicSet {
    fn eq(&self, other: &Self) -> bool {
        self.seen == other.seen
    }
}

impl Eq for TopicSet {}

impl fmt::Debug for TopicSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.order.iter()).finish()
    }
}

impl FromIterator<Topic> for TopicSet {
    fn from_iter<I: IntoIterator<Item = Topic>>(iter: I) -> Self {
        let mut set = TopicSet::new();
        for topic in iter {
            set.insert(topic);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TopicSet {
    type Item = &'a Topic;
    type IntoIter = std::slice::Iter<'a, Topic>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

/// An addressable entity within a group.
///
/// Deserializes from either a bare string (`"nodeA"`) or an object
/// (`{"id": "nodeA", "topic": "custom/feed"}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Member {
    /// Raw member identifier.
    Id(String),
    /// Structured reference with an optional explicit topic override.
    Reference {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },
}

impl Member {
    pub fn id(id: impl Into<String>) -> Self {
        Member::Id(id.into())
    }

    /// Reference carrying only an explicit topic.
    pub fn topic(topic: impl Into<String>) -> Self {
        Member::Reference {
            id: None,
            topic: Some(topic.into()),
        }
    }

    /// Non-empty topic override, if any.
    pub fn topic_override(&self) -> Option<&str> {
        match self {
            Member::Id(_) => None,
            Member::Reference { topic, .. } => topic.as_deref().filter(|t| !t.is_empty()),
        }
    }

    /// Member id used for derivation. A missing id is the empty segment.
    pub fn member_id(&self) -> &str {
        match self {
            Member::Id(id) => id,
            Member::Reference { id, .. } => id.as_deref().unwrap_or_default(),
        }
    }
}

impl From<&str> for Member {
    fn from(id: &str) -> Self {
        Member::Id(id.to_string())
    }
}

impl From<String> for Member {
    fn from(id: String) -> Self {
        Member::Id(id)
    }
}

fn default_metrics() -> Vec<String> {
    vec![DEFAULT_METRIC.to_string()]
}

/// Parameters a consumer declares: which group, which members, which metrics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedParams {
    /// Group identity (e.g. a rack id). Absent or empty means "nothing".
    #[serde(default, alias = "groupId")]
    pub group: Option<String>,

    #[serde(default)]
    pub members: Vec<Member>,

    /// Metric names. Default: `["telemetry"]`
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            group: None,
            members: Vec::new(),
            metrics: default_metrics(),
        }
    }
}

impl FeedParams {
    /// Params for a group with the default metric list.
    pub fn new<M: Into<Member>>(group: impl Into<String>, members: Vec<M>) -> Self {
        Self {
            group: Some(group.into()),
            members: members.into_iter().map(Into::into).collect(),
            metrics: default_metrics(),
        }
    }

    pub fn with_metrics<S: Into<String>>(mut self, metrics: Vec<S>) -> Self {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    /// Group identity with empty values treated as absent.
    pub fn group_id(&self) -> Option<&str> {
        self.group.as_deref().filter(|g| !g.is_empty())
    }
}

/// Identifier of one physical connection created by a broker.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

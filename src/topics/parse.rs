//! Splitting derived topics back into their parts.

use super::derive::{TOPIC_NAMESPACE, TOPIC_PREFIX};
use crate::types::Topic;

/// The `(group, member, metric)` a derived topic was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTopic {
    pub group: String,
    pub member: String,
    pub metric: String,
}

impl ParsedTopic {
    /// Parse `/topic/hydroleaf/v1/<group>/<member>/<metric>`.
    ///
    /// Returns `None` for topics outside the namespace or with blank segments.
    pub fn parse(topic: &str) -> Option<Self> {
        let rest = topic.trim().strip_prefix(TOPIC_PREFIX)?;
        let rest = rest.strip_prefix(TOPIC_NAMESPACE)?.strip_prefix('/')?;

        let mut parts = rest.splitn(3, '/');
        let group = parts.next()?;
        let member = parts.next()?;
        let metric = parts.next()?;

        if [group, member, metric]
            .iter()
            .any(|part| part.trim().is_empty() || part.contains('/'))
        {
            return None;
        }

        Some(Self {
            group: group.to_string(),
            member: member.to_string(),
            metric: metric.to_string(),
        })
    }
}

impl Topic {
    /// Parse this topic if it belongs to the derived namespace.
    pub fn parse(&self) -> Option<ParsedTopic> {
        ParsedTopic::parse(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::derive_topics;
    use crate::types::Member;

    #[test]
    fn test_parse_derived_topic() {
        let topics = derive_topics(Some("rack-1"), &[Member::id("nodeA")], &["temp"]);
        let parsed = topics.iter().next().unwrap().parse().unwrap();

        assert_eq!(
            parsed,
            ParsedTopic {
                group: "rack-1".to_string(),
                member: "nodeA".to_string(),
                metric: "temp".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_rejects_foreign_topics() {
        assert!(ParsedTopic::parse("/topic/custom/feed").is_none());
        assert!(ParsedTopic::parse("hydroleaf/v1/rack/node/temp").is_none());
        assert!(ParsedTopic::parse("/topic/hydroleaf/v1/rack/node").is_none());
        assert!(ParsedTopic::parse("/topic/hydroleaf/v1/rack/ /temp").is_none());
        assert!(ParsedTopic::parse("/topic/hydroleaf/v1/rack/node/temp/extra").is_none());
    }
}

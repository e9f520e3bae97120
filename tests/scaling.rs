//! Many consumers and large topic sets over one shared connection.

use live_telemetry::{
    BrokerPhase, ConnectionBroker, FeedConfig, FeedParams, LiveFeed, MemoryTransport,
    ReconcileOutcome, ReconcileStats,
};
use std::sync::Arc;

fn setup() -> (MemoryTransport, Arc<ConnectionBroker>) {
    let transport = MemoryTransport::new();
    let broker = ConnectionBroker::new(transport.clone(), FeedConfig::default());
    (transport, broker)
}

fn nodes(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("node{i}")).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_feeds_share_one_connection() {
    let (transport, broker) = setup();

    let mut tasks = Vec::new();
    for i in 0..50 {
        let broker = Arc::clone(&broker);
        tasks.push(tokio::spawn(async move {
            let params = FeedParams::new("rack-1", vec![format!("node{i}")]);
            let mut feed = LiveFeed::mount(&broker, params);
            let outcome = feed.sync().await;
            (feed, outcome)
        }));
    }

    let mut feeds = Vec::new();
    for task in tasks {
        let (feed, outcome) = task.await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Applied(_)));
        feeds.push(feed);
    }

    let stats = transport.stats();
    assert_eq!(stats.opens, 1);
    assert_eq!(stats.connect_attempts, 1);
    assert_eq!(stats.subscribes, 50);
    assert_eq!(broker.reference_count(), 50);

    transport.publish("/topic/hydroleaf/v1/rack-1/node7/telemetry", r#"{"t": 1}"#);
    let with_values = feeds.iter().filter(|f| !f.latest_values().is_empty()).count();
    assert_eq!(with_values, 1);

    drop(feeds);
    assert_eq!(broker.phase(), BrokerPhase::Absent);
    assert_eq!(broker.reference_count(), 0);
    assert_eq!(transport.stats().disconnects, 1);
    assert!(transport.subscribed_topics().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_group_switch_races_pending_reconciliation() {
    let (transport, broker) = setup();
    let mut feed = LiveFeed::mount(&broker, FeedParams::new("rack-0", vec!["nodeA"]));
    feed.sync().await;

    for i in 1..=50 {
        let stale = tokio::spawn(feed.begin().run());
        let fresh = feed.set_params(FeedParams::new(format!("rack-{i}"), vec!["nodeA"]));
        stale.await.unwrap();

        // Nothing from the previous group survives the switch.
        let prefix = format!("/topic/hydroleaf/v1/rack-{i}/");
        assert!(feed
            .subscribed_topics()
            .iter()
            .all(|topic| topic.as_str().starts_with(&prefix)));
        assert!(matches!(fresh.run().await, ReconcileOutcome::Applied(_)));
    }

    assert_eq!(
        transport.subscribed_topics(),
        vec!["/topic/hydroleaf/v1/rack-50/nodeA/telemetry"]
    );
}

#[tokio::test]
async fn test_mount_unmount_churn() {
    let (transport, broker) = setup();

    for _ in 0..100 {
        let mut feed = LiveFeed::mount(&broker, FeedParams::new("rack-1", vec!["nodeA"]));
        feed.sync().await;
        feed.unmount();
    }

    let stats = transport.stats();
    assert_eq!(stats.connect_attempts, 100);
    assert_eq!(stats.disconnects, 100);
    assert_eq!(stats.subscribes, stats.unsubscribes);
    assert_eq!(broker.reference_count(), 0);
}

#[tokio::test]
async fn test_large_topic_set_delta() {
    let (transport, broker) = setup();
    let metrics = vec!["temp", "ph", "ec"];

    let mut feed = LiveFeed::mount(
        &broker,
        FeedParams::new("rack-1", nodes(200)).with_metrics(metrics.clone()),
    );
    let outcome = feed.sync().await;
    assert_eq!(
        outcome,
        ReconcileOutcome::Applied(ReconcileStats { added: 600, removed: 0, failed: 0 })
    );

    // Keep the first half of the nodes, add 10 new ones.
    let mut next = nodes(100);
    next.extend((200..210).map(|i| format!("node{i}")));
    let outcome = feed
        .update(FeedParams::new("rack-1", next).with_metrics(metrics))
        .await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Applied(ReconcileStats { added: 30, removed: 300, failed: 0 })
    );
    assert_eq!(transport.subscribed_topics().len(), 330);
}

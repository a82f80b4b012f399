//! Tests for the in-process stream hub

use super::*;
use crate::controller::SessionEvent;
use tokio::sync::mpsc;

fn sink(generation: u64) -> (RecordSink, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RecordSink::new(generation, tx), rx)
}

fn received(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Record { record, .. } = event {
            out.push(record.to_string());
        }
    }
    out
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_subscribe_registers_component() {
    let hub = StreamHub::new();
    let (sink, _rx) = sink(1);

    let handle = hub
        .subscribe(&SubscribeRequest::new("prometheus.scrape.default"), sink)
        .await
        .unwrap();

    assert!(handle.id() > 0);
    assert!(hub.has_subscribers("prometheus.scrape.default"));
    assert!(!hub.has_subscribers("other"));
    assert_eq!(hub.total_subscribers(), 1);
}

#[tokio::test]
async fn test_subscribe_unique_ids() {
    let hub = StreamHub::new();
    let (sink_a, _rx_a) = sink(1);
    let (sink_b, _rx_b) = sink(2);

    let a = hub.subscribe(&SubscribeRequest::new("c"), sink_a).await.unwrap();
    let b = hub.subscribe(&SubscribeRequest::new("c"), sink_b).await.unwrap();

    assert_ne!(a, b);
    assert_eq!(hub.subscriber_count("c"), 2);
}

#[tokio::test]
async fn test_unsubscribe_removes() {
    let hub = StreamHub::new();
    let (sink, _rx) = sink(1);
    let handle = hub.subscribe(&SubscribeRequest::new("c"), sink).await.unwrap();

    hub.unsubscribe(handle).await.unwrap();

    assert_eq!(hub.subscriber_count("c"), 0);
    assert_eq!(hub.total_subscribers(), 0);
}

#[tokio::test]
async fn test_unsubscribe_not_found() {
    let hub = StreamHub::new();
    let result = hub.unsubscribe(SubscriptionHandle::new(999)).await;

    assert!(matches!(
        result,
        Err(SessionError::SubscriptionNotFound { id: 999 })
    ));
}

#[tokio::test]
async fn test_max_subscriptions() {
    let hub = StreamHub::new();
    let mut receivers = Vec::new();

    for i in 0..MAX_SUBSCRIPTIONS {
        let (sink, rx) = sink(i as u64);
        receivers.push(rx);
        hub.subscribe(&SubscribeRequest::new("c"), sink).await.unwrap();
    }

    let (sink, _rx) = sink(0);
    let result = hub.subscribe(&SubscribeRequest::new("c"), sink).await;
    assert!(matches!(result, Err(SessionError::MaxSubscriptions { .. })));
}

// ============================================================================
// Publish
// ============================================================================

#[tokio::test]
async fn test_publish_to_matching_component() {
    let hub = StreamHub::new();
    let (sink, mut rx) = sink(7);
    hub.subscribe(&SubscribeRequest::new("loki.write"), sink)
        .await
        .unwrap();

    assert_eq!(hub.publish("loki.write", "line 1"), 1);
    assert_eq!(hub.publish("loki.write", "line 2"), 1);
    assert_eq!(hub.publish("otelcol.receiver", "elsewhere"), 0);

    assert_eq!(received(&mut rx), vec!["line 1", "line 2"]);
}

#[tokio::test]
async fn test_publish_carries_generation() {
    let hub = StreamHub::new();
    let (sink, mut rx) = sink(42);
    hub.subscribe(&SubscribeRequest::new("c"), sink).await.unwrap();

    hub.publish("c", "x");

    match rx.try_recv() {
        Ok(SessionEvent::Record { generation, .. }) => assert_eq!(generation, 42),
        other => panic!("expected record event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_publish_fans_out() {
    let hub = StreamHub::new();
    let (sink_a, mut rx_a) = sink(1);
    let (sink_b, mut rx_b) = sink(2);
    hub.subscribe(&SubscribeRequest::new("c"), sink_a).await.unwrap();
    hub.subscribe(&SubscribeRequest::new("c"), sink_b).await.unwrap();

    assert_eq!(hub.publish("c", "both"), 2);
    assert_eq!(received(&mut rx_a), vec!["both"]);
    assert_eq!(received(&mut rx_b), vec!["both"]);
}

#[tokio::test]
async fn test_publish_sample_rate_zero_drops_all() {
    let hub = StreamHub::new();
    let (sink, mut rx) = sink(1);
    hub.subscribe(&SubscribeRequest::new("c").with_sample_rate(0.0), sink)
        .await
        .unwrap();

    for _ in 0..50 {
        hub.publish("c", "dropped");
    }
    assert!(received(&mut rx).is_empty());
}

#[tokio::test]
async fn test_publish_partial_sampling() {
    let hub = StreamHub::new();
    let (sink, mut rx) = sink(1);
    hub.subscribe(&SubscribeRequest::new("c").with_sample_rate(0.5), sink)
        .await
        .unwrap();

    for _ in 0..2000 {
        hub.publish("c", "maybe");
    }

    let count = received(&mut rx).len();
    // Loose bounds, 2000 draws at p=0.5
    assert!(count > 700 && count < 1300, "got {count}");
}

#[tokio::test]
async fn test_publish_prunes_closed_sinks() {
    let hub = StreamHub::new();
    let (sink, rx) = sink(1);
    hub.subscribe(&SubscribeRequest::new("c"), sink).await.unwrap();

    drop(rx);
    assert_eq!(hub.publish("c", "nobody home"), 0);
    assert_eq!(hub.subscriber_count("c"), 0);
}

#[tokio::test]
async fn test_unsubscribed_receives_nothing() {
    let hub = StreamHub::new();
    let (sink, mut rx) = sink(1);
    let handle = hub.subscribe(&SubscribeRequest::new("c"), sink).await.unwrap();

    hub.unsubscribe(handle).await.unwrap();
    hub.publish("c", "late");

    assert!(received(&mut rx).is_empty());
}

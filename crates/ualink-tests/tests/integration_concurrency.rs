// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Concurrency Integration Tests
//!
//! Several operations share one client and one channel. Time is paused.
//!
//! - `test_shared_*`: subscription routing alongside a logging job
//! - `test_lifecycle_*`: close while requests are in flight

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ualink_client::client::{ChannelCallback, ChannelSink};
use ualink_client::{
    ConnectionStatus, DataLoggingRequest, DataValue, SubscriptionRequest, Variant,
};
use ualink_tests::prelude::*;

const INTERVAL: Duration = Duration::from_millis(100);
const WAIT: Duration = Duration::from_secs(2);

// =============================================================================
// Shared Channel
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_shared_subscription_and_logging_do_not_interfere() {
    init_test_logging();
    let fixture = ClientFixture::connected().await;
    let server = fixture.server();

    let (callback, mut notifications) = ChannelCallback::with_channel(16);
    let handle = fixture
        .client
        .subscribe(SubscriptionRequest::new(
            vec![NodeFixtures::temperature()],
            Arc::new(callback),
        ))
        .await
        .expect("valid request")
        .assert_completed();
    let subscription_id = handle.id().value();

    let (sink, mut batches) = ChannelSink::with_channel(16);
    let token = CancellationToken::new();
    let request = DataLoggingRequest::new(vec![NodeFixtures::pressure()], INTERVAL, Arc::new(sink))
        .with_token(token.clone());
    let client = fixture.client.clone();
    let logging = tokio::spawn(async move { client.start_logging(request).await });

    let first = batches.recv().await.expect("batch");
    assert_eq!(first.values.len(), 1);
    assert_eq!(first.values[0].value, Some(Variant::Int32(101_325)));

    server.publish_data_change(subscription_id, &[(1, DataValue::good(99.0f64))]);
    server.publish_data_change(subscription_id + 100, &[(1, DataValue::good(-1.0f64))]);

    let delivered = assert_completes_within(WAIT, notifications.recv())
        .await
        .expect("notification");
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].subscription_id, handle.id());
    assert_eq!(delivered[0].node_id, Some(NodeFixtures::temperature()));
    assert_eq!(delivered[0].value.value, Some(Variant::Double(99.0)));

    for _ in 0..2 {
        let batch = batches.recv().await.expect("batch");
        assert_eq!(batch.values.len(), 1);
        assert_eq!(batch.values[0].value, Some(Variant::Int32(101_325)));
    }
    assert_no_message(&mut notifications, INTERVAL * 3).await;

    server.publish_data_change(subscription_id, &[(1, DataValue::good(100.0f64))]);
    let second = assert_completes_within(WAIT, notifications.recv())
        .await
        .expect("notification");
    assert_eq!(second[0].value.value, Some(Variant::Double(100.0)));

    token.cancel();
    let report = logging
        .await
        .expect("task")
        .expect("connected")
        .assert_completed();
    assert!(report.batches_delivered >= 3);
    assert_eq!(report.failed_reads, 0);

    handle.unsubscribe().await.assert_completed();
    assert_eq!(server.subscription_count(), 0);
    assert_eq!(fixture.client.stats().notifications_delivered(), 2);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_lifecycle_close_during_logging_read() {
    let fixture = ClientFixture::connected().await;
    fixture.server().set_read_latency(Duration::from_millis(50));

    let (sink, mut batches) = ChannelSink::with_channel(16);
    let token = CancellationToken::new();
    let request = DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, Arc::new(sink))
        .with_token(token.clone());
    let client = fixture.client.clone();
    let logging = tokio::spawn(async move { client.start_logging(request).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    fixture.client.close().await.assert_completed();
    assert_eq!(fixture.client.status(), ConnectionStatus::Disconnected);

    let in_flight = batches.recv().await.expect("batch");
    assert_eq!(in_flight.sequence, 1);

    tokio::time::sleep(INTERVAL * 4).await;
    assert!(!logging.is_finished());

    token.cancel();
    let report = logging
        .await
        .expect("task")
        .expect("connected")
        .assert_completed();

    assert_eq!(report.batches_delivered, 1);
    assert!(report.failed_reads >= 2, "report {report:?}");
    assert_eq!(report.iterations, report.batches_delivered + report.failed_reads);
    assert!(fixture.client.stats().transport_failures() >= report.failed_reads);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_close_during_read_values() {
    let fixture = ClientFixture::connected().await;
    fixture.server().set_read_latency(Duration::from_millis(50));

    let client = fixture.client.clone();
    let read = tokio::spawn(async move { client.read_values(&[NodeFixtures::temperature()]).await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    fixture.client.close().await.assert_completed();

    let values = read
        .await
        .expect("task")
        .expect("connected when issued")
        .assert_completed();
    assert_eq!(values, vec![Some(Variant::Double(21.5))]);

    assert_not_connected(fixture.client.read_values(&[NodeFixtures::temperature()]).await);
    assert_eq!(fixture.server().read_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_lifecycle_reopen_while_logging() {
    let fixture = ClientFixture::connected().await;
    let (sink, mut batches) = ChannelSink::with_channel(16);
    let token = CancellationToken::new();
    let request = DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, Arc::new(sink))
        .with_token(token.clone());
    let client = fixture.client.clone();
    let logging = tokio::spawn(async move { client.start_logging(request).await });

    batches.recv().await.expect("batch");
    fixture.client.close().await.assert_completed();
    fixture.client.open().await.assert_completed();
    assert!(fixture.client.is_connected());

    let values = fixture
        .client
        .read_values(&[NodeFixtures::temperature()])
        .await
        .expect("connected")
        .assert_completed();
    assert_eq!(values, vec![Some(Variant::Double(21.5))]);

    tokio::time::sleep(INTERVAL * 3).await;
    token.cancel();
    let report = logging
        .await
        .expect("task")
        .expect("connected")
        .assert_completed();

    assert!(report.failed_reads >= 1);
    assert!(fixture.client.is_connected());
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Data Logging Integration Tests
//!
//! Time is paused in these tests; sleeps advance the clock instantly once
//! every task is idle.
//!
//! - `test_logging_*`: polling loop behavior
//! - `test_logging_reject_*`: request and registration failures

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ualink_client::client::{ChannelSink, FnSink, LogSink};
use ualink_client::{
    ConfigurationError, DataLoggingRequest, LoggingReport, NodeId, OpcClient, Outcome, StatusCode,
    UaError, UaResult, Variant,
};
use ualink_tests::prelude::*;

const INTERVAL: Duration = Duration::from_millis(100);

fn spawn_logging(
    client: &OpcClient,
    nodes: Vec<NodeId>,
    sink: Arc<dyn LogSink>,
) -> (CancellationToken, JoinHandle<UaResult<Outcome<LoggingReport>>>) {
    let token = CancellationToken::new();
    let request = DataLoggingRequest::new(nodes, INTERVAL, sink).with_token(token.clone());
    let client = client.clone();
    let join = tokio::spawn(async move { client.start_logging(request).await });
    (token, join)
}

fn counting_sink() -> (Arc<dyn LogSink>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let sink = FnSink::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (Arc::new(sink), count)
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_logging_delivers_batches_until_cancelled() {
    init_test_logging();
    let fixture = ClientFixture::connected().await;
    let server = fixture.server();
    let (sink, mut batches) = ChannelSink::with_channel(16);

    let (token, join) = spawn_logging(
        &fixture.client,
        vec![NodeFixtures::temperature(), NodeFixtures::pressure()],
        Arc::new(sink),
    );

    for expected in 1..=3u64 {
        let batch = batches.recv().await.expect("batch");
        assert_eq!(batch.sequence, expected);
        assert_eq!(batch.values.len(), 2);
        assert_eq!(batch.values[0].value, Some(Variant::Double(21.5)));
    }

    token.cancel();
    let report = join
        .await
        .expect("task")
        .expect("connected")
        .assert_completed();

    assert!(report.batches_delivered >= 3);
    assert!(report.iterations >= report.batches_delivered);
    assert_eq!(report.failed_reads, 0);
    assert_eq!(server.register_count(), 1);
    assert_eq!(server.unregister_count(), 1);

    let reads = server.read_count();
    tokio::time::sleep(INTERVAL * 10).await;
    assert_eq!(server.read_count(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_logging_waits_interval_between_reads() {
    let fixture = ClientFixture::connected().await;
    let (sink, mut batches) = ChannelSink::with_channel(16);
    let (token, join) = spawn_logging(&fixture.client, vec![NodeFixtures::temperature()], Arc::new(sink));

    let first = batches.recv().await.expect("batch");
    let started = tokio::time::Instant::now();
    let second = batches.recv().await.expect("batch");

    let waited = started.elapsed();
    assert!(waited >= INTERVAL && waited < INTERVAL * 2, "waited {waited:?}");
    assert!(second.timestamp >= first.timestamp);

    token.cancel();
    join.await.expect("task").expect("connected").assert_completed();
}

#[tokio::test(start_paused = true)]
async fn test_logging_no_delivery_after_cancel_during_read() {
    let fixture = ClientFixture::connected().await;
    fixture.server().set_read_latency(Duration::from_millis(50));
    let (sink, delivered) = counting_sink();

    let (token, join) = spawn_logging(&fixture.client, vec![NodeFixtures::temperature()], sink);

    tokio::time::sleep(Duration::from_millis(10)).await;
    token.cancel();

    let report = join.await.expect("task").expect("connected").assert_completed();
    assert_eq!(report.iterations, 1);
    assert_eq!(report.batches_delivered, 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_logging_delivers_raw_values() {
    let fixture = ClientFixture::connected().await;
    fixture
        .server()
        .set_status(NodeFixtures::pressure(), StatusCode::BAD_NOT_READABLE);
    let (sink, mut batches) = ChannelSink::with_channel(4);

    let (token, join) = spawn_logging(
        &fixture.client,
        vec![NodeFixtures::temperature(), NodeFixtures::pressure()],
        Arc::new(sink),
    );

    let batch = batches.recv().await.expect("batch");
    token.cancel();
    join.await.expect("task").expect("connected").assert_completed();

    assert!(batch.values[0].status.is_good());
    assert_eq!(batch.values[1].status, StatusCode::BAD_NOT_READABLE);
    assert_eq!(batch.values[1].value, None);
}

#[tokio::test(start_paused = true)]
async fn test_logging_read_failures_continue() {
    let fixture = ClientFixture::connected().await;
    fixture.server().fail_next_reads(2);
    let (sink, mut batches) = ChannelSink::with_channel(4);

    let (token, join) = spawn_logging(&fixture.client, vec![NodeFixtures::temperature()], Arc::new(sink));

    let batch = batches.recv().await.expect("batch");
    assert_eq!(batch.sequence, 3);

    token.cancel();
    let report = join.await.expect("task").expect("connected").assert_completed();
    assert_eq!(report.failed_reads, 2);
    assert!(report.batches_delivered >= 1);
    assert!(fixture.client.stats().transport_failures() >= 2);
}

#[tokio::test(start_paused = true)]
async fn test_logging_cancelled_before_start() {
    let fixture = ClientFixture::connected().await;
    let (sink, delivered) = counting_sink();
    let token = CancellationToken::new();
    token.cancel();

    let request = DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, sink)
        .with_token(token);
    let report = fixture
        .client
        .start_logging(request)
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(report, LoggingReport::default());
    assert_eq!(fixture.server().read_count(), 0);
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_logging_counts_iterations_in_stats() {
    let fixture = ClientFixture::connected().await;
    let (sink, mut batches) = ChannelSink::with_channel(8);
    let (token, join) = spawn_logging(&fixture.client, vec![NodeFixtures::temperature()], Arc::new(sink));

    batches.recv().await.expect("batch");
    batches.recv().await.expect("batch");
    token.cancel();
    let report = join.await.expect("task").expect("connected").assert_completed();

    assert_eq!(fixture.client.stats().logging_iterations(), report.iterations);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn test_logging_reject_empty_node_set() {
    let fixture = ClientFixture::connected().await;
    let (sink, _) = counting_sink();

    let error = assert_configuration_error(
        fixture
            .client
            .start_logging(DataLoggingRequest::new(Vec::new(), INTERVAL, sink))
            .await,
    );

    assert!(matches!(
        error,
        UaError::Configuration(ConfigurationError::NoRegisteredNodes { requested: 0 })
    ));
    assert_eq!(fixture.server().register_count(), 0);
    assert_eq!(fixture.server().read_count(), 0);
}

#[tokio::test]
async fn test_logging_reject_disconnected() {
    let fixture = ClientFixture::new();
    let (sink, _) = counting_sink();

    assert_not_connected(
        fixture
            .client
            .start_logging(DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, sink))
            .await,
    );
    assert_eq!(fixture.server().register_count(), 0);
}

#[tokio::test]
async fn test_logging_reject_zero_interval() {
    let fixture = ClientFixture::connected().await;
    let (sink, _) = counting_sink();

    assert_configuration_error(
        fixture
            .client
            .start_logging(DataLoggingRequest::new(
                vec![NodeFixtures::temperature()],
                Duration::ZERO,
                sink,
            ))
            .await,
    );
}

#[tokio::test]
async fn test_logging_reject_nothing_registered() {
    let fixture = ClientFixture::connected().await;
    fixture.server().register_nothing(true);
    let (sink, _) = counting_sink();

    let error = assert_configuration_error(
        fixture
            .client
            .start_logging(DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, sink))
            .await,
    );

    assert!(matches!(
        error,
        UaError::Configuration(ConfigurationError::NoRegisteredNodes { requested: 1 })
    ));
    assert_eq!(fixture.server().read_count(), 0);
}

#[tokio::test]
async fn test_logging_reject_registration_failure() {
    let fixture = ClientFixture::connected().await;
    fixture.server().fail_register(true);
    let (sink, _) = counting_sink();

    let error = fixture
        .client
        .start_logging(DataLoggingRequest::new(vec![NodeFixtures::temperature()], INTERVAL, sink))
        .await
        .expect("connected")
        .assert_failed();

    assert!(error.is_transport());
    assert_eq!(fixture.server().read_count(), 0);
}

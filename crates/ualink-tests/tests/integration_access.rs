// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Read/Write Integration Tests
//!
//! - `test_read_*`: batch reads
//! - `test_write_*`: batch writes

use ualink_client::{StatusCode, TransportError, UaError, Variant};
use ualink_tests::prelude::*;

// =============================================================================
// Read
// =============================================================================

#[tokio::test]
async fn test_read_disconnected_issues_no_call() {
    init_test_logging();
    let fixture = ClientFixture::new();

    assert_not_connected(fixture.client.read_values(&[NodeFixtures::temperature()]).await);
    assert_eq!(fixture.server().read_count(), 0);
}

#[tokio::test]
async fn test_read_disconnected_with_empty_input() {
    let fixture = ClientFixture::new();
    assert_not_connected(fixture.client.read_values(&[]).await);
}

#[tokio::test]
async fn test_read_returns_values_in_input_order() {
    let fixture = ClientFixture::connected().await;
    let nodes = vec![
        NodeFixtures::running(),
        NodeFixtures::temperature(),
        NodeFixtures::pressure(),
    ];

    let values = fixture
        .client
        .read_values(&nodes)
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(
        values,
        vec![
            Some(Variant::Boolean(true)),
            Some(Variant::Double(21.5)),
            Some(Variant::Int32(101_325)),
        ]
    );
    assert_eq!(fixture.server().read_count(), 1);
}

#[tokio::test]
async fn test_read_bad_items_yield_none() {
    let fixture = ClientFixture::connected().await;
    fixture
        .server()
        .set_status(NodeFixtures::pressure(), StatusCode::BAD_NOT_READABLE);

    let values = fixture
        .client
        .read_values(&[
            NodeFixtures::temperature(),
            NodeFixtures::pressure(),
            NodeFixtures::missing(),
        ])
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0], Some(Variant::Double(21.5)));
    assert_eq!(values[1], None);
    assert_eq!(values[2], None);
}

#[tokio::test]
async fn test_read_uncertain_status_yields_none() {
    let fixture = ClientFixture::connected().await;
    fixture
        .server()
        .set_status(NodeFixtures::temperature(), StatusCode::UNCERTAIN);

    let values = fixture
        .client
        .read_values(&[NodeFixtures::temperature()])
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(values, vec![None]);
}

#[tokio::test]
async fn test_read_empty_input_completes_empty() {
    let fixture = ClientFixture::connected().await;

    let values = fixture
        .client
        .read_values(&[])
        .await
        .expect("connected")
        .assert_completed();

    assert!(values.is_empty());
    assert_eq!(fixture.server().read_count(), 0);
}

#[tokio::test]
async fn test_read_transport_failure_is_distinct_from_empty() {
    let fixture = ClientFixture::connected().await;
    fixture.server().fail_reads(true);

    let outcome = fixture
        .client
        .read_values(&[NodeFixtures::temperature()])
        .await
        .expect("connected");

    assert!(outcome.is_failed());
    assert!(outcome.as_completed().is_none());
    let error = outcome.assert_failed();
    assert!(matches!(error, UaError::Transport(TransportError::ServiceFault { .. })));
    assert!(error.is_transport());
    assert_eq!(fixture.client.stats().transport_failures(), 1);
}

#[tokio::test]
async fn test_read_updates_stats() {
    let fixture = ClientFixture::connected().await;

    let _ = fixture.client.read_values(&NodeFixtures::batch(4)).await;
    let _ = fixture.client.read_values(&[NodeFixtures::temperature()]).await;

    assert_eq!(fixture.client.stats().reads(), 2);
    assert_eq!(fixture.client.stats().read_items(), 5);
}

#[tokio::test]
async fn test_read_after_close_fails_precondition() {
    let fixture = ClientFixture::connected().await;
    fixture.client.close().await.assert_completed();

    assert_not_connected(fixture.client.read_values(&[NodeFixtures::temperature()]).await);
    assert_eq!(fixture.server().read_count(), 0);
}

// =============================================================================
// Write
// =============================================================================

#[tokio::test]
async fn test_write_disconnected_issues_no_call() {
    let fixture = ClientFixture::new();

    assert_not_connected(
        fixture
            .client
            .write_values(&[(NodeFixtures::temperature(), Variant::Double(1.0))])
            .await,
    );
    assert_eq!(fixture.server().write_count(), 0);
}

#[tokio::test]
async fn test_write_stores_values() {
    let fixture = ClientFixture::connected().await;

    let statuses = fixture
        .client
        .write_values(&[
            (NodeFixtures::temperature(), Variant::Double(30.0)),
            (NodeFixtures::running(), Variant::Boolean(false)),
        ])
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(statuses, vec![StatusCode::GOOD, StatusCode::GOOD]);
    assert_eq!(
        fixture.server().value(&NodeFixtures::temperature()),
        Some(Variant::Double(30.0))
    );

    let values = fixture
        .client
        .read_values(&[NodeFixtures::temperature(), NodeFixtures::running()])
        .await
        .expect("connected")
        .assert_completed();
    assert_eq!(values, vec![Some(Variant::Double(30.0)), Some(Variant::Boolean(false))]);
}

#[tokio::test]
async fn test_write_per_item_status() {
    let fixture = ClientFixture::connected().await;
    fixture.server().set_read_only(NodeFixtures::pressure());

    let statuses = fixture
        .client
        .write_values(&[
            (NodeFixtures::pressure(), Variant::Int32(1)),
            (NodeFixtures::temperature(), Variant::Double(2.0)),
        ])
        .await
        .expect("connected")
        .assert_completed();

    assert_eq!(statuses, vec![StatusCode::BAD_NOT_WRITABLE, StatusCode::GOOD]);
    assert_eq!(fixture.server().write_history().len(), 1);
}

#[tokio::test]
async fn test_write_transport_failure() {
    let fixture = ClientFixture::connected().await;
    fixture.server().fail_writes(true);

    let error = fixture
        .client
        .write_values(&[(NodeFixtures::temperature(), Variant::Double(2.0))])
        .await
        .expect("connected")
        .assert_failed();

    assert!(error.is_transport());
    assert_eq!(fixture.client.stats().writes(), 1);
    assert_eq!(fixture.client.stats().transport_failures(), 1);
}

#[tokio::test]
async fn test_write_empty_input_completes_empty() {
    let fixture = ClientFixture::connected().await;

    let statuses = fixture
        .client
        .write_values(&[])
        .await
        .expect("connected")
        .assert_completed();

    assert!(statuses.is_empty());
    assert_eq!(fixture.server().write_count(), 0);
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Simulated Protocol Stack
//!
//! An in-memory [`ProtocolStack`] for exercising the client without a server.
//!
//! [`SimulatedStack`] hands out [`SimulatedChannel`]s that all talk to one
//! shared [`SimulatedServer`]. The server holds node values, per-node status
//! overrides, failure switches, call counters and the publish stream, so a
//! test can configure it before opening and inspect it afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use ualink_client::client::{
    Channel, ChannelEvent, ChannelEventHandler, CreateSubscriptionRequest,
    CreateSubscriptionResponse, DataChangeNotification, MonitoredItemCreateRequest,
    MonitoredItemCreateResult, MonitoredItemNotification, NotificationData, ProtocolStack,
    PublishResponse, ReadValueId, WriteValue,
};
use ualink_client::{
    ApplicationDescription, ConnectionError, DataValue, EndpointDescription, NodeId, StatusCode,
    TransportError, UaError, UaResult, UserIdentity, Variant,
};

use super::fixtures::EndpointFixtures;

/// Capacity of the simulated publish stream.
pub const PUBLISH_CAPACITY: usize = 256;

/// Fastest publishing interval the simulated server grants.
pub const MIN_PUBLISHING_INTERVAL: Duration = Duration::from_millis(10);

// =============================================================================
// SimulatedServer
// =============================================================================

/// Server-side state shared by every channel of a [`SimulatedStack`].
#[derive(Debug)]
pub struct SimulatedServer {
    /// Node values.
    values: RwLock<HashMap<NodeId, Variant>>,

    /// Status returned instead of the value.
    statuses: RwLock<HashMap<NodeId, StatusCode>>,

    /// Nodes that reject writes.
    read_only: RwLock<HashSet<NodeId>>,

    /// Simulated read latency.
    read_latency: Mutex<Duration>,

    fail_open: AtomicBool,
    fail_close: AtomicBool,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_subscriptions: AtomicBool,
    fail_register: AtomicBool,

    /// Register nodes answers with an empty list.
    register_nothing: AtomicBool,

    /// Monitored item responses omit the last result.
    truncate_item_results: AtomicBool,

    /// Fail the next N reads.
    failing_reads: AtomicU32,

    open_count: AtomicU64,
    close_count: AtomicU64,
    read_count: AtomicU64,
    write_count: AtomicU64,
    register_count: AtomicU64,
    unregister_count: AtomicU64,

    next_subscription_id: AtomicU32,
    next_monitored_item_id: AtomicU32,
    next_sequence: AtomicU32,

    /// Live subscriptions and their monitored item requests.
    subscriptions: RwLock<HashMap<u32, Vec<MonitoredItemCreateRequest>>>,

    /// Subscription create requests, in order.
    subscription_requests: Mutex<Vec<CreateSubscriptionRequest>>,

    /// Deleted subscription ids, in order.
    deleted_subscriptions: Mutex<Vec<u32>>,

    /// Write history for verification.
    write_history: Mutex<Vec<(NodeId, Variant)>>,

    publisher: broadcast::Sender<PublishResponse>,
}

impl SimulatedServer {
    /// Creates an empty server.
    pub fn new() -> Self {
        let (publisher, _) = broadcast::channel(PUBLISH_CAPACITY);
        Self {
            values: RwLock::new(HashMap::new()),
            statuses: RwLock::new(HashMap::new()),
            read_only: RwLock::new(HashSet::new()),
            read_latency: Mutex::new(Duration::ZERO),
            fail_open: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_subscriptions: AtomicBool::new(false),
            fail_register: AtomicBool::new(false),
            register_nothing: AtomicBool::new(false),
            truncate_item_results: AtomicBool::new(false),
            failing_reads: AtomicU32::new(0),
            open_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
            register_count: AtomicU64::new(0),
            unregister_count: AtomicU64::new(0),
            next_subscription_id: AtomicU32::new(1),
            next_monitored_item_id: AtomicU32::new(1),
            next_sequence: AtomicU32::new(1),
            subscriptions: RwLock::new(HashMap::new()),
            subscription_requests: Mutex::new(Vec::new()),
            deleted_subscriptions: Mutex::new(Vec::new()),
            write_history: Mutex::new(Vec::new()),
            publisher,
        }
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    /// Sets a node value.
    pub fn set_value(&self, node_id: NodeId, value: impl Into<Variant>) {
        self.values.write().insert(node_id, value.into());
    }

    /// Returns a node value.
    pub fn value(&self, node_id: &NodeId) -> Option<Variant> {
        self.values.read().get(node_id).cloned()
    }

    /// Makes reads of `node_id` return `status` without a value.
    pub fn set_status(&self, node_id: NodeId, status: StatusCode) {
        self.statuses.write().insert(node_id, status);
    }

    /// Makes writes to `node_id` fail with `BadNotWritable`.
    pub fn set_read_only(&self, node_id: NodeId) {
        self.read_only.write().insert(node_id);
    }

    /// Sets the simulated read latency.
    pub fn set_read_latency(&self, latency: Duration) {
        *self.read_latency.lock() = latency;
    }

    /// Makes channel open fail.
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Makes channel close fail without raising a Closed event.
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Makes every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes the next `count` reads fail.
    pub fn fail_next_reads(&self, count: u32) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    /// Makes every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes subscription creation fail.
    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Makes node registration fail.
    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    /// Makes node registration return no aliases.
    pub fn register_nothing(&self, enabled: bool) {
        self.register_nothing.store(enabled, Ordering::SeqCst);
    }

    /// Makes monitored item creation return one result too few.
    pub fn truncate_item_results(&self, enabled: bool) {
        self.truncate_item_results.store(enabled, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Publishing
    // -------------------------------------------------------------------------

    /// Publishes a response; returns the number of stream receivers.
    pub fn publish(&self, subscription_id: u32, notifications: Vec<NotificationData>) -> usize {
        let response = PublishResponse {
            subscription_id,
            sequence_number: self.next_sequence.fetch_add(1, Ordering::SeqCst),
            publish_time: Utc::now(),
            notifications,
        };
        self.publisher.send(response).unwrap_or(0)
    }

    /// Publishes one data change notification.
    pub fn publish_data_change(&self, subscription_id: u32, changes: &[(u32, DataValue)]) -> usize {
        let monitored_items = changes
            .iter()
            .map(|(client_handle, value)| MonitoredItemNotification {
                client_handle: *client_handle,
                value: value.clone(),
            })
            .collect();
        self.publish(
            subscription_id,
            vec![NotificationData::DataChange(DataChangeNotification { monitored_items })],
        )
    }

    /// Publishes a keep-alive.
    pub fn publish_keep_alive(&self, subscription_id: u32) -> usize {
        self.publish(subscription_id, Vec::new())
    }

    /// Publishes a subscription status change.
    pub fn publish_status_change(&self, subscription_id: u32, status: StatusCode) -> usize {
        self.publish(subscription_id, vec![NotificationData::StatusChange(status)])
    }

    /// Returns the number of publish stream receivers.
    pub fn stream_receivers(&self) -> usize {
        self.publisher.receiver_count()
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    /// Returns the number of channel opens.
    pub fn open_count(&self) -> u64 {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Returns the number of channel closes.
    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Returns the number of read requests.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Returns the number of write requests.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Returns the number of register requests.
    pub fn register_count(&self) -> u64 {
        self.register_count.load(Ordering::SeqCst)
    }

    /// Returns the number of unregister requests.
    pub fn unregister_count(&self) -> u64 {
        self.unregister_count.load(Ordering::SeqCst)
    }

    /// Returns the monitored item requests of a live subscription.
    pub fn monitored_items(&self, subscription_id: u32) -> Option<Vec<MonitoredItemCreateRequest>> {
        self.subscriptions.read().get(&subscription_id).cloned()
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Returns every subscription create request.
    pub fn subscription_requests(&self) -> Vec<CreateSubscriptionRequest> {
        self.subscription_requests.lock().clone()
    }

    /// Returns deleted subscription ids.
    pub fn deleted_subscriptions(&self) -> Vec<u32> {
        self.deleted_subscriptions.lock().clone()
    }

    /// Returns the write history.
    pub fn write_history(&self) -> Vec<(NodeId, Variant)> {
        self.write_history.lock().clone()
    }

    /// Total number of service calls other than open and close.
    pub fn service_calls(&self) -> u64 {
        self.read_count()
            + self.write_count()
            + self.register_count()
            + self.subscription_requests.lock().len() as u64
    }

    fn take_read_failure(&self) -> bool {
        if self.fail_reads.load(Ordering::SeqCst) {
            return true;
        }
        self.failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn read_one(&self, node_id: &NodeId) -> DataValue {
        if let Some(status) = self.statuses.read().get(node_id) {
            return DataValue::with_status(*status);
        }
        match self.values.read().get(node_id) {
            Some(value) => DataValue::good(value.clone()),
            None => DataValue::with_status(StatusCode::BAD_NODE_ID_UNKNOWN),
        }
    }
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SimulatedChannel
// =============================================================================

/// A channel bound to a [`SimulatedServer`].
pub struct SimulatedChannel {
    server: Arc<SimulatedServer>,
    events: Arc<dyn ChannelEventHandler>,
    endpoint: EndpointDescription,
    identity: UserIdentity,
    open: AtomicBool,
}

impl SimulatedChannel {
    /// Raises a lifecycle event as the protocol stack would.
    pub fn emit(&self, event: ChannelEvent) {
        if matches!(event, ChannelEvent::Closed) {
            self.open.store(false, Ordering::SeqCst);
        }
        self.events.on_event(event);
    }

    /// Returns the endpoint the channel was built for.
    pub fn endpoint(&self) -> &EndpointDescription {
        &self.endpoint
    }

    /// Returns the identity the channel was built with.
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    /// Returns `true` while open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self, service: &'static str) -> UaResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(UaError::channel_closed(format!("{service} on closed channel")))
        }
    }
}

impl std::fmt::Debug for SimulatedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedChannel")
            .field("endpoint", &self.endpoint.endpoint_url)
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl Channel for SimulatedChannel {
    async fn open(&self) -> UaResult<()> {
        self.server.open_count.fetch_add(1, Ordering::SeqCst);
        if self.server.fail_open.load(Ordering::SeqCst) {
            return Err(UaError::service_fault("ActivateSession", StatusCode::BAD_TIMEOUT));
        }
        self.open.store(true, Ordering::SeqCst);
        self.events.on_event(ChannelEvent::Opened);
        Ok(())
    }

    async fn close(&self) -> UaResult<()> {
        self.server.close_count.fetch_add(1, Ordering::SeqCst);
        if self.server.fail_close.load(Ordering::SeqCst) {
            return Err(UaError::service_fault("CloseSession", StatusCode::BAD_TIMEOUT));
        }
        self.emit(ChannelEvent::Closed);
        Ok(())
    }

    fn is_idle(&self) -> bool {
        !self.is_open()
    }

    async fn read(&self, nodes: &[ReadValueId]) -> UaResult<Vec<DataValue>> {
        self.server.read_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_open("Read")?;

        let latency = *self.server.read_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.server.take_read_failure() {
            return Err(UaError::service_fault("Read", StatusCode::BAD_TIMEOUT));
        }

        Ok(nodes.iter().map(|node| self.server.read_one(&node.node_id)).collect())
    }

    async fn write(&self, values: &[WriteValue]) -> UaResult<Vec<StatusCode>> {
        self.server.write_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_open("Write")?;

        if self.server.fail_writes.load(Ordering::SeqCst) {
            return Err(UaError::service_fault("Write", StatusCode::BAD_TIMEOUT));
        }

        let statuses = values
            .iter()
            .map(|write| {
                if self.server.read_only.read().contains(&write.node_id) {
                    return StatusCode::BAD_NOT_WRITABLE;
                }
                let Some(value) = write.value.value.clone() else {
                    return StatusCode::BAD_TYPE_MISMATCH;
                };
                self.server
                    .write_history
                    .lock()
                    .push((write.node_id.clone(), value.clone()));
                self.server.values.write().insert(write.node_id.clone(), value);
                StatusCode::GOOD
            })
            .collect();

        Ok(statuses)
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> UaResult<CreateSubscriptionResponse> {
        self.ensure_open("CreateSubscription")?;
        self.server.subscription_requests.lock().push(request.clone());

        if self.server.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(UaError::service_fault("CreateSubscription", StatusCode::BAD_TIMEOUT));
        }

        let subscription_id = self.server.next_subscription_id.fetch_add(1, Ordering::SeqCst);
        self.server.subscriptions.write().insert(subscription_id, Vec::new());

        let keep_alive = request.requested_max_keep_alive_count.max(1);
        Ok(CreateSubscriptionResponse {
            subscription_id,
            revised_publishing_interval: request
                .requested_publishing_interval
                .max(MIN_PUBLISHING_INTERVAL),
            revised_lifetime_count: request
                .requested_lifetime_count
                .max(keep_alive.saturating_mul(3)),
            revised_max_keep_alive_count: keep_alive,
        })
    }

    async fn delete_subscription(&self, subscription_id: u32) -> UaResult<()> {
        self.ensure_open("DeleteSubscriptions")?;
        if self.server.subscriptions.write().remove(&subscription_id).is_none() {
            return Err(UaError::service_fault(
                "DeleteSubscriptions",
                StatusCode::BAD_SUBSCRIPTION_ID_INVALID,
            ));
        }
        self.server.deleted_subscriptions.lock().push(subscription_id);
        Ok(())
    }

    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemCreateRequest],
    ) -> UaResult<Vec<MonitoredItemCreateResult>> {
        self.ensure_open("CreateMonitoredItems")?;

        {
            let mut subscriptions = self.server.subscriptions.write();
            let Some(existing) = subscriptions.get_mut(&subscription_id) else {
                return Err(UaError::service_fault(
                    "CreateMonitoredItems",
                    StatusCode::BAD_SUBSCRIPTION_ID_INVALID,
                ));
            };
            existing.extend_from_slice(items);
        }

        let mut results: Vec<MonitoredItemCreateResult> = items
            .iter()
            .map(|item| {
                let status = self
                    .server
                    .statuses
                    .read()
                    .get(&item.node_id)
                    .copied()
                    .unwrap_or(StatusCode::GOOD);
                MonitoredItemCreateResult {
                    status,
                    monitored_item_id: self.server.next_monitored_item_id.fetch_add(1, Ordering::SeqCst),
                    revised_sampling_interval: item.sampling_interval.unwrap_or_default(),
                    revised_queue_size: item.queue_size,
                }
            })
            .collect();

        if self.server.truncate_item_results.load(Ordering::SeqCst) {
            results.pop();
        }

        Ok(results)
    }

    async fn register_nodes(&self, nodes: &[NodeId]) -> UaResult<Vec<NodeId>> {
        self.server.register_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_open("RegisterNodes")?;

        if self.server.fail_register.load(Ordering::SeqCst) {
            return Err(UaError::service_fault("RegisterNodes", StatusCode::BAD_TIMEOUT));
        }
        if self.server.register_nothing.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        Ok(nodes.to_vec())
    }

    async fn unregister_nodes(&self, _nodes: &[NodeId]) -> UaResult<()> {
        self.server.unregister_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn notifications(&self) -> broadcast::Receiver<PublishResponse> {
        self.server.publisher.subscribe()
    }
}

// =============================================================================
// SimulatedStack
// =============================================================================

/// A [`ProtocolStack`] backed by a [`SimulatedServer`].
#[derive(Debug)]
pub struct SimulatedStack {
    server: Arc<SimulatedServer>,
    endpoints: RwLock<Vec<EndpointDescription>>,
    channels: Mutex<Vec<Arc<SimulatedChannel>>>,
    discovery_urls: Mutex<Vec<String>>,
    fail_discovery: AtomicBool,
    fail_create: AtomicBool,
}

impl SimulatedStack {
    /// Creates a stack advertising an unsecured and a secured endpoint.
    pub fn new() -> Self {
        Self::with_endpoints(EndpointFixtures::mixed())
    }

    /// Creates a stack advertising `endpoints`.
    pub fn with_endpoints(endpoints: Vec<EndpointDescription>) -> Self {
        Self {
            server: Arc::new(SimulatedServer::new()),
            endpoints: RwLock::new(endpoints),
            channels: Mutex::new(Vec::new()),
            discovery_urls: Mutex::new(Vec::new()),
            fail_discovery: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
        }
    }

    /// Creates a shared stack.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the server state.
    pub fn server(&self) -> Arc<SimulatedServer> {
        Arc::clone(&self.server)
    }

    /// Replaces the advertised endpoints.
    pub fn set_endpoints(&self, endpoints: Vec<EndpointDescription>) {
        *self.endpoints.write() = endpoints;
    }

    /// Makes discovery fail.
    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    /// Makes channel creation fail.
    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Returns every channel created so far.
    pub fn channels(&self) -> Vec<Arc<SimulatedChannel>> {
        self.channels.lock().clone()
    }

    /// Returns the most recent channel.
    pub fn last_channel(&self) -> Option<Arc<SimulatedChannel>> {
        self.channels.lock().last().cloned()
    }

    /// Returns every URL discovery was called with.
    pub fn discovery_urls(&self) -> Vec<String> {
        self.discovery_urls.lock().clone()
    }
}

impl Default for SimulatedStack {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolStack for SimulatedStack {
    async fn discover_endpoints(&self, discovery_url: &str) -> UaResult<Vec<EndpointDescription>> {
        self.discovery_urls.lock().push(discovery_url.to_string());
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(TransportError::discovery(discovery_url, "connection refused").into());
        }
        Ok(self.endpoints.read().clone())
    }

    fn create_channel(
        &self,
        _application: &ApplicationDescription,
        identity: &UserIdentity,
        endpoint: &EndpointDescription,
        events: Arc<dyn ChannelEventHandler>,
    ) -> UaResult<Arc<dyn Channel>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ConnectionError::channel_creation(&endpoint.endpoint_url, "simulated failure").into());
        }

        let channel = Arc::new(SimulatedChannel {
            server: Arc::clone(&self.server),
            events,
            endpoint: endpoint.clone(),
            identity: identity.clone(),
            open: AtomicBool::new(false),
        });
        self.channels.lock().push(Arc::clone(&channel));
        Ok(channel)
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Subscriptions and notification routing.
//!
//! All subscriptions of a session share one publish stream. Each subscription
//! gets its own routing task that keeps only the publish responses tagged
//! with its subscription identity and hands their data changes to the
//! request's callback.
//!
//! ```text
//!                 Channel::notifications()
//!                           │
//!          ┌────────────────┼────────────────┐
//!          ▼                ▼                ▼
//!   ┌────────────┐   ┌────────────┐   ┌────────────┐
//!   │ route sub-7│   │ route sub-8│   │ route sub-9│
//!   └────────────┘   └────────────┘   └────────────┘
//!          │                │                │
//!          ▼                ▼                ▼
//!      callback         callback         callback
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ualink_client::client::{ChannelCallback, SubscriptionRequest};
//!
//! let (callback, mut batches) = ChannelCallback::with_channel(64);
//! let request = SubscriptionRequest::new(nodes, Arc::new(callback))
//!     .publishing_interval(Duration::from_millis(100));
//!
//! let handle = client.subscribe(request).await?.into_result()?;
//! while let Some(batch) = batches.recv().await {
//!     for change in batch {
//!         println!("{} = {:?}", change.client_handle, change.value.value);
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::channel::{
    Channel, CreateSubscriptionRequest, CreateSubscriptionResponse, DataChangeNotification,
    MonitoredItemCreateRequest, NotificationData, PublishResponse,
};
use super::connection::{ConnectionManager, SessionLease};
use super::wrapper::ClientStats;
use crate::config::SubscriptionSettings;
use crate::error::{ConfigurationError, Outcome, SubscriptionError, UaResult};
use crate::types::{AttributeId, DataValue, MonitoringMode, NodeId, StatusCode};

// =============================================================================
// Identifiers
// =============================================================================

/// Server-assigned subscription identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u32);

impl SubscriptionId {
    /// Returns the raw id.
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// =============================================================================
// SubscriptionData
// =============================================================================

/// One value change delivered to a subscription callback.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionData {
    /// Subscription the change belongs to.
    pub subscription_id: SubscriptionId,
    /// Client handle of the monitored item (1-based request position).
    pub client_handle: u32,
    /// Node the handle was assigned to, if the handle is known.
    pub node_id: Option<NodeId>,
    /// The new value.
    pub value: DataValue,
}

// =============================================================================
// Callbacks
// =============================================================================

/// Receives the notifications of one subscription.
///
/// Calls for a subscription are made one at a time, in the order the server
/// published them.
#[async_trait]
pub trait SubscriptionCallback: Send + Sync {
    /// Called once per data change notification with all of its changes.
    async fn on_data_change(&self, batch: Vec<SubscriptionData>);

    /// Called when the server reports a subscription status change.
    async fn on_status_change(&self, _subscription_id: SubscriptionId, _status: StatusCode) {}

    /// Called for publish responses without notifications.
    async fn on_keep_alive(&self, _subscription_id: SubscriptionId) {}
}

/// Forwards batches into a bounded mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelCallback {
    sender: mpsc::Sender<Vec<SubscriptionData>>,
}

impl ChannelCallback {
    /// Creates a callback that sends into `sender`.
    pub fn new(sender: mpsc::Sender<Vec<SubscriptionData>>) -> Self {
        Self { sender }
    }

    /// Creates a callback together with its receiver.
    pub fn with_channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<SubscriptionData>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl SubscriptionCallback for ChannelCallback {
    async fn on_data_change(&self, batch: Vec<SubscriptionData>) {
        if self.sender.send(batch).await.is_err() {
            tracing::trace!("Subscription receiver dropped");
        }
    }
}

/// Fans batches out to any number of broadcast receivers.
#[derive(Debug)]
pub struct BroadcastCallback {
    sender: broadcast::Sender<Vec<SubscriptionData>>,
}

impl BroadcastCallback {
    /// Creates a broadcast callback.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to receive batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<SubscriptionData>> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl SubscriptionCallback for BroadcastCallback {
    async fn on_data_change(&self, batch: Vec<SubscriptionData>) {
        // No receivers is fine.
        let _ = self.sender.send(batch);
    }
}

/// Adapts a synchronous closure.
pub struct FnCallback<F> {
    f: F,
}

impl<F> FnCallback<F>
where
    F: Fn(Vec<SubscriptionData>) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> SubscriptionCallback for FnCallback<F>
where
    F: Fn(Vec<SubscriptionData>) + Send + Sync,
{
    async fn on_data_change(&self, batch: Vec<SubscriptionData>) {
        (self.f)(batch)
    }
}

// =============================================================================
// SubscriptionRequest
// =============================================================================

/// What to monitor and where to deliver changes.
#[derive(Clone)]
pub struct SubscriptionRequest {
    /// Nodes to monitor, in handle order.
    pub node_ids: Vec<NodeId>,
    /// Requested subscription parameters.
    pub settings: SubscriptionSettings,
    /// Receives every notification batch.
    pub callback: Arc<dyn SubscriptionCallback>,
}

impl SubscriptionRequest {
    /// Creates a request with default settings (10 ms, keep-alive 10, lifetime 30).
    pub fn new(node_ids: Vec<NodeId>, callback: Arc<dyn SubscriptionCallback>) -> Self {
        Self {
            node_ids,
            settings: SubscriptionSettings::default(),
            callback,
        }
    }

    /// Replaces all settings.
    pub fn with_settings(mut self, settings: SubscriptionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the requested publishing interval.
    pub fn publishing_interval(mut self, interval: Duration) -> Self {
        self.settings.publishing_interval = interval;
        self
    }

    /// Sets the requested max keep-alive count.
    pub fn max_keep_alive_count(mut self, count: u32) -> Self {
        self.settings.max_keep_alive_count = count;
        self
    }

    /// Sets the requested lifetime count.
    pub fn lifetime_count(mut self, count: u32) -> Self {
        self.settings.lifetime_count = count;
        self
    }

    /// Enables or disables publishing.
    pub fn publishing_enabled(mut self, enabled: bool) -> Self {
        self.settings.publishing_enabled = enabled;
        self
    }

    /// Validates the request.
    ///
    /// Only the node list is checked. The counts and publishing interval go
    /// to the server as given and come back revised.
    pub fn validate(&self) -> UaResult<()> {
        if self.node_ids.is_empty() {
            return Err(ConfigurationError::invalid_value(
                "node_ids",
                "a subscription needs at least one node",
            )
            .into());
        }
        Ok(())
    }

    fn create_request(&self) -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            requested_publishing_interval: self.settings.publishing_interval,
            requested_lifetime_count: self.settings.lifetime_count,
            requested_max_keep_alive_count: self.settings.max_keep_alive_count,
            max_notifications_per_publish: 0,
            publishing_enabled: self.settings.publishing_enabled,
            priority: 0,
        }
    }

    fn monitored_item_requests(&self) -> Vec<MonitoredItemCreateRequest> {
        self.node_ids
            .iter()
            .zip(1u32..)
            .map(|(node_id, client_handle)| MonitoredItemCreateRequest {
                node_id: node_id.clone(),
                attribute_id: AttributeId::Value,
                monitoring_mode: MonitoringMode::Reporting,
                client_handle,
                sampling_interval: None,
                queue_size: 1,
                discard_oldest: true,
            })
            .collect()
    }
}

impl fmt::Debug for SubscriptionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRequest")
            .field("node_ids", &self.node_ids)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// MonitoredItem
// =============================================================================

/// A monitored item as created by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredItem {
    /// Monitored node.
    pub node_id: NodeId,
    /// Client handle.
    pub client_handle: u32,
    /// Server-assigned id.
    pub monitored_item_id: u32,
    /// Create result.
    pub status: StatusCode,
}

impl MonitoredItem {
    /// Returns `true` if the server accepted the item.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// SubscriptionHandle
// =============================================================================

struct RoutingTask {
    token: CancellationToken,
    join: JoinHandle<()>,
}

/// A live subscription.
///
/// Dropping the handle stops notification routing but leaves the server-side
/// subscription to expire on its own. Use [`SubscriptionHandle::unsubscribe`]
/// to delete it, or [`SubscriptionHandle::detach`] to keep routing for the
/// rest of the session.
pub struct SubscriptionHandle {
    subscription_id: SubscriptionId,
    revised: CreateSubscriptionResponse,
    items: Vec<MonitoredItem>,
    channel: Arc<dyn Channel>,
    routing: Option<RoutingTask>,
    stats: Arc<ClientStats>,
}

impl SubscriptionHandle {
    /// Returns the subscription identity.
    pub fn id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Returns the publishing interval the server chose.
    pub fn revised_publishing_interval(&self) -> Duration {
        self.revised.revised_publishing_interval
    }

    /// Returns the keep-alive count the server chose.
    pub fn revised_max_keep_alive_count(&self) -> u32 {
        self.revised.revised_max_keep_alive_count
    }

    /// Returns the lifetime count the server chose.
    pub fn revised_lifetime_count(&self) -> u32 {
        self.revised.revised_lifetime_count
    }

    /// Returns the monitored items in request order.
    pub fn monitored_items(&self) -> &[MonitoredItem] {
        &self.items
    }

    /// Returns `true` while notifications are being routed.
    pub fn is_routing(&self) -> bool {
        self.routing
            .as_ref()
            .map(|task| !task.token.is_cancelled() && !task.join.is_finished())
            .unwrap_or(false)
    }

    /// Stops routing and deletes the subscription on the server.
    pub async fn unsubscribe(mut self) -> Outcome<()> {
        if let Some(task) = self.routing.take() {
            task.token.cancel();
            if let Err(error) = task.join.await {
                tracing::warn!(subscription_id = %self.subscription_id, error = %error, "Routing task ended abnormally");
            }
        }

        let result = self.channel.delete_subscription(self.subscription_id.0).await;
        if result.is_ok() {
            self.stats.record_subscription_deleted();
            tracing::info!(subscription_id = %self.subscription_id, "Subscription deleted");
        } else {
            self.stats.record_transport_failure();
        }

        Outcome::absorb(result, "SubscriptionHandle::unsubscribe")
    }

    /// Keeps routing until the session closes, releasing the handle.
    pub fn detach(mut self) -> SubscriptionId {
        self.routing.take();
        self.subscription_id
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.routing.take() {
            task.token.cancel();
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("subscription_id", &self.subscription_id)
            .field("items", &self.items.len())
            .field("routing", &self.is_routing())
            .finish()
    }
}

// =============================================================================
// SubscriptionManager
// =============================================================================

/// Creates subscriptions on the current channel.
#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    connection: Arc<ConnectionManager>,
    stats: Arc<ClientStats>,
}

impl SubscriptionManager {
    /// Creates a manager over `connection`.
    pub fn new(connection: Arc<ConnectionManager>, stats: Arc<ClientStats>) -> Self {
        Self { connection, stats }
    }

    /// Creates a subscription with one Reporting monitored item per node and
    /// starts routing its notifications to the request's callback.
    ///
    /// # Errors
    ///
    /// Invalid requests and a disconnected client are returned as errors.
    /// Service failures are logged and returned as [`Outcome::Failed`].
    pub async fn subscribe(&self, request: SubscriptionRequest) -> UaResult<Outcome<SubscriptionHandle>> {
        request.validate()?;
        let lease = self.connection.require_connected()?;

        let result = self.create(lease, request).await;
        if result.is_err() {
            self.stats.record_transport_failure();
        }
        Ok(Outcome::absorb(result, "SubscriptionManager::subscribe"))
    }

    async fn create(&self, lease: SessionLease, request: SubscriptionRequest) -> UaResult<SubscriptionHandle> {
        let channel = lease.channel;

        // Attach before the subscription exists so no publish can be missed.
        let receiver = channel.notifications();

        let revised = channel.create_subscription(request.create_request()).await?;
        let subscription_id = SubscriptionId(revised.subscription_id);

        tracing::debug!(
            subscription_id = %subscription_id,
            revised_interval = ?revised.revised_publishing_interval,
            "Subscription created on server"
        );

        let item_requests = request.monitored_item_requests();
        let items = match create_items(channel.as_ref(), subscription_id, &item_requests).await {
            Ok(items) => items,
            Err(error) => {
                if let Err(cleanup) = channel.delete_subscription(subscription_id.0).await {
                    cleanup.log("SubscriptionManager::create cleanup");
                }
                return Err(error);
            }
        };

        for item in items.iter().filter(|item| !item.is_good()) {
            tracing::warn!(
                subscription_id = %subscription_id,
                node_id = %item.node_id,
                status = %item.status,
                "Monitored item rejected"
            );
        }

        let token = lease.scope;
        let router = Router {
            subscription_id,
            node_ids: request.node_ids.into(),
            callback: request.callback,
            token: token.clone(),
            stats: Arc::clone(&self.stats),
        };
        let join = tokio::spawn(router.run(receiver));

        self.stats.record_subscription_created();
        tracing::info!(
            subscription_id = %subscription_id,
            items = items.len(),
            "Subscription active"
        );

        Ok(SubscriptionHandle {
            subscription_id,
            revised,
            items,
            channel,
            routing: Some(RoutingTask { token, join }),
            stats: Arc::clone(&self.stats),
        })
    }
}

async fn create_items(
    channel: &dyn Channel,
    subscription_id: SubscriptionId,
    requests: &[MonitoredItemCreateRequest],
) -> UaResult<Vec<MonitoredItem>> {
    let results = channel
        .create_monitored_items(subscription_id.0, requests)
        .await?;

    if results.len() != requests.len() {
        return Err(SubscriptionError::MonitoredItemCountMismatch {
            subscription_id: subscription_id.0,
            requested: requests.len(),
            returned: results.len(),
        }
        .into());
    }

    Ok(requests
        .iter()
        .zip(results)
        .map(|(request, result)| MonitoredItem {
            node_id: request.node_id.clone(),
            client_handle: request.client_handle,
            monitored_item_id: result.monitored_item_id,
            status: result.status,
        })
        .collect())
}

// =============================================================================
// Routing
// =============================================================================

/// Filters the shared publish stream for one subscription.
struct Router {
    subscription_id: SubscriptionId,
    node_ids: Arc<[NodeId]>,
    callback: Arc<dyn SubscriptionCallback>,
    token: CancellationToken,
    stats: Arc<ClientStats>,
}

impl Router {
    async fn run(self, mut receiver: broadcast::Receiver<PublishResponse>) {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                received = receiver.recv() => received,
            };

            match received {
                Ok(response) if response.subscription_id == self.subscription_id.0 => {
                    self.dispatch(response).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        subscription_id = %self.subscription_id,
                        skipped,
                        "Notification stream lagged; publish responses were dropped"
                    );
                }
                Err(RecvError::Closed) => {
                    tracing::debug!(subscription_id = %self.subscription_id, "Notification stream closed");
                    break;
                }
            }
        }

        tracing::debug!(subscription_id = %self.subscription_id, "Routing stopped");
    }

    async fn dispatch(&self, response: PublishResponse) {
        if response.is_keep_alive() {
            self.callback.on_keep_alive(self.subscription_id).await;
            return;
        }

        for notification in response.notifications {
            if self.token.is_cancelled() {
                return;
            }
            match notification {
                NotificationData::DataChange(changes) => {
                    let batch = self.batch(changes);
                    self.stats.record_notification(batch.len());
                    self.callback.on_data_change(batch).await;
                }
                NotificationData::StatusChange(status) => {
                    tracing::info!(subscription_id = %self.subscription_id, status = %status, "Subscription status changed");
                    self.callback.on_status_change(self.subscription_id, status).await;
                }
            }
        }
    }

    fn batch(&self, changes: DataChangeNotification) -> Vec<SubscriptionData> {
        changes
            .monitored_items
            .into_iter()
            .map(|item| SubscriptionData {
                subscription_id: self.subscription_id,
                client_handle: item.client_handle,
                node_id: handle_index(item.client_handle)
                    .and_then(|index| self.node_ids.get(index))
                    .cloned(),
                value: item.value,
            })
            .collect()
    }
}

fn handle_index(client_handle: u32) -> Option<usize> {
    client_handle.checked_sub(1).map(|index| index as usize)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;

    fn noop() -> Arc<dyn SubscriptionCallback> {
        Arc::new(FnCallback::new(|_| {}))
    }

    #[test]
    fn test_request_defaults() {
        let request = SubscriptionRequest::new(vec![NodeId::numeric(2, 1)], noop());
        let create = request.create_request();
        assert_eq!(create.requested_publishing_interval, Duration::from_millis(10));
        assert_eq!(create.requested_max_keep_alive_count, 10);
        assert_eq!(create.requested_lifetime_count, 30);
        assert!(create.publishing_enabled);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_rejects_empty_nodes() {
        let request = SubscriptionRequest::new(vec![], noop());
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_passes_counts_unchanged() {
        let request = SubscriptionRequest::new(vec![NodeId::numeric(2, 1)], noop())
            .publishing_interval(Duration::ZERO)
            .max_keep_alive_count(20)
            .lifetime_count(30);
        assert!(request.validate().is_ok());

        let create = request.create_request();
        assert!(create.requested_publishing_interval.is_zero());
        assert_eq!(create.requested_max_keep_alive_count, 20);
        assert_eq!(create.requested_lifetime_count, 30);
    }

    #[test]
    fn test_monitored_item_handles_follow_request_order() {
        let nodes = vec![
            NodeId::string(2, "A"),
            NodeId::string(2, "B"),
            NodeId::string(2, "C"),
        ];
        let request = SubscriptionRequest::new(nodes.clone(), noop());
        let items = request.monitored_item_requests();

        assert_eq!(items.len(), 3);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.client_handle, i as u32 + 1);
            assert_eq!(item.node_id, nodes[i]);
            assert_eq!(item.monitoring_mode, MonitoringMode::Reporting);
            assert_eq!(item.attribute_id, AttributeId::Value);
        }
    }

    #[test]
    fn test_router_batch_resolves_node_ids() {
        let router = Router {
            subscription_id: SubscriptionId(7),
            node_ids: vec![NodeId::string(2, "A"), NodeId::string(2, "B")].into(),
            callback: noop(),
            token: CancellationToken::new(),
            stats: Arc::new(ClientStats::new()),
        };

        let batch = router.batch(DataChangeNotification {
            monitored_items: vec![
                super::super::channel::MonitoredItemNotification {
                    client_handle: 2,
                    value: DataValue::good(Variant::Int32(5)),
                },
                super::super::channel::MonitoredItemNotification {
                    client_handle: 9,
                    value: DataValue::good(Variant::Int32(6)),
                },
            ],
        });

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].subscription_id, SubscriptionId(7));
        assert_eq!(batch[0].node_id, Some(NodeId::string(2, "B")));
        assert_eq!(batch[1].node_id, None);
    }

    #[tokio::test]
    async fn test_channel_callback_delivers() {
        let (callback, mut receiver) = ChannelCallback::with_channel(4);
        callback.on_data_change(vec![]).await;
        assert_eq!(receiver.recv().await, Some(vec![]));
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId(42).to_string(), "sub-42");
        assert_eq!(handle_index(0), None);
        assert_eq!(handle_index(1), Some(0));
    }
}

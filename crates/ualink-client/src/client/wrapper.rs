// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! High-level client handle.
//!
//! [`OpcClient`] bundles the connection manager, the read/write facade, the
//! subscription manager and the data logger over one shared channel, and
//! keeps [`ClientStats`] for all of them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::access::NodeAccess;
use super::channel::ProtocolStack;
use super::connection::{ChannelStatusObserver, ConnectionManager, ObserverId, StatusObserver};
use super::data_logging::{DataLogger, DataLoggingRequest, LoggingReport};
use super::subscription::{SubscriptionCallback, SubscriptionHandle, SubscriptionManager, SubscriptionRequest};
use crate::config::ClientConfiguration;
use crate::error::{Outcome, UaResult};
use crate::types::{ConnectionStatus, EndpointDescription, NodeId, StatusCode, Variant};

// =============================================================================
// ClientStats
// =============================================================================

/// Counters for client operations.
#[derive(Debug)]
pub struct ClientStats {
    /// Read requests issued.
    reads: AtomicU64,

    /// Nodes covered by read requests.
    read_items: AtomicU64,

    /// Write requests issued.
    writes: AtomicU64,

    /// Nodes covered by write requests.
    write_items: AtomicU64,

    subscriptions_created: AtomicU64,
    subscriptions_deleted: AtomicU64,

    /// Data changes handed to subscription callbacks.
    notifications_delivered: AtomicU64,

    /// Reads issued by logging jobs.
    logging_iterations: AtomicU64,

    /// Service calls that failed in transport.
    transport_failures: AtomicU64,

    opens: AtomicU64,
    open_failures: AtomicU64,
}

impl ClientStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self {
            reads: AtomicU64::new(0),
            read_items: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            write_items: AtomicU64::new(0),
            subscriptions_created: AtomicU64::new(0),
            subscriptions_deleted: AtomicU64::new(0),
            notifications_delivered: AtomicU64::new(0),
            logging_iterations: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            opens: AtomicU64::new(0),
            open_failures: AtomicU64::new(0),
        }
    }

    /// Records a read request over `items` nodes.
    pub fn record_read(&self, items: usize, succeeded: bool) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.read_items.fetch_add(items as u64, Ordering::Relaxed);
        if !succeeded {
            self.record_transport_failure();
        }
    }

    /// Records a write request over `items` nodes.
    pub fn record_write(&self, items: usize, succeeded: bool) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.write_items.fetch_add(items as u64, Ordering::Relaxed);
        if !succeeded {
            self.record_transport_failure();
        }
    }

    /// Records a created subscription.
    pub fn record_subscription_created(&self) {
        self.subscriptions_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a deleted subscription.
    pub fn record_subscription_deleted(&self) {
        self.subscriptions_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `changes` delivered data changes.
    pub fn record_notification(&self, changes: usize) {
        self.notifications_delivered
            .fetch_add(changes as u64, Ordering::Relaxed);
    }

    /// Records one logging read.
    pub fn record_logging_iteration(&self) {
        self.logging_iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a transport failure.
    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an open attempt.
    pub fn record_open(&self, succeeded: bool) {
        self.opens.fetch_add(1, Ordering::Relaxed);
        if !succeeded {
            self.open_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the number of read requests.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of nodes read.
    pub fn read_items(&self) -> u64 {
        self.read_items.load(Ordering::Relaxed)
    }

    /// Returns the number of write requests.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of nodes written.
    pub fn write_items(&self) -> u64 {
        self.write_items.load(Ordering::Relaxed)
    }

    /// Returns the number of subscriptions created.
    pub fn subscriptions_created(&self) -> u64 {
        self.subscriptions_created.load(Ordering::Relaxed)
    }

    /// Returns the number of subscriptions deleted.
    pub fn subscriptions_deleted(&self) -> u64 {
        self.subscriptions_deleted.load(Ordering::Relaxed)
    }

    /// Returns the number of delivered data changes.
    pub fn notifications_delivered(&self) -> u64 {
        self.notifications_delivered.load(Ordering::Relaxed)
    }

    /// Returns the number of logging reads.
    pub fn logging_iterations(&self) -> u64 {
        self.logging_iterations.load(Ordering::Relaxed)
    }

    /// Returns the number of transport failures.
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of open attempts.
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    /// Returns the number of failed open attempts.
    pub fn open_failures(&self) -> u64 {
        self.open_failures.load(Ordering::Relaxed)
    }

    /// Resets all statistics.
    pub fn reset(&self) {
        self.reads.store(0, Ordering::Relaxed);
        self.read_items.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.write_items.store(0, Ordering::Relaxed);
        self.subscriptions_created.store(0, Ordering::Relaxed);
        self.subscriptions_deleted.store(0, Ordering::Relaxed);
        self.notifications_delivered.store(0, Ordering::Relaxed);
        self.logging_iterations.store(0, Ordering::Relaxed);
        self.transport_failures.store(0, Ordering::Relaxed);
        self.opens.store(0, Ordering::Relaxed);
        self.open_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// OpcClient
// =============================================================================

struct ClientInner {
    connection: Arc<ConnectionManager>,
    access: NodeAccess,
    subscriptions: SubscriptionManager,
    logger: DataLogger,
    stats: Arc<ClientStats>,
}

/// A client for one server.
///
/// Cheap to clone; clones share the same connection.
///
/// # Example
///
/// ```rust,ignore
/// use ualink_client::{ClientConfiguration, OpcClient};
///
/// let config = ClientConfiguration::builder()
///     .endpoint_url("opc.tcp://192.168.0.10:4840")
///     .build()?;
/// let client = OpcClient::new(config, stack)?;
///
/// client.on_status_change(|status| println!("status: {status}"));
/// client.open().await.into_result()?;
///
/// let values = client.read_values(&[NodeId::SERVER_CURRENT_TIME]).await?;
/// ```
#[derive(Clone)]
pub struct OpcClient {
    inner: Arc<ClientInner>,
}

impl OpcClient {
    /// Creates a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ClientConfiguration, stack: Arc<dyn ProtocolStack>) -> UaResult<Self> {
        let connection = Arc::new(ConnectionManager::new(config, stack)?);
        let stats = Arc::new(ClientStats::new());

        Ok(Self {
            inner: Arc::new(ClientInner {
                access: NodeAccess::new(Arc::clone(&connection), Arc::clone(&stats)),
                subscriptions: SubscriptionManager::new(Arc::clone(&connection), Arc::clone(&stats)),
                logger: DataLogger::new(Arc::clone(&connection), Arc::clone(&stats)),
                connection,
                stats,
            }),
        })
    }

    /// Creates a client for `opc.tcp://{host}:4840` with the default
    /// application name and anonymous identity, then opens it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `host` does not form a valid
    /// endpoint. Open failures are reported in the returned outcome.
    pub async fn start(host: &str, stack: Arc<dyn ProtocolStack>) -> UaResult<(Self, Outcome<()>)> {
        let client = Self::new(ClientConfiguration::for_host(host), stack)?;
        let opened = client.open().await;
        Ok((client, opened))
    }

    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------

    /// Opens the connection. See [`ConnectionManager::open`].
    pub async fn open(&self) -> Outcome<()> {
        let outcome = self.inner.connection.open().await;
        self.inner.stats.record_open(outcome.is_completed());
        outcome
    }

    /// Closes the connection. See [`ConnectionManager::close`].
    pub async fn close(&self) -> Outcome<()> {
        self.inner.connection.close().await
    }

    /// Returns the connection status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    /// Returns `true` when connected.
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Returns the endpoint in use, if any.
    pub fn selected_endpoint(&self) -> Option<EndpointDescription> {
        self.inner.connection.selected_endpoint()
    }

    /// Returns the configuration.
    pub fn configuration(&self) -> &ClientConfiguration {
        self.inner.connection.configuration()
    }

    /// Registers a status observer.
    pub fn add_status_observer(&self, observer: Arc<dyn StatusObserver>) -> ObserverId {
        self.inner.connection.add_status_observer(observer)
    }

    /// Registers a closure as a status observer.
    pub fn on_status_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.inner.connection.on_status_change(callback)
    }

    /// Returns a receiver for status changes.
    pub fn status_changes(&self) -> (ObserverId, mpsc::UnboundedReceiver<ConnectionStatus>) {
        let (observer, receiver) = ChannelStatusObserver::new();
        (self.add_status_observer(Arc::new(observer)), receiver)
    }

    /// Unregisters a status observer.
    pub fn remove_status_observer(&self, id: ObserverId) -> bool {
        self.inner.connection.remove_status_observer(id)
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    /// Reads node values. See [`NodeAccess::read_values`].
    pub async fn read_values(&self, node_ids: &[NodeId]) -> UaResult<Outcome<Vec<Option<Variant>>>> {
        self.inner.access.read_values(node_ids).await
    }

    /// Writes node values. See [`NodeAccess::write_values`].
    pub async fn write_values(&self, writes: &[(NodeId, Variant)]) -> UaResult<Outcome<Vec<StatusCode>>> {
        self.inner.access.write_values(writes).await
    }

    /// Builds a request using the configured subscription settings.
    pub fn subscription_request(
        &self,
        node_ids: Vec<NodeId>,
        callback: Arc<dyn SubscriptionCallback>,
    ) -> SubscriptionRequest {
        SubscriptionRequest::new(node_ids, callback).with_settings(self.configuration().subscription)
    }

    /// Creates a subscription. See [`SubscriptionManager::subscribe`].
    pub async fn subscribe(&self, request: SubscriptionRequest) -> UaResult<Outcome<SubscriptionHandle>> {
        self.inner.subscriptions.subscribe(request).await
    }

    /// Runs a logging job. See [`DataLogger::start_logging`].
    pub async fn start_logging(&self, request: DataLoggingRequest) -> UaResult<Outcome<LoggingReport>> {
        self.inner.logger.start_logging(request).await
    }

    /// Returns the statistics.
    pub fn stats(&self) -> &ClientStats {
        &self.inner.stats
    }
}

impl fmt::Debug for OpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpcClient")
            .field("endpoint", &self.configuration().endpoint_url)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_read() {
        let stats = ClientStats::new();
        stats.record_read(3, true);
        stats.record_read(2, false);

        assert_eq!(stats.reads(), 2);
        assert_eq!(stats.read_items(), 5);
        assert_eq!(stats.transport_failures(), 1);
    }

    #[test]
    fn test_stats_record_open() {
        let stats = ClientStats::new();
        stats.record_open(true);
        stats.record_open(false);

        assert_eq!(stats.opens(), 2);
        assert_eq!(stats.open_failures(), 1);
    }

    #[test]
    fn test_stats_reset() {
        let stats = ClientStats::new();
        stats.record_write(4, true);
        stats.record_notification(7);
        stats.record_subscription_created();
        stats.reset();

        assert_eq!(stats.writes(), 0);
        assert_eq!(stats.write_items(), 0);
        assert_eq!(stats.notifications_delivered(), 0);
        assert_eq!(stats.subscriptions_created(), 0);
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Connection lifecycle.
//!
//! [`ConnectionManager`] owns the configuration, picks an endpoint, and holds
//! at most one [`Channel`]. The connection status changes only in response to
//! channel lifecycle events:
//!
//! ```text
//!                  Opened
//!  Disconnected ───────────▶ Connected
//!       ▲  ▲                  │    │
//!       │  └──── Closed ──────┘    │ Faulted
//!       │                          ▼
//!       └──────── Closed ────── Faulted
//! ```
//!
//! Observers are called synchronously, in transition order, while no other
//! transition can interleave. Events raised by a channel that has since been
//! replaced are ignored.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use super::channel::{Channel, ChannelEvent, ChannelEventHandler, ProtocolStack};
use crate::config::ClientConfiguration;
use crate::error::{ConnectionError, Outcome, UaError, UaResult};
use crate::types::{
    ApplicationDescription, ConnectionStatus, EndpointDescription, SecurityPolicy, UserIdentity,
};

// =============================================================================
// Status Observers
// =============================================================================

/// Receives connection status changes.
///
/// Called synchronously from the thread that delivered the channel event, so
/// implementations must not block.
pub trait StatusObserver: Send + Sync {
    /// Called with the new status after every transition.
    fn on_status_change(&self, status: ConnectionStatus);
}

impl<F> StatusObserver for F
where
    F: Fn(ConnectionStatus) + Send + Sync,
{
    fn on_status_change(&self, status: ConnectionStatus) {
        self(status)
    }
}

/// Forwards status changes into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelStatusObserver {
    sender: mpsc::UnboundedSender<ConnectionStatus>,
}

impl ChannelStatusObserver {
    /// Creates an observer and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionStatus>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl StatusObserver for ChannelStatusObserver {
    fn on_status_change(&self, status: ConnectionStatus) {
        // Receiver dropped: nothing left to inform.
        let _ = self.sender.send(status);
    }
}

/// Identifies a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct ChannelSlot {
    generation: u64,
    channel: Arc<dyn Channel>,
    scope: CancellationToken,
}

/// State reachable from channel event handlers.
struct ConnectionShared {
    endpoint_url: String,
    status: RwLock<ConnectionStatus>,
    transition: Mutex<()>,
    selected_endpoint: RwLock<Option<EndpointDescription>>,
    channel: RwLock<Option<ChannelSlot>>,
    current_generation: AtomicU64,
    observers: RwLock<Vec<(ObserverId, Arc<dyn StatusObserver>)>>,
    next_observer_id: AtomicU64,
}

impl ConnectionShared {
    fn transition(&self, new_status: ConnectionStatus) {
        let _serialized = self.transition.lock();

        let old_status = std::mem::replace(&mut *self.status.write(), new_status);
        if old_status == new_status {
            return;
        }

        tracing::info!(
            endpoint = %self.endpoint_url,
            old_status = %old_status,
            new_status = %new_status,
            "Connection status changed"
        );

        let observers: Vec<Arc<dyn StatusObserver>> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        for observer in observers {
            observer.on_status_change(new_status);
        }
    }

    fn handle_event(&self, generation: u64, event: ChannelEvent) {
        if self.current_generation.load(Ordering::Acquire) != generation {
            tracing::debug!(
                generation,
                event = %event,
                "Ignoring event from replaced channel"
            );
            return;
        }

        match event {
            ChannelEvent::Opened => self.transition(ConnectionStatus::Connected),
            ChannelEvent::Closed => {
                self.selected_endpoint.write().take();
                if let Some(slot) = self.channel.read().as_ref() {
                    slot.scope.cancel();
                }
                self.transition(ConnectionStatus::Disconnected);
            }
            ChannelEvent::Faulted { reason } => {
                tracing::warn!(endpoint = %self.endpoint_url, reason = %reason, "Channel faulted");
                self.transition(ConnectionStatus::Faulted);
            }
        }
    }

    fn take_channel(&self) -> Option<ChannelSlot> {
        self.channel.write().take()
    }
}

/// Routes events of one channel generation back to the manager.
struct GenerationEvents {
    generation: u64,
    shared: Weak<ConnectionShared>,
}

impl ChannelEventHandler for GenerationEvents {
    fn on_event(&self, event: ChannelEvent) {
        if let Some(shared) = self.shared.upgrade() {
            shared.handle_event(self.generation, event);
        }
    }
}

// =============================================================================
// SessionLease
// =============================================================================

/// A connected channel handed to request components.
#[derive(Clone)]
pub(crate) struct SessionLease {
    pub(crate) channel: Arc<dyn Channel>,
    /// Cancelled when the channel is closed or replaced.
    pub(crate) scope: CancellationToken,
}

// =============================================================================
// ConnectionManager
// =============================================================================

/// Owns the channel and the connection status of one client.
pub struct ConnectionManager {
    config: ClientConfiguration,
    application: ApplicationDescription,
    identity: UserIdentity,
    stack: Arc<dyn ProtocolStack>,
    shared: Arc<ConnectionShared>,
    lifecycle: AsyncMutex<()>,
}

impl ConnectionManager {
    /// Initializes a manager from a validated copy of `config`.
    ///
    /// Builds the client application description and resolves the session
    /// identity. Nothing is sent to the server.
    pub fn new(config: ClientConfiguration, stack: Arc<dyn ProtocolStack>) -> UaResult<Self> {
        config.validate()?;

        let application = ApplicationDescription::client(&config.application_name);
        let identity = config.identity();

        tracing::debug!(
            endpoint = %config.endpoint_url,
            application_uri = %application.application_uri,
            identity = ?identity.token_type(),
            "Connection manager initialized"
        );

        let shared = Arc::new(ConnectionShared {
            endpoint_url: config.endpoint_url.clone(),
            status: RwLock::new(ConnectionStatus::Disconnected),
            transition: Mutex::new(()),
            selected_endpoint: RwLock::new(None),
            channel: RwLock::new(None),
            current_generation: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
        });

        Ok(Self {
            config,
            application,
            identity,
            stack,
            shared,
            lifecycle: AsyncMutex::new(()),
        })
    }

    /// Returns the configuration.
    pub fn configuration(&self) -> &ClientConfiguration {
        &self.config
    }

    /// Returns the application description presented to servers.
    pub fn application(&self) -> &ApplicationDescription {
        &self.application
    }

    /// Returns the current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.read()
    }

    /// Returns the endpoint selected by the last successful open.
    ///
    /// Cleared when the channel closes.
    pub fn selected_endpoint(&self) -> Option<EndpointDescription> {
        self.shared.selected_endpoint.read().clone()
    }

    /// Registers a status observer.
    pub fn add_status_observer(&self, observer: Arc<dyn StatusObserver>) -> ObserverId {
        let id = ObserverId(self.shared.next_observer_id.fetch_add(1, Ordering::Relaxed));
        self.shared.observers.write().push((id, observer));
        id
    }

    /// Registers a closure as a status observer.
    pub fn on_status_change<F>(&self, callback: F) -> ObserverId
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        self.add_status_observer(Arc::new(callback))
    }

    /// Removes a status observer. Returns `false` if it was not registered.
    pub fn remove_status_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.shared.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    /// Opens a channel to the configured endpoint.
    ///
    /// Discovers endpoints, selects the first one without security, creates
    /// the channel and opens it. Failures are logged and returned as
    /// [`Outcome::Failed`]; the status is left as it was. Opening a connected
    /// client does nothing.
    pub async fn open(&self) -> Outcome<()> {
        let _lifecycle = self.lifecycle.lock().await;

        if self.status().is_connected() {
            tracing::debug!(endpoint = %self.config.endpoint_url, "Already connected");
            return Outcome::Completed(());
        }

        Outcome::absorb(self.open_channel().await, "ConnectionManager::open")
    }

    async fn open_channel(&self) -> UaResult<()> {
        let url = self.config.endpoint_url.as_str();

        self.retire_channel().await;

        tracing::info!(endpoint = %url, "Opening connection");

        let endpoints = self.stack.discover_endpoints(url).await?;
        tracing::debug!(endpoint = %url, count = endpoints.len(), "Endpoints discovered");

        let endpoint = select_endpoint(&endpoints, &self.config)?;

        let generation = self.shared.current_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let events = Arc::new(GenerationEvents {
            generation,
            shared: Arc::downgrade(&self.shared),
        });

        let channel = self
            .stack
            .create_channel(&self.application, &self.identity, &endpoint, events)?;

        *self.shared.selected_endpoint.write() = Some(endpoint);
        *self.shared.channel.write() = Some(ChannelSlot {
            generation,
            channel: Arc::clone(&channel),
            scope: CancellationToken::new(),
        });

        if let Err(error) = channel.open().await {
            self.release_generation(generation);
            return Err(error);
        }

        tracing::info!(endpoint = %url, status = %self.status(), "Channel opened");
        Ok(())
    }

    /// Closes a channel left over from an earlier open, ignoring its events.
    async fn retire_channel(&self) {
        let Some(stale) = self.shared.take_channel() else {
            return;
        };

        self.shared.current_generation.fetch_add(1, Ordering::AcqRel);
        self.shared.selected_endpoint.write().take();
        stale.scope.cancel();

        if !stale.channel.is_idle() {
            tracing::debug!(generation = stale.generation, "Closing replaced channel");
            if let Err(error) = stale.channel.close().await {
                error.log("ConnectionManager::retire_channel");
            }
        }
    }

    fn release_generation(&self, generation: u64) {
        let mut slot = self.shared.channel.write();
        if slot.as_ref().map(|s| s.generation) == Some(generation) {
            if let Some(released) = slot.take() {
                released.scope.cancel();
            }
            self.shared.selected_endpoint.write().take();
        }
    }

    /// Closes the channel.
    ///
    /// Does nothing when no channel was opened or the channel is already idle.
    /// The status changes when the channel reports that it closed. If the
    /// close request fails the channel is abandoned and the status becomes
    /// Disconnected, so a later [`open`](Self::open) starts from scratch.
    pub async fn close(&self) -> Outcome<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let Some(slot) = self.shared.take_channel() else {
            tracing::debug!(endpoint = %self.config.endpoint_url, "Close without open channel");
            return Outcome::Completed(());
        };

        slot.scope.cancel();

        if slot.channel.is_idle() {
            return Outcome::Completed(());
        }

        tracing::info!(endpoint = %self.config.endpoint_url, "Closing connection");
        let result = slot.channel.close().await;
        if result.is_err() {
            self.abandon_channel(slot.generation);
        }
        Outcome::absorb(result, "ConnectionManager::close")
    }

    /// Detaches from a channel that failed to close.
    ///
    /// No Closed event will arrive for it, so the status is moved to
    /// Disconnected here and any late event from the channel is ignored.
    fn abandon_channel(&self, generation: u64) {
        let _ = self.shared.current_generation.compare_exchange(
            generation,
            generation + 1,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        self.shared.selected_endpoint.write().take();
        tracing::warn!(
            endpoint = %self.config.endpoint_url,
            generation,
            "Channel did not close cleanly, abandoning it"
        );
        self.shared.transition(ConnectionStatus::Disconnected);
    }

    /// Returns the channel if the client is connected.
    pub(crate) fn require_connected(&self) -> UaResult<SessionLease> {
        let status = self.status();
        if !status.is_connected() {
            return Err(UaError::not_connected(status));
        }

        self.shared
            .channel
            .read()
            .as_ref()
            .map(|slot| SessionLease {
                channel: Arc::clone(&slot.channel),
                scope: slot.scope.child_token(),
            })
            .ok_or_else(|| UaError::not_connected(status))
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("endpoint", &self.config.endpoint_url)
            .field("status", &self.status())
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(slot) = self.shared.channel.read().as_ref() {
            slot.scope.cancel();
        }
    }
}

// =============================================================================
// Endpoint Selection
// =============================================================================

/// Picks the endpoint to connect to.
///
/// Takes the first endpoint, in discovery order, whose security policy is
/// `None`, and points it at the configured URL. A configured certificate
/// store selects secured negotiation, which is not supported.
pub fn select_endpoint(
    endpoints: &[EndpointDescription],
    config: &ClientConfiguration,
) -> UaResult<EndpointDescription> {
    if endpoints.is_empty() {
        return Err(ConnectionError::NoEndpoints {
            endpoint: config.endpoint_url.clone(),
        }
        .into());
    }

    if let Some(store) = &config.certificate_store {
        return Err(ConnectionError::SecuredEndpointUnsupported {
            store: store.display().to_string(),
        }
        .into());
    }

    let mut endpoint = endpoints
        .iter()
        .find(|e| e.uses_policy(SecurityPolicy::None))
        .cloned()
        .ok_or_else(|| {
            ConnectionError::no_suitable_endpoint(&config.endpoint_url, SecurityPolicy::None.name())
        })?;

    if endpoint.endpoint_url != config.endpoint_url {
        tracing::debug!(
            advertised = %endpoint.endpoint_url,
            configured = %config.endpoint_url,
            "Using configured URL for selected endpoint"
        );
        endpoint.endpoint_url = config.endpoint_url.clone();
    }

    Ok(endpoint)
}

// =============================================================================
// Tests
// =============================================================================

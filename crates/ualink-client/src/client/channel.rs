// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Channel abstraction.
//!
//! The client never encodes messages or touches sockets. It is written against
//! two traits that a protocol stack implements:
//!
//! - [`ProtocolStack`] discovers endpoints and builds channels.
//! - [`Channel`] is one secure channel plus session. It carries the service
//!   calls and a broadcast stream of publish responses for every subscription
//!   on the session.
//!
//! Lifecycle changes flow back through the [`ChannelEventHandler`] handed to
//! [`ProtocolStack::create_channel`], before the channel is opened.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::UaResult;
use crate::types::{
    ApplicationDescription, AttributeId, DataValue, EndpointDescription, MonitoringMode, NodeId,
    StatusCode, UserIdentity,
};

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Discovers endpoints and constructs channels.
#[async_trait]
pub trait ProtocolStack: Send + Sync {
    /// Returns the endpoints advertised at `discovery_url`, in server order.
    async fn discover_endpoints(&self, discovery_url: &str) -> UaResult<Vec<EndpointDescription>>;

    /// Builds a channel bound to `endpoint`.
    ///
    /// The channel is not opened. `events` must receive every lifecycle change
    /// of the returned channel, starting with the open that follows.
    fn create_channel(
        &self,
        application: &ApplicationDescription,
        identity: &UserIdentity,
        endpoint: &EndpointDescription,
        events: Arc<dyn ChannelEventHandler>,
    ) -> UaResult<Arc<dyn Channel>>;
}

/// One channel to a server.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Opens the channel and activates the session.
    async fn open(&self) -> UaResult<()>;

    /// Closes the session and the channel.
    async fn close(&self) -> UaResult<()>;

    /// Returns `true` if the channel has nothing to close.
    fn is_idle(&self) -> bool;

    /// Reads attributes. Results are returned in request order.
    async fn read(&self, nodes: &[ReadValueId]) -> UaResult<Vec<DataValue>>;

    /// Writes attributes. Status codes are returned in request order.
    async fn write(&self, values: &[WriteValue]) -> UaResult<Vec<StatusCode>>;

    /// Creates a subscription.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> UaResult<CreateSubscriptionResponse>;

    /// Deletes a subscription and its monitored items.
    async fn delete_subscription(&self, subscription_id: u32) -> UaResult<()>;

    /// Creates monitored items in a subscription. Results follow request order.
    async fn create_monitored_items(
        &self,
        subscription_id: u32,
        items: &[MonitoredItemCreateRequest],
    ) -> UaResult<Vec<MonitoredItemCreateResult>>;

    /// Registers nodes for repeated access, returning server aliases in request order.
    async fn register_nodes(&self, nodes: &[NodeId]) -> UaResult<Vec<NodeId>>;

    /// Releases aliases returned by [`Channel::register_nodes`].
    async fn unregister_nodes(&self, nodes: &[NodeId]) -> UaResult<()>;

    /// Subscribes to the publish responses of every subscription on this channel.
    fn notifications(&self) -> broadcast::Receiver<PublishResponse>;
}

/// Receives channel lifecycle events.
pub trait ChannelEventHandler: Send + Sync {
    /// Called for every lifecycle change, in the order they happen.
    fn on_event(&self, event: ChannelEvent);
}

/// Channel lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The channel opened.
    Opened,
    /// The channel closed.
    Closed,
    /// The channel failed.
    Faulted {
        /// Failure description.
        reason: String,
    },
}

impl fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => f.write_str("Opened"),
            Self::Closed => f.write_str("Closed"),
            Self::Faulted { reason } => write!(f, "Faulted ({reason})"),
        }
    }
}

// =============================================================================
// Read / Write Messages
// =============================================================================

/// Identifies one attribute to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,
    /// Attribute to read.
    pub attribute_id: AttributeId,
}

impl ReadValueId {
    /// Reads the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute_id: AttributeId::Value,
        }
    }
}

/// One attribute write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteValue {
    /// Node to write.
    pub node_id: NodeId,
    /// Attribute to write.
    pub attribute_id: AttributeId,
    /// Value to write.
    pub value: DataValue,
}

// =============================================================================
// Subscription Messages
// =============================================================================

/// Parameters for a new subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    /// Requested publishing interval.
    pub requested_publishing_interval: Duration,
    /// Requested lifetime count.
    pub requested_lifetime_count: u32,
    /// Requested max keep-alive count.
    pub requested_max_keep_alive_count: u32,
    /// Maximum notifications per publish (0 = unlimited).
    pub max_notifications_per_publish: u32,
    /// Whether publishing starts enabled.
    pub publishing_enabled: bool,
    /// Relative priority.
    pub priority: u8,
}

/// Server answer to [`CreateSubscriptionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionResponse {
    /// Server-assigned subscription identity.
    pub subscription_id: u32,
    /// Publishing interval the server will use.
    pub revised_publishing_interval: Duration,
    /// Lifetime count the server will use.
    pub revised_lifetime_count: u32,
    /// Keep-alive count the server will use.
    pub revised_max_keep_alive_count: u32,
}

/// One monitored item to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItemCreateRequest {
    /// Node to monitor.
    pub node_id: NodeId,
    /// Attribute to monitor.
    pub attribute_id: AttributeId,
    /// Monitoring mode.
    pub monitoring_mode: MonitoringMode,
    /// Handle echoed back in notifications for this item.
    pub client_handle: u32,
    /// Requested sampling interval; `None` uses the publishing interval.
    pub sampling_interval: Option<Duration>,
    /// Requested queue size.
    pub queue_size: u32,
    /// Discard the oldest entry when the queue is full.
    pub discard_oldest: bool,
}

/// Server answer for one monitored item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItemCreateResult {
    /// Result of the create.
    pub status: StatusCode,
    /// Server-assigned item id.
    pub monitored_item_id: u32,
    /// Sampling interval the server will use.
    pub revised_sampling_interval: Duration,
    /// Queue size the server will use.
    pub revised_queue_size: u32,
}

// =============================================================================
// Notification Messages
// =============================================================================

/// One publish response, tagged with the subscription that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    /// Subscription this response belongs to.
    pub subscription_id: u32,
    /// Sequence number of the notification message.
    pub sequence_number: u32,
    /// When the server sent the message.
    pub publish_time: DateTime<Utc>,
    /// Notifications carried by the message. Empty for keep-alives.
    pub notifications: Vec<NotificationData>,
}

impl PublishResponse {
    /// Returns `true` for a keep-alive message.
    pub fn is_keep_alive(&self) -> bool {
        self.notifications.is_empty()
    }
}

/// A notification inside a publish response.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationData {
    /// Monitored item value changes.
    DataChange(DataChangeNotification),
    /// Subscription status change.
    StatusChange(StatusCode),
}

/// Value changes for one or more monitored items.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataChangeNotification {
    /// Changed items, in server order.
    pub monitored_items: Vec<MonitoredItemNotification>,
}

/// One value change.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    /// Client handle of the item.
    pub client_handle: u32,
    /// New value.
    pub value: DataValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_value_id_targets_value_attribute() {
        let id = ReadValueId::value(NodeId::numeric(2, 7));
        assert_eq!(id.attribute_id, AttributeId::Value);
        assert_eq!(id.attribute_id.as_u32(), 13);
    }

    #[test]
    fn test_keep_alive_detection() {
        let response = PublishResponse {
            subscription_id: 4,
            sequence_number: 1,
            publish_time: Utc::now(),
            notifications: vec![],
        };
        assert!(response.is_keep_alive());
    }

    #[test]
    fn test_channel_event_display() {
        let event = ChannelEvent::Faulted {
            reason: "socket reset".into(),
        };
        assert_eq!(event.to_string(), "Faulted (socket reset)");
    }
}

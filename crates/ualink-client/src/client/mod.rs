// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client components.
//!
//! - **Channel**: traits a protocol stack implements
//! - **Connection**: endpoint selection, channel lifecycle and status
//! - **Access**: batch read and write of node values
//! - **Subscription**: monitored items and notification routing
//! - **Data logging**: interval polling of registered nodes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          OpcClient                              │
//! └─────────────────────────────────────────────────────────────────┘
//!        │                │                   │                │
//!        ▼                ▼                   ▼                ▼
//! ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐  ┌──────────┐
//! │ Connection  │  │ NodeAccess  │  │ Subscription     │  │ Data     │
//! │ Manager     │◀─│             │  │ Manager          │  │ Logger   │
//! └─────────────┘  └─────────────┘  └──────────────────┘  └──────────┘
//!        │                 require_connected()
//!        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              ProtocolStack  ──create──▶  Channel                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod access;
pub mod channel;
mod connection;
pub mod data_logging;
pub mod subscription;
mod wrapper;

pub use access::NodeAccess;
pub use channel::{
    Channel, ChannelEvent, ChannelEventHandler, CreateSubscriptionRequest,
    CreateSubscriptionResponse, DataChangeNotification, MonitoredItemCreateRequest,
    MonitoredItemCreateResult, MonitoredItemNotification, NotificationData, ProtocolStack,
    PublishResponse, ReadValueId, WriteValue,
};
pub use connection::{
    select_endpoint, ChannelStatusObserver, ConnectionManager, ObserverId, StatusObserver,
};
pub use data_logging::{
    ChannelSink, DataLogBatch, DataLogger, DataLoggingRequest, FnSink, LogSink, LoggingReport,
};
pub use subscription::{
    BroadcastCallback, ChannelCallback, FnCallback, MonitoredItem, SubscriptionCallback,
    SubscriptionData, SubscriptionHandle, SubscriptionId, SubscriptionManager,
    SubscriptionRequest,
};
pub use wrapper::{ClientStats, OpcClient};

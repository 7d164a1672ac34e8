// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Asynchronous OPC UA client.
//!
//! `ualink-client` manages one session to an OPC UA server and offers three
//! ways to get data out of it:
//!
//! - Batch reads and writes of node values
//! - Subscriptions with per-subscription callbacks
//! - Interval polling ("data logging") of a registered node set
//!
//! The crate does not encode messages itself. A [`client::ProtocolStack`]
//! supplies endpoint discovery and [`client::Channel`]s.
//!
//! # Error Handling
//!
//! ```text
//! UaError
//! ├── Precondition  - Operation requires a connected client
//! ├── Connection    - Endpoint selection and channel creation
//! ├── Transport     - Service call failures (absorbed as Outcome::Failed)
//! ├── Subscription  - Monitored item mismatches
//! └── Configuration - Invalid settings and requests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ualink_client::{NodeId, OpcClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (client, opened) = OpcClient::start("192.168.0.10", stack).await?;
//!     opened.into_result()?;
//!
//!     let values = client
//!         .read_values(&["ns=2;s=Temperature".parse::<NodeId>()?])
//!         .await?
//!         .into_result()?;
//!     println!("Temperature: {:?}", values[0]);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use error::{
    ConfigurationError, ConnectionError, ErrorCode, ErrorSeverity, Outcome, PreconditionError,
    SubscriptionError, TransportError, UaError, UaResult,
};

pub use types::{
    ApplicationDescription, ApplicationType, AttributeId, ConnectionStatus, DataValue,
    EndpointDescription, MessageSecurityMode, MonitoringMode, NodeId, NodeIdentifier,
    SecurityPolicy, StatusCode, UserIdentity, UserTokenType, Variant,
};

pub use config::{
    ClientConfiguration, ClientConfigurationBuilder, ConfigFormat, ConfigLoader,
    SubscriptionSettings, UserCredentials,
};

pub use client::{
    ClientStats, DataLoggingRequest, LoggingReport, OpcClient, SubscriptionCallback,
    SubscriptionData, SubscriptionHandle, SubscriptionId, SubscriptionRequest,
};

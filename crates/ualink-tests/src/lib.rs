// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ualink Integration Tests
//!
//! Test support for `ualink-client` and the integration suites that use it.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ualink-tests
//!
//! cargo test -p ualink-tests --test integration_connection
//! cargo test -p ualink-tests --test integration_access
//! cargo test -p ualink-tests --test integration_subscription
//! cargo test -p ualink-tests --test integration_data_logging
//! cargo test -p ualink-tests --test integration_config
//! ```
//!
//! ## Writing New Tests
//!
//! ```rust,ignore
//! use ualink_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let fixture = ClientFixture::connected().await;
//!     fixture.server().set_value(NodeFixtures::temperature(), 30.0f64);
//!     // ... test logic
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::init_test_logging;
    pub use crate::common::mocks::*;
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Assertion helpers with informative failure messages.

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use ualink_client::{Outcome, UaError, UaResult};

// =============================================================================
// Outcome Assertions
// =============================================================================

/// Assertion extensions for [`Outcome`].
pub trait OutcomeAssertions<T> {
    /// Asserts completion and returns the value.
    fn assert_completed(self) -> T;

    /// Asserts failure and returns the error.
    fn assert_failed(self) -> UaError;
}

impl<T: Debug> OutcomeAssertions<T> for Outcome<T> {
    fn assert_completed(self) -> T {
        match self {
            Outcome::Completed(value) => value,
            Outcome::Failed(error) => panic!("Expected Completed, got Failed({error})"),
        }
    }

    fn assert_failed(self) -> UaError {
        match self {
            Outcome::Failed(error) => error,
            Outcome::Completed(value) => panic!("Expected Failed, got Completed({value:?})"),
        }
    }
}

// =============================================================================
// Error Assertions
// =============================================================================

/// Asserts `result` is a not-connected precondition error.
pub fn assert_not_connected<T: Debug>(result: UaResult<T>) {
    match result {
        Err(UaError::Precondition(_)) => {}
        Err(other) => panic!("Expected precondition error, got {other}"),
        Ok(value) => panic!("Expected precondition error, got Ok({value:?})"),
    }
}

/// Asserts `result` is a configuration error.
pub fn assert_configuration_error<T: Debug>(result: UaResult<T>) -> UaError {
    match result {
        Err(error @ UaError::Configuration(_)) => error,
        Err(other) => panic!("Expected configuration error, got {other}"),
        Ok(value) => panic!("Expected configuration error, got Ok({value:?})"),
    }
}

// =============================================================================
// Async Assertions
// =============================================================================

/// Polls `condition` until it holds or `timeout` passes.
pub async fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

/// Asserts `future` completes within `timeout` and returns its output.
pub async fn assert_completes_within<F: Future>(timeout: Duration, future: F) -> F::Output {
    match tokio::time::timeout(timeout, future).await {
        Ok(output) => output,
        Err(_) => panic!("Future did not complete within {timeout:?}"),
    }
}

/// Asserts nothing arrives on `receiver` within `wait`.
pub async fn assert_no_message<T: Debug>(receiver: &mut tokio::sync::mpsc::Receiver<T>, wait: Duration) {
    if let Ok(Some(message)) = tokio::time::timeout(wait, receiver.recv()).await {
        panic!("Expected no message, got {message:?}");
    }
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the ualink client.
//!
//! Errors are split by the boundary that produces them:
//!
//! ```text
//! UaError
//! ├── Precondition  - Operation attempted while not connected (propagated)
//! ├── Connection    - Endpoint discovery and selection failures (absorbed by open)
//! ├── Transport     - Service call and channel failures (absorbed into Outcome)
//! ├── Subscription  - Subscription / monitored item failures
//! └── Configuration - Invalid settings or requests (propagated)
//! ```
//!
//! Operations that talk to the server return `UaResult<Outcome<T>>`. The outer
//! `Result` carries failures the caller must fix (precondition and configuration
//! errors). The inner [`Outcome`] carries transport failures that were caught and
//! logged at the call boundary, so a failed read is never mistaken for an empty one.
//!
//! # Examples
//!
//! ```
//! use ualink_client::error::{PreconditionError, UaError, ErrorSeverity};
//! use ualink_client::types::ConnectionStatus;
//!
//! let error = UaError::not_connected(ConnectionStatus::Disconnected);
//! assert_eq!(error.category(), "precondition");
//! assert_eq!(error.severity(), ErrorSeverity::Warning);
//! assert!(matches!(error, UaError::Precondition(PreconditionError::NotConnected { .. })));
//! ```

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use crate::types::{ConnectionStatus, StatusCode};

// =============================================================================
// UaError - Main Error Type
// =============================================================================

/// The main error type for client operations.
#[derive(Debug, Error)]
pub enum UaError {
    /// The client was not in the state the operation requires.
    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    /// Endpoint discovery or selection failed.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// A service call or the channel itself failed.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Subscription or monitored item errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Invalid configuration or request parameters.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl UaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a not-connected precondition error.
    #[inline]
    pub fn not_connected(status: ConnectionStatus) -> Self {
        Self::Precondition(PreconditionError::NotConnected { status })
    }

    /// Creates a service fault error.
    #[inline]
    pub fn service_fault(service: &'static str, status: StatusCode) -> Self {
        Self::Transport(TransportError::service_fault(service, status))
    }

    /// Creates a channel closed error.
    #[inline]
    pub fn channel_closed(reason: impl Into<String>) -> Self {
        Self::Transport(TransportError::ChannelClosed {
            reason: Some(reason.into()),
        })
    }

    /// Creates a configuration error for an invalid field value.
    #[inline]
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::invalid_value(field, reason))
    }

    // =========================================================================
    // Error Classification
    // =========================================================================

    /// Returns `true` if this error came from the channel or a service call.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if the same call may succeed later without changes.
    ///
    /// The client never retries on its own; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Precondition(_) => true,
            Self::Connection(e) => e.is_retryable(),
            Self::Transport(e) => e.is_retryable(),
            Self::Subscription(_) => false,
            Self::Configuration(_) => false,
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Precondition(_) => ErrorSeverity::Warning,
            Self::Connection(e) => e.severity(),
            Self::Transport(e) => e.severity(),
            Self::Subscription(_) => ErrorSeverity::Error,
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "precondition",
            Self::Connection(_) => "connection",
            Self::Transport(_) => "transport",
            Self::Subscription(_) => "subscription",
            Self::Configuration(_) => "configuration",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Precondition(e) => e.error_code(),
            Self::Connection(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Subscription(e) => e.error_code(),
            Self::Configuration(e) => e.error_code(),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Precondition(_) => vec![
                "Call open() and wait for the Connected status",
                "Register a status observer to learn when the channel drops",
            ],
            Self::Connection(e) => e.recovery_hints(),
            Self::Transport(e) => e.recovery_hints(),
            Self::Subscription(e) => e.recovery_hints(),
            Self::Configuration(e) => e.recovery_hints(),
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// PreconditionError
// =============================================================================

/// Raised when an operation needs a state the client is not in.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// The operation requires a connected client.
    #[error("Client is not connected (status: {status})")]
    NotConnected {
        /// Status at the time of the call.
        status: ConnectionStatus,
    },
}

impl PreconditionError {
    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected { .. } => ErrorCode::new(1, 1),
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Errors raised while selecting an endpoint and establishing the channel.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Discovery returned no endpoints at all.
    #[error("Server at '{endpoint}' advertised no endpoints")]
    NoEndpoints {
        /// Discovery URL.
        endpoint: String,
    },

    /// No advertised endpoint matched the required security policy.
    #[error("No endpoint at '{endpoint}' uses security policy '{policy}'")]
    NoSuitableEndpoint {
        /// Discovery URL.
        endpoint: String,
        /// Required policy.
        policy: String,
    },

    /// A certificate store was configured; secured negotiation is not available.
    #[error("Secured endpoint negotiation is not supported (certificate store '{store}')")]
    SecuredEndpointUnsupported {
        /// The configured store path.
        store: String,
    },

    /// The protocol stack refused to build a channel.
    #[error("Failed to create channel to '{endpoint}': {message}")]
    ChannelCreation {
        /// Target endpoint.
        endpoint: String,
        /// Failure description.
        message: String,
    },
}

impl ConnectionError {
    /// Creates a no-suitable-endpoint error.
    pub fn no_suitable_endpoint(endpoint: impl Into<String>, policy: impl Into<String>) -> Self {
        Self::NoSuitableEndpoint {
            endpoint: endpoint.into(),
            policy: policy.into(),
        }
    }

    /// Creates a channel creation error.
    pub fn channel_creation(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ChannelCreation {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoEndpoints { .. } | Self::ChannelCreation { .. })
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoEndpoints { .. } | Self::ChannelCreation { .. } => ErrorSeverity::Warning,
            Self::NoSuitableEndpoint { .. } | Self::SecuredEndpointUnsupported { .. } => {
                ErrorSeverity::Error
            }
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NoEndpoints { .. } => ErrorCode::new(2, 1),
            Self::NoSuitableEndpoint { .. } => ErrorCode::new(2, 2),
            Self::SecuredEndpointUnsupported { .. } => ErrorCode::new(2, 3),
            Self::ChannelCreation { .. } => ErrorCode::new(2, 4),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NoEndpoints { .. } => vec![
                "Verify the OPC UA server is running",
                "Check the discovery URL and port",
            ],
            Self::NoSuitableEndpoint { .. } => vec![
                "Enable an endpoint with security policy None on the server",
            ],
            Self::SecuredEndpointUnsupported { .. } => vec![
                "Remove the certificate store from the configuration",
            ],
            Self::ChannelCreation { .. } => vec![
                "Check the server address is reachable",
                "Check the user identity is accepted by the endpoint",
            ],
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Errors raised by the channel or by individual service calls.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered the service call with a bad service result.
    #[error("{service} failed with {status}")]
    ServiceFault {
        /// Service name (Read, Write, CreateSubscription, ...).
        service: &'static str,
        /// Service result.
        status: StatusCode,
    },

    /// The channel is closed or was closed during the call.
    #[error("Channel closed{}", reason.as_ref().map(|r| format!(": {r}")).unwrap_or_default())]
    ChannelClosed {
        /// Reason for closure.
        reason: Option<String>,
    },

    /// The call did not complete in time.
    #[error("{service} timed out after {duration:?}")]
    Timeout {
        /// Service name.
        service: &'static str,
        /// Elapsed time.
        duration: Duration,
    },

    /// Endpoint discovery failed.
    #[error("Endpoint discovery at '{endpoint}' failed: {message}")]
    Discovery {
        /// Discovery URL.
        endpoint: String,
        /// Failure description.
        message: String,
    },

    /// The response did not match the request.
    #[error("{service} returned {actual} results for {expected} requested items")]
    ResponseMismatch {
        /// Service name.
        service: &'static str,
        /// Requested item count.
        expected: usize,
        /// Returned item count.
        actual: usize,
    },

    /// Underlying socket I/O failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Creates a service fault error.
    pub fn service_fault(service: &'static str, status: StatusCode) -> Self {
        Self::ServiceFault { service, status }
    }

    /// Creates a discovery error.
    pub fn discovery(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Discovery {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a response mismatch error.
    pub fn response_mismatch(service: &'static str, expected: usize, actual: usize) -> Self {
        Self::ResponseMismatch {
            service,
            expected,
            actual,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ResponseMismatch { .. })
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } | Self::ChannelClosed { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ServiceFault { .. } => ErrorCode::new(3, 1),
            Self::ChannelClosed { .. } => ErrorCode::new(3, 2),
            Self::Timeout { .. } => ErrorCode::new(3, 3),
            Self::Discovery { .. } => ErrorCode::new(3, 4),
            Self::ResponseMismatch { .. } => ErrorCode::new(3, 5),
            Self::Io { .. } => ErrorCode::new(3, 6),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::ServiceFault { .. } => vec!["Check the server diagnostics for the status code"],
            Self::ChannelClosed { .. } => vec!["Reopen the client"],
            Self::Timeout { .. } => vec!["Check network latency", "Reduce the batch size"],
            Self::Discovery { .. } => vec![
                "Verify the OPC UA server is running",
                "Check firewall settings for port 4840",
            ],
            Self::ResponseMismatch { .. } => vec!["Report the server behaviour to its vendor"],
            Self::Io { .. } => vec!["Check network connectivity"],
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
            source: error,
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription and monitored item errors.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The server created a different number of monitored items than requested.
    #[error("Subscription {subscription_id}: requested {requested} monitored items, server returned {returned}")]
    MonitoredItemCountMismatch {
        /// Server-assigned subscription id.
        subscription_id: u32,
        /// Items requested.
        requested: usize,
        /// Items returned.
        returned: usize,
    },

    /// Subscription not known to the server.
    #[error("Subscription {subscription_id} not found")]
    NotFound {
        /// Subscription id.
        subscription_id: u32,
    },
}

impl SubscriptionError {
    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MonitoredItemCountMismatch { .. } => ErrorCode::new(4, 1),
            Self::NotFound { .. } => ErrorCode::new(4, 2),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::MonitoredItemCountMismatch { .. } => vec![
                "Check the server's monitored item limits",
            ],
            Self::NotFound { .. } => vec!["The subscription may have expired; subscribe again"],
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration and request validation errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint {
        /// The URL.
        url: String,
        /// Reason.
        reason: String,
    },

    /// Invalid node identifier.
    #[error("Invalid node ID '{node_id}': {reason}")]
    InvalidNodeId {
        /// The node id text.
        node_id: String,
        /// Reason.
        reason: String,
    },

    /// A field holds an unusable value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Reason.
        reason: String,
    },

    /// Node registration produced no usable handles.
    #[error("No nodes registered for data logging ({requested} requested)")]
    NoRegisteredNodes {
        /// Number of node ids requested.
        requested: usize,
    },

    /// Configuration file not found.
    #[error("Configuration file not found: {}", path.display())]
    FileNotFound {
        /// File path.
        path: PathBuf,
    },

    /// Configuration content could not be parsed.
    #[error("Failed to parse {format} configuration: {message}")]
    Parse {
        /// Format name.
        format: &'static str,
        /// Parser message.
        message: String,
    },

    /// Configuration file extension not recognised.
    #[error("Unsupported configuration format: '{extension}'")]
    UnsupportedFormat {
        /// The extension.
        extension: String,
    },

    /// A `${VAR}` placeholder referenced an unset variable with no default.
    #[error("Environment variable not set: {name}")]
    EnvVarNotFound {
        /// Variable name.
        name: String,
    },
}

impl ConfigurationError {
    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid node ID error.
    pub fn invalid_node_id(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingField { .. } => ErrorCode::new(5, 1),
            Self::InvalidEndpoint { .. } => ErrorCode::new(5, 2),
            Self::InvalidNodeId { .. } => ErrorCode::new(5, 3),
            Self::InvalidValue { .. } => ErrorCode::new(5, 4),
            Self::NoRegisteredNodes { .. } => ErrorCode::new(5, 5),
            Self::FileNotFound { .. } => ErrorCode::new(5, 6),
            Self::Parse { .. } => ErrorCode::new(5, 7),
            Self::UnsupportedFormat { .. } => ErrorCode::new(5, 8),
            Self::EnvVarNotFound { .. } => ErrorCode::new(5, 9),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::MissingField { .. } => vec!["Add the missing field to the configuration"],
            Self::InvalidEndpoint { .. } => vec![
                "Endpoint URL must use the form opc.tcp://host:port",
            ],
            Self::InvalidNodeId { .. } => vec![
                "Use the format ns=<index>;<type>=<value>",
                "Valid types: i (numeric), s (string), g (guid), b (opaque)",
            ],
            Self::InvalidValue { .. } => vec!["Check the value against the documented range"],
            Self::NoRegisteredNodes { .. } => vec![
                "Pass at least one node to data logging",
                "Check the nodes exist on the server",
            ],
            Self::FileNotFound { .. } => vec!["Check the configuration file path"],
            Self::Parse { .. } => vec!["Check the file syntax"],
            Self::UnsupportedFormat { .. } => vec!["Use a .yaml, .yml, .toml or .json file"],
            Self::EnvVarNotFound { .. } => vec![
                "Set the variable or give the placeholder a default: ${VAR:default}",
            ],
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Precondition
/// - 2: Connection
/// - 3: Transport
/// - 4: Subscription
/// - 5: Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-5).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// A Result type with UaError.
pub type UaResult<T> = Result<T, UaError>;

/// Result of a call whose transport failures were absorbed at the boundary.
///
/// `Failed` means the call reached the channel and the channel or server failed;
/// the error has already been logged. `Completed` carries the real result, which
/// may legitimately be empty.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call completed.
    Completed(T),
    /// The call failed after it was issued.
    Failed(UaError),
}

impl<T> Outcome<T> {
    /// Converts a result into an outcome, logging the error under `context`.
    pub fn absorb(result: UaResult<T>, context: &str) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(error) => {
                error.log(context);
                Self::Failed(error)
            }
        }
    }

    /// Returns `true` if the call completed.
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Returns `true` if the call failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns the completed value, discarding any failure.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Returns a reference to the completed value.
    pub fn as_completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Returns the failure, if any.
    pub fn failure(&self) -> Option<&UaError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(error) => Some(error),
        }
    }

    /// Maps the completed value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Failed(error) => Outcome::Failed(error),
        }
    }

    /// Converts back into a plain result.
    pub fn into_result(self) -> UaResult<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed(error) => Err(error),
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Returns the completed value or `T::default()` on failure.
    pub fn unwrap_or_default(self) -> T {
        self.completed().unwrap_or_default()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        let code = ErrorCode::new(3, 5);
        assert_eq!(code.to_string(), "UA-0305");
        assert_eq!(code.as_u16(), 0x0305);
    }

    #[test]
    fn test_not_connected_is_precondition() {
        let error = UaError::not_connected(ConnectionStatus::Faulted);
        assert_eq!(error.category(), "precondition");
        assert!(error.to_string().contains("Faulted"));
        assert_eq!(error.error_code().to_string(), "UA-0101");
        assert!(!error.is_transport());
    }

    #[test]
    fn test_transport_severity() {
        let closed = UaError::channel_closed("server shutdown");
        assert_eq!(closed.severity(), ErrorSeverity::Warning);
        assert!(closed.to_string().contains("server shutdown"));

        let fault = UaError::service_fault("Read", StatusCode::BAD_TIMEOUT);
        assert_eq!(fault.severity(), ErrorSeverity::Error);
        assert!(fault.to_string().contains("Read"));
        assert!(fault.is_transport());
    }

    #[test]
    fn test_configuration_is_critical() {
        let error: UaError = ConfigurationError::NoRegisteredNodes { requested: 0 }.into();
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(!error.is_retryable());
        assert!(error.recovery_hints().iter().any(|h| h.contains("at least one node")));
    }

    #[test]
    fn test_connection_hints() {
        let error = ConnectionError::no_suitable_endpoint("opc.tcp://plc:4840", "None");
        assert!(error.to_string().contains("opc.tcp://plc:4840"));
        assert!(!error.recovery_hints().is_empty());
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_response_mismatch_message() {
        let error = TransportError::response_mismatch("Read", 3, 2);
        assert_eq!(error.to_string(), "Read returned 2 results for 3 requested items");
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_outcome_accessors() {
        let ok: Outcome<Vec<u32>> = Outcome::Completed(vec![]);
        assert!(ok.is_completed());
        assert_eq!(ok.as_completed(), Some(&vec![]));

        let failed: Outcome<Vec<u32>> = Outcome::absorb(
            Err(UaError::channel_closed("test")),
            "test_outcome_accessors",
        );
        assert!(failed.is_failed());
        assert!(failed.failure().map(UaError::is_transport).unwrap_or(false));
        assert!(failed.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_outcome_map_and_into_result() {
        let outcome = Outcome::Completed(2).map(|v| v * 10);
        assert_eq!(outcome.into_result().unwrap(), 20);

        let failed: Outcome<i32> = Outcome::Failed(UaError::not_connected(ConnectionStatus::Disconnected));
        assert!(failed.into_result().is_err());
    }
}

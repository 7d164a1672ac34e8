// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol value types shared by every client component.
//!
//! - **NodeId**: the four node identifier kinds with `ns=..;i=..` parsing
//! - **Variant / DataValue / StatusCode**: attribute values as read or notified
//! - **EndpointDescription / ApplicationDescription**: discovery descriptors
//! - **UserIdentity**: anonymous or username session identity
//! - **ConnectionStatus**: the client's authoritative connection state
//!
//! # Examples
//!
//! ```
//! use ualink_client::types::{NodeId, StatusCode};
//!
//! let node: NodeId = "ns=2;s=Line1.Temperature".parse().unwrap();
//! assert_eq!(node, NodeId::string(2, "Line1.Temperature"));
//! assert!(StatusCode::GOOD.is_good());
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, UaError};

// =============================================================================
// NodeId
// =============================================================================

/// Identifies a node in the server address space.
///
/// # Examples
///
/// ```
/// use ualink_client::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// assert_eq!(numeric.to_string(), "ns=2;i=1001");
///
/// let parsed: NodeId = "i=2258".parse().unwrap();
/// assert_eq!(parsed.namespace_index, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Creates the null node ID (ns=0, i=0).
    #[inline]
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    /// Server status current time (ns=0, i=2258).
    pub const SERVER_CURRENT_TIME: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(2258),
    };

    /// Server status state (ns=0, i=2259).
    pub const SERVER_STATE: NodeId = NodeId {
        namespace_index: 0,
        identifier: NodeIdentifier::Numeric(2259),
    };

    /// Returns `true` if this is the null node ID.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns the numeric identifier, if numeric.
    pub fn as_numeric(&self) -> Option<u32> {
        match self.identifier {
            NodeIdentifier::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the string identifier, if string.
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Formats as `ns=<namespace>;{i|s|g|b}=<identifier>`, omitting `ns=0`.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = UaError;

    /// Parses `ns=2;i=1001`, `ns=2;s=Name`, `ns=2;g=<uuid>`, `ns=2;b=<base64>`,
    /// or the same forms without `ns=` for namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| UaError::from(ConfigurationError::invalid_node_id(s, reason));

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("missing identifier after namespace".into()))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| invalid(format!("invalid namespace index '{ns}'")))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            id.parse()
                .map(NodeIdentifier::Numeric)
                .map_err(|_| invalid("invalid numeric identifier".into()))?
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            if id.is_empty() {
                return Err(invalid("empty string identifier".into()));
            }
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(NodeIdentifier::Guid)
                .map_err(|e| invalid(format!("invalid GUID: {e}")))?
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(NodeIdentifier::Opaque)
                .map_err(|e| invalid(format!("invalid base64: {e}")))?
        } else {
            return Err(invalid("expected i=, s=, g= or b=".into()));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

/// Node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque byte string identifier.
    Opaque(Vec<u8>),
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={v}"),
            Self::String(v) => write!(f, "s={v}"),
            Self::Guid(v) => write!(f, "g={v}"),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    /// Boolean value.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit double.
    Double(f64),
    /// String value.
    String(String),
    /// Date/time value.
    DateTime(DateTime<Utc>),
    /// GUID value.
    Guid(Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// Array of values.
    Array(Vec<Variant>),
    /// Empty value.
    #[default]
    Empty,
}

impl Variant {
    /// Returns the built-in type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::ByteString(_) => "ByteString",
            Self::Array(_) => "Array",
            Self::Empty => "Empty",
        }
    }

    /// Returns `true` if this is the empty variant.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Attempts to get the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::SByte(v) => Some(*v as i64),
            Self::Byte(v) => Some(*v as i64),
            Self::Int16(v) => Some(*v as i64),
            Self::UInt16(v) => Some(*v as i64),
            Self::Int32(v) => Some(*v as i64),
            Self::UInt32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Attempts to get the value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(v) => write!(f, "{v}"),
            Self::SByte(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{v}"),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
            Self::Empty => f.write_str("empty"),
        }
    }
}

macro_rules! variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

variant_from! {
    bool => Boolean,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// A 32-bit protocol status code.
///
/// The top two bits carry severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: Self = Self(0x0000_0000);
    /// Uncertain, no further detail.
    pub const UNCERTAIN: Self = Self(0x4000_0000);
    /// Bad, no further detail.
    pub const BAD: Self = Self(0x8000_0000);
    /// BadUnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// BadCommunicationError.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// BadTimeout.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// BadServiceUnsupported.
    pub const BAD_SERVICE_UNSUPPORTED: Self = Self(0x800B_0000);
    /// BadServerNotConnected.
    pub const BAD_SERVER_NOT_CONNECTED: Self = Self(0x800D_0000);
    /// BadNothingToDo.
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    /// BadTooManyOperations.
    pub const BAD_TOO_MANY_OPERATIONS: Self = Self(0x8010_0000);
    /// BadSessionClosed.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// BadNodeIdInvalid.
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    /// BadNodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// BadAttributeIdInvalid.
    pub const BAD_ATTRIBUTE_ID_INVALID: Self = Self(0x8035_0000);
    /// BadNotReadable.
    pub const BAD_NOT_READABLE: Self = Self(0x803A_0000);
    /// BadNotWritable.
    pub const BAD_NOT_WRITABLE: Self = Self(0x803B_0000);
    /// BadOutOfRange.
    pub const BAD_OUT_OF_RANGE: Self = Self(0x803C_0000);
    /// BadMonitoredItemIdInvalid.
    pub const BAD_MONITORED_ITEM_ID_INVALID: Self = Self(0x8042_0000);
    /// BadSubscriptionIdInvalid.
    pub const BAD_SUBSCRIPTION_ID_INVALID: Self = Self(0x8028_0000);
    /// BadTypeMismatch.
    pub const BAD_TYPE_MISMATCH: Self = Self(0x8074_0000);

    /// Returns the raw code.
    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the severity is good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name of well-known codes.
    pub fn name(&self) -> &'static str {
        match *self {
            Self::GOOD => "Good",
            Self::UNCERTAIN => "Uncertain",
            Self::BAD => "Bad",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_INTERNAL_ERROR => "BadInternalError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            Self::BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            Self::BAD_NOT_READABLE => "BadNotReadable",
            Self::BAD_NOT_WRITABLE => "BadNotWritable",
            Self::BAD_OUT_OF_RANGE => "BadOutOfRange",
            Self::BAD_MONITORED_ITEM_ID_INVALID => "BadMonitoredItemIdInvalid",
            Self::BAD_SUBSCRIPTION_ID_INVALID => "BadSubscriptionIdInvalid",
            Self::BAD_TYPE_MISMATCH => "BadTypeMismatch",
            code if code.is_good() => "Good",
            code if code.is_uncertain() => "Uncertain",
            _ => "Bad",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value together with its quality and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    /// The value, if the server returned one.
    pub value: Option<Variant>,

    /// Quality of the value.
    pub status: StatusCode,

    /// When the source produced the value.
    pub source_timestamp: Option<DateTime<Utc>>,

    /// When the server observed the value.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good data value stamped now.
    pub fn good(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            value: Some(value.into()),
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a value-less data value with the given status.
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            value: None,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Returns the value only when the status is good.
    pub fn good_value(&self) -> Option<&Variant> {
        if self.status.is_good() {
            self.value.as_ref()
        } else {
            None
        }
    }

    /// Consumes self, returning the value only when the status is good.
    pub fn into_good_value(self) -> Option<Variant> {
        if self.status.is_good() {
            self.value
        } else {
            None
        }
    }
}

// =============================================================================
// Enumerations
// =============================================================================

/// Node attribute identifiers used by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u32)]
pub enum AttributeId {
    /// NodeId attribute.
    NodeId = 1,
    /// BrowseName attribute.
    BrowseName = 3,
    /// DisplayName attribute.
    DisplayName = 4,
    /// Value attribute.
    #[default]
    Value = 13,
    /// DataType attribute.
    DataType = 14,
}

impl AttributeId {
    /// Returns the numeric attribute id.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Monitoring mode of a monitored item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringMode {
    /// Not sampled, not reported.
    Disabled,
    /// Sampled, queued, not reported.
    Sampling,
    /// Sampled and reported.
    #[default]
    Reporting,
}

/// Message security applied by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageSecurityMode {
    /// No security.
    #[default]
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

impl fmt::Display for MessageSecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Sign => f.write_str("Sign"),
            Self::SignAndEncrypt => f.write_str("SignAndEncrypt"),
        }
    }
}

// =============================================================================
// SecurityPolicy
// =============================================================================

/// Endpoint security policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security.
    #[default]
    None,
    /// Basic128Rsa15 (deprecated).
    Basic128Rsa15,
    /// Basic256 (deprecated).
    Basic256,
    /// Basic256Sha256.
    Basic256Sha256,
    /// Aes128_Sha256_RsaOaep.
    Aes128Sha256RsaOaep,
    /// Aes256_Sha256_RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the policy URI.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Returns the short name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128Sha256RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256Sha256RsaPss",
        }
    }

    /// Parses a policy URI, matching on the fragment after `#`.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri.rsplit_once('#').map(|(_, fragment)| fragment)? {
            "None" => Some(Self::None),
            "Basic128Rsa15" => Some(Self::Basic128Rsa15),
            "Basic256" => Some(Self::Basic256),
            "Basic256Sha256" => Some(Self::Basic256Sha256),
            "Aes128_Sha256_RsaOaep" => Some(Self::Aes128Sha256RsaOaep),
            "Aes256_Sha256_RsaPss" => Some(Self::Aes256Sha256RsaPss),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Descriptors
// =============================================================================

/// Kind of application described by an [`ApplicationDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    /// A server.
    Server,
    /// A client.
    #[default]
    Client,
    /// Both client and server.
    ClientAndServer,
    /// A discovery server.
    DiscoveryServer,
}

/// Describes an application to its peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDescription {
    /// Human-readable application name.
    pub application_name: String,
    /// Globally unique application URI.
    pub application_uri: String,
    /// Application kind.
    pub application_type: ApplicationType,
}

impl ApplicationDescription {
    /// Describes a client application named `name`.
    ///
    /// The URI is `urn:ualink:<name without whitespace>`.
    pub fn client(name: impl Into<String>) -> Self {
        let application_name = name.into();
        let compact: String = application_name.split_whitespace().collect();
        Self {
            application_uri: format!("urn:ualink:{compact}"),
            application_name,
            application_type: ApplicationType::Client,
        }
    }
}

/// User token kinds an endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserTokenType {
    /// Anonymous.
    Anonymous,
    /// Username and password.
    UserName,
    /// X.509 certificate.
    Certificate,
    /// Externally issued token.
    IssuedToken,
}

/// A server endpoint as returned by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescription {
    /// URL the endpoint listens on.
    pub endpoint_url: String,
    /// Security policy URI.
    pub security_policy_uri: String,
    /// Message security mode.
    pub security_mode: MessageSecurityMode,
    /// Accepted user token kinds.
    pub user_token_types: Vec<UserTokenType>,
    /// Relative security level advertised by the server.
    pub security_level: u8,
    /// The server application.
    pub server: ApplicationDescription,
}

impl EndpointDescription {
    /// Returns the parsed security policy, if known.
    pub fn security_policy(&self) -> Option<SecurityPolicy> {
        SecurityPolicy::from_uri(&self.security_policy_uri)
    }

    /// Returns `true` if the endpoint uses the given policy.
    pub fn uses_policy(&self, policy: SecurityPolicy) -> bool {
        self.security_policy_uri == policy.uri()
    }
}

// =============================================================================
// UserIdentity
// =============================================================================

/// Identity presented when the session is activated.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum UserIdentity {
    /// Anonymous identity.
    #[default]
    Anonymous,
    /// Username and password.
    UserName {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

impl UserIdentity {
    /// Returns the token type this identity presents.
    pub fn token_type(&self) -> UserTokenType {
        match self {
            Self::Anonymous => UserTokenType::Anonymous,
            Self::UserName { .. } => UserTokenType::UserName,
        }
    }

    /// Returns `true` for the anonymous identity.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// =============================================================================
// ConnectionStatus
// =============================================================================

/// Connection status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No open channel.
    #[default]
    Disconnected,
    /// Channel open and usable.
    Connected,
    /// Channel reported a fault.
    Faulted,
}

impl ConnectionStatus {
    /// Returns `true` if connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if faulted.
    #[inline]
    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connected => f.write_str("Connected"),
            Self::Faulted => f.write_str("Faulted"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

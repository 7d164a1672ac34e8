// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built endpoints, configurations, nodes and clients.

use std::sync::Arc;

use ualink_client::{
    ApplicationDescription, ApplicationType, ClientConfiguration, EndpointDescription,
    MessageSecurityMode, NodeId, OpcClient, SecurityPolicy, UserTokenType,
};

use super::mocks::{SimulatedServer, SimulatedStack};

/// Endpoint URL used by default configurations.
pub const TEST_ENDPOINT: &str = "opc.tcp://127.0.0.1:4840";

/// Host the simulated server advertises in discovery.
pub const ADVERTISED_HOST_URL: &str = "opc.tcp://plc-internal.local:4840";

// =============================================================================
// Endpoint Fixtures
// =============================================================================

/// Endpoint descriptions as a server would advertise them.
pub struct EndpointFixtures;

impl EndpointFixtures {
    fn server() -> ApplicationDescription {
        ApplicationDescription {
            application_name: "Simulated Server".to_string(),
            application_uri: "urn:simulated:server".to_string(),
            application_type: ApplicationType::Server,
        }
    }

    /// An endpoint without security.
    pub fn unsecured(url: &str) -> EndpointDescription {
        EndpointDescription {
            endpoint_url: url.to_string(),
            security_policy_uri: SecurityPolicy::None.uri().to_string(),
            security_mode: MessageSecurityMode::None,
            user_token_types: vec![UserTokenType::Anonymous, UserTokenType::UserName],
            security_level: 0,
            server: Self::server(),
        }
    }

    /// An endpoint with Basic256Sha256 / SignAndEncrypt.
    pub fn secured(url: &str) -> EndpointDescription {
        EndpointDescription {
            endpoint_url: url.to_string(),
            security_policy_uri: SecurityPolicy::Basic256Sha256.uri().to_string(),
            security_mode: MessageSecurityMode::SignAndEncrypt,
            user_token_types: vec![UserTokenType::UserName, UserTokenType::Certificate],
            security_level: 3,
            server: Self::server(),
        }
    }

    /// A secured endpoint followed by an unsecured one, both on the advertised host.
    pub fn mixed() -> Vec<EndpointDescription> {
        vec![
            Self::secured(ADVERTISED_HOST_URL),
            Self::unsecured(ADVERTISED_HOST_URL),
        ]
    }

    /// Secured endpoints only.
    pub fn secured_only() -> Vec<EndpointDescription> {
        vec![Self::secured(ADVERTISED_HOST_URL)]
    }
}

// =============================================================================
// Configuration Fixtures
// =============================================================================

/// Client configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Anonymous configuration for [`TEST_ENDPOINT`].
    pub fn anonymous() -> ClientConfiguration {
        ClientConfiguration::for_host("127.0.0.1")
    }

    /// Configuration with a username identity.
    pub fn with_user(username: &str, password: &str) -> ClientConfiguration {
        let mut config = Self::anonymous();
        config.user_identity = Some(ualink_client::UserCredentials::new(username, password));
        config
    }

    /// Configuration that asks for a secured endpoint.
    pub fn with_certificate_store() -> ClientConfiguration {
        let mut config = Self::anonymous();
        config.certificate_store = Some("/var/lib/ualink/pki".into());
        config
    }
}

// =============================================================================
// Node Fixtures
// =============================================================================

/// Node identifiers.
pub struct NodeFixtures;

impl NodeFixtures {
    /// `ns=2;s=Temperature`.
    pub fn temperature() -> NodeId {
        NodeId::string(2, "Temperature")
    }

    /// `ns=2;s=Pressure`.
    pub fn pressure() -> NodeId {
        NodeId::string(2, "Pressure")
    }

    /// `ns=2;s=Running`.
    pub fn running() -> NodeId {
        NodeId::string(2, "Running")
    }

    /// `ns=2;s=Missing`, never present on the server.
    pub fn missing() -> NodeId {
        NodeId::string(2, "Missing")
    }

    /// `ns=2;i=1000..`.
    pub fn batch(count: usize) -> Vec<NodeId> {
        (0..count as u32).map(|i| NodeId::numeric(2, 1000 + i)).collect()
    }

    /// Seeds the server with temperature, pressure and running.
    pub fn seed(server: &SimulatedServer) {
        server.set_value(Self::temperature(), 21.5f64);
        server.set_value(Self::pressure(), 101_325i32);
        server.set_value(Self::running(), true);
    }
}

// =============================================================================
// Client Fixtures
// =============================================================================

/// A client wired to a simulated stack.
pub struct ClientFixture {
    /// The client.
    pub client: OpcClient,
    /// The stack behind it.
    pub stack: Arc<SimulatedStack>,
}

impl ClientFixture {
    /// Creates a disconnected anonymous client with seeded nodes.
    pub fn new() -> Self {
        Self::with_config(ConfigFixtures::anonymous())
    }

    /// Creates a disconnected client with `config` and seeded nodes.
    pub fn with_config(config: ClientConfiguration) -> Self {
        let stack = SimulatedStack::shared();
        NodeFixtures::seed(&stack.server());
        let client = OpcClient::new(config, stack.clone()).expect("valid fixture configuration");
        Self { client, stack }
    }

    /// Creates an anonymous client and opens it.
    pub async fn connected() -> Self {
        let fixture = Self::new();
        let opened = fixture.client.open().await;
        assert!(opened.is_completed(), "fixture open failed: {:?}", opened.failure());
        fixture
    }

    /// Returns the server state.
    pub fn server(&self) -> Arc<SimulatedServer> {
        self.stack.server()
    }
}

impl Default for ClientFixture {
    fn default() -> Self {
        Self::new()
    }
}

//! Gateway configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deadline used for connecting when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Deadlines applied by a [`StoreGateway`](crate::gateway::StoreGateway).
///
/// ```ignore
/// use podstore::config::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .with_connect_timeout_secs(5)
///     .with_operation_timeout_secs(2)
///     .build();
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Seconds allowed for establishing a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds allowed for each data operation. `None` leaves operations unbounded.
    #[serde(default)]
    pub operation_timeout_secs: Option<u64>,
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl GatewayConfig {
    /// Creates a new builder for constructing a configuration.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Deadline for connecting.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Deadline for each data operation, if any.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            operation_timeout_secs: None,
        }
    }
}

/// Builder for [`GatewayConfig`].
///
/// Unset values fall back to the defaults (10 second connect deadline, no operation deadline).
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    connect_timeout_secs: Option<u64>,
    operation_timeout_secs: Option<u64>,
}

impl GatewayConfigBuilder {
    /// Creates a new builder with no values set.
    pub fn new() -> Self {
        Self { connect_timeout_secs: None, operation_timeout_secs: None }
    }

    /// Sets the connect deadline in seconds.
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = Some(secs);
        self
    }

    /// Sets the per-operation deadline in seconds.
    pub fn with_operation_timeout_secs(mut self, secs: u64) -> Self {
        self.operation_timeout_secs = Some(secs);
        self
    }

    /// Builds and returns the [`GatewayConfig`].
    pub fn build(self) -> GatewayConfig {
        GatewayConfig {
            connect_timeout_secs: self.connect_timeout_secs.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            operation_timeout_secs: self.operation_timeout_secs,
        }
    }
}

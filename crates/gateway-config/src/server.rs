use std::{net::SocketAddr, time::Duration};

use serde::Deserialize;

/// HTTP listener configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// Upper bound for a whole request, streaming included
    #[serde(default = "default_request_timeout", deserialize_with = "crate::duration::deserialize")]
    pub request_timeout: Duration,
    #[serde(default)]
    pub health: HealthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            request_timeout: default_request_timeout(),
            health: HealthConfig::default(),
        }
    }
}

/// Unauthenticated liveness probe
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HealthConfig {
    pub enabled: bool,
    /// Served outside the `/v1` tree and never asks for a key
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_owned(),
        }
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

// Bedrock caps a single invocation at ten minutes
const fn default_request_timeout() -> Duration {
    Duration::from_secs(600)
}

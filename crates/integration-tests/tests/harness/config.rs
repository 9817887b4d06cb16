//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::time::Duration;

use gateway_config::{Config, ModelEntryConfig, ParameterPolicy, ProviderFamily};
use secrecy::SecretString;

pub const API_KEY: &str = "sk-integration";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal config: fixed key, fast retries, health enabled
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = SocketAddr::from(([127, 0, 0, 1], 0));
        config.auth.api_key = Some(SecretString::from(API_KEY.to_owned()));
        config.llm.retry.backoff = Duration::from_millis(5);

        Self { config }
    }

    pub fn with_region(mut self, region: &str, cross_region: bool) -> Self {
        self.config.bedrock.region = region.to_owned();
        self.config.bedrock.cross_region_inference = cross_region;
        self
    }

    pub fn with_default_model(mut self, model: &str) -> Self {
        model.clone_into(&mut self.config.llm.default_model);
        self
    }

    pub fn with_model(mut self, id: &str, provider: ProviderFamily) -> Self {
        self.config.llm.models.insert(
            id.to_owned(),
            ModelEntryConfig {
                provider,
                name: None,
                cross_region: Vec::new(),
            },
        );
        self
    }

    pub fn rejecting_unsupported_parameters(mut self) -> Self {
        self.config.llm.unsupported_parameters = ParameterPolicy::Reject;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.server.request_timeout = timeout;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}

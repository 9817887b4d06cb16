use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Where the expected bearer key comes from
///
/// At most one of `api_key` and `api_key_env` may be set. With neither,
/// the gateway accepts the built-in default key.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Literal expected key
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Name of the environment variable holding the expected key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// How long a fetched key is trusted before the source is read again
    #[serde(default = "default_cache_ttl", deserialize_with = "crate::duration::deserialize")]
    pub cache_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: None,
            cache_ttl: default_cache_ttl(),
        }
    }
}

const fn default_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

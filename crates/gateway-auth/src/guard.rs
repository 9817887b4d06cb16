use std::{sync::Arc, time::Duration};

use gateway_config::AuthConfig;
use mini_moka::sync::Cache;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{AuthError, EnvSecret, SecretSource, StaticSecret};

/// Key accepted when no key is configured
///
/// Only meant for local experiments; startup logs a warning when it is in use.
pub const DEFAULT_API_KEY: &str = "bedrock";

type KeyDigest = [u8; 32];

/// Validates presented API keys against the expected key
///
/// The expected key is fetched from its [`SecretSource`] and kept as a
/// SHA-256 digest for the configured TTL. Cloning shares the cache.
#[derive(Clone)]
pub struct CredentialGuard {
    source: Arc<dyn SecretSource>,
    cache: Cache<(), KeyDigest>,
}

impl CredentialGuard {
    pub fn new(source: Arc<dyn SecretSource>, ttl: Duration) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(1).build();
        Self { source, cache }
    }

    /// Build the guard for the configured key source
    pub fn from_config(config: &AuthConfig) -> Self {
        let source: Arc<dyn SecretSource> = match (&config.api_key, &config.api_key_env) {
            (Some(key), _) => Arc::new(StaticSecret::new("auth.api_key", key.clone())),
            (None, Some(variable)) => Arc::new(EnvSecret::new(variable.clone())),
            (None, None) => {
                tracing::warn!("no API key configured, accepting the built-in default key");
                Arc::new(StaticSecret::new(
                    "built-in default",
                    SecretString::from(DEFAULT_API_KEY.to_owned()),
                ))
            }
        };

        Self::new(source, config.cache_ttl)
    }

    /// Fetch the expected key once so a broken source fails at startup
    ///
    /// # Errors
    ///
    /// Returns `SecretUnavailable` if the source cannot be read
    pub async fn warm(&self) -> Result<(), AuthError> {
        self.expected_digest().await.map(|_| ())
    }

    /// Check a presented key
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` for a missing or mismatched key and
    /// `SecretUnavailable` when the expected key cannot be fetched
    pub async fn authorize(&self, presented: Option<&SecretString>) -> Result<(), AuthError> {
        let Some(presented) = presented else {
            return Err(AuthError::Unauthorized);
        };

        let expected = self.expected_digest().await?;
        let presented = digest(presented);

        // Comparing fixed-size digests hides the expected key's length as well
        if bool::from(presented.as_slice().ct_eq(expected.as_slice())) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    async fn expected_digest(&self) -> Result<KeyDigest, AuthError> {
        if let Some(cached) = self.cache.get(&()) {
            return Ok(cached);
        }

        let secret = self.source.fetch().await.inspect_err(|e| {
            tracing::error!(source = self.source.name(), error = %e, "failed to fetch expected API key");
        })?;

        let expected = digest(&secret);
        self.cache.insert((), expected);
        tracing::debug!(source = self.source.name(), "expected API key refreshed");

        Ok(expected)
    }
}

fn digest(secret: &SecretString) -> KeyDigest {
    Sha256::digest(secret.expose_secret().as_bytes()).into()
}

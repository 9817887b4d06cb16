use secrecy::SecretString;

use crate::AuthError;

/// Fetch-by-name access to the expected API key
#[async_trait::async_trait]
pub trait SecretSource: Send + Sync {
    /// Human-readable description for logs
    fn name(&self) -> &str;

    /// Read the current expected key
    async fn fetch(&self) -> Result<SecretString, AuthError>;
}

/// Key given literally in configuration
pub struct StaticSecret {
    name: String,
    value: SecretString,
}

impl StaticSecret {
    pub fn new(name: impl Into<String>, value: SecretString) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[async_trait::async_trait]
impl SecretSource for StaticSecret {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SecretString, AuthError> {
        Ok(self.value.clone())
    }
}

/// Key read from an environment variable on every refresh
pub struct EnvSecret {
    variable: String,
}

impl EnvSecret {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
        }
    }
}

#[async_trait::async_trait]
impl SecretSource for EnvSecret {
    fn name(&self) -> &str {
        &self.variable
    }

    async fn fetch(&self) -> Result<SecretString, AuthError> {
        match std::env::var(&self.variable) {
            Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
            Ok(_) => Err(AuthError::SecretUnavailable {
                source_name: self.variable.clone(),
                reason: "variable is empty".to_owned(),
            }),
            Err(e) => Err(AuthError::SecretUnavailable {
                source_name: self.variable.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

//! API key verification for inbound gateway requests

mod error;
mod guard;
mod source;

pub use error::AuthError;
pub use guard::{CredentialGuard, DEFAULT_API_KEY};
pub use source::{EnvSecret, SecretSource, StaticSecret};

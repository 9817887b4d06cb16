use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Bedrock runtime connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BedrockConfig {
    /// Deployment region, also used to pick the cross-region geo
    #[serde(default = "default_region")]
    pub region: String,
    /// Endpoint override (VPC endpoints, local mocks)
    #[serde(default)]
    pub endpoint_url: Option<Url>,
    /// Static access key; the default AWS credential chain is used without one
    #[serde(default)]
    pub access_key_id: Option<SecretString>,
    /// Pairs with `access_key_id`
    #[serde(default)]
    pub secret_access_key: Option<SecretString>,
    /// Invoke models through geo inference profiles where available
    #[serde(default)]
    pub cross_region_inference: bool,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            cross_region_inference: false,
        }
    }
}

fn default_region() -> String {
    "us-west-2".to_owned()
}

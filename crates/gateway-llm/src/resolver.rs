//! Model table and resolution of requested ids to invocation routes

use gateway_config::{BedrockConfig, Capability, LlmConfig, ProviderFamily};
use indexmap::IndexMap;

use crate::error::LlmError;

/// Geo prefixes of Bedrock cross-region inference profile ids
const PROFILE_PREFIXES: &[&str] = &["us.", "eu.", "apac.", "us-gov."];

/// Models served without any configuration: id, display name, family, geos
const BUILTIN_MODELS: &[(&str, &str, ProviderFamily, &[&str])] = &[
    ("anthropic.claude-instant-v1", "Claude Instant", ProviderFamily::Claude, &[]),
    ("anthropic.claude-v2:1", "Claude", ProviderFamily::Claude, &[]),
    ("anthropic.claude-v2", "Claude", ProviderFamily::Claude, &[]),
    ("anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet", ProviderFamily::Claude3, &["us", "eu", "apac"]),
    ("anthropic.claude-3-opus-20240229-v1:0", "Claude 3 Opus", ProviderFamily::Claude3, &["us"]),
    ("anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku", ProviderFamily::Claude3, &["us", "eu", "apac"]),
    ("anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet", ProviderFamily::Claude3, &["us", "eu", "apac"]),
    ("meta.llama2-13b-chat-v1", "Llama 2 Chat 13B", ProviderFamily::Llama2, &[]),
    ("meta.llama2-70b-chat-v1", "Llama 2 Chat 70B", ProviderFamily::Llama2, &[]),
    ("meta.llama3-8b-instruct-v1:0", "Llama 3 8B Instruct", ProviderFamily::Llama3, &[]),
    ("meta.llama3-70b-instruct-v1:0", "Llama 3 70B Instruct", ProviderFamily::Llama3, &[]),
    ("mistral.mistral-7b-instruct-v0:2", "Mistral 7B Instruct", ProviderFamily::Mistral, &[]),
    ("mistral.mixtral-8x7b-instruct-v0:1", "Mixtral 8x7B Instruct", ProviderFamily::Mistral, &[]),
    ("mistral.mistral-large-2402-v1:0", "Mistral Large", ProviderFamily::Mistral, &[]),
    ("cohere.command-r-v1:0", "Command R", ProviderFamily::CohereCommand, &[]),
    ("cohere.command-r-plus-v1:0", "Command R+", ProviderFamily::CohereCommand, &[]),
    ("cohere.embed-multilingual-v3", "Cohere Embed Multilingual", ProviderFamily::CohereEmbed, &[]),
    ("cohere.embed-english-v3", "Cohere Embed English", ProviderFamily::CohereEmbed, &[]),
    ("amazon.titan-embed-text-v1", "Titan Embeddings G1 - Text", ProviderFamily::TitanEmbed, &[]),
    ("amazon.titan-embed-text-v2:0", "Titan Text Embeddings V2", ProviderFamily::TitanEmbed, &[]),
];

/// Resolved invocation target of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    /// Model id the client asked for, after default substitution
    pub requested: String,
    pub provider: ProviderFamily,
    /// Id passed to Bedrock; an inference profile id when `cross_region` is set
    pub model_id: String,
    pub region: String,
    pub cross_region: bool,
}

/// Model table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: ProviderFamily,
    /// Geos with an inference profile, in preference order
    pub cross_region: Vec<String>,
}

impl ModelInfo {
    /// Vendor part of the id, e.g. `anthropic`
    pub fn owned_by(&self) -> &str {
        self.id.split_once('.').map_or("bedrock", |(vendor, _)| vendor)
    }
}

/// Maps requested model ids to routes
#[derive(Debug, Clone)]
pub struct ModelResolver {
    models: IndexMap<String, ModelInfo>,
    default_model: String,
    default_embedding_model: String,
    region: String,
    cross_region_inference: bool,
}

impl ModelResolver {
    /// Built-in table merged with and overridden by configured entries
    pub fn new(llm: &LlmConfig, bedrock: &BedrockConfig) -> Self {
        let mut models: IndexMap<String, ModelInfo> = BUILTIN_MODELS
            .iter()
            .map(|&(id, name, provider, geos)| {
                let info = ModelInfo {
                    id: id.to_owned(),
                    name: name.to_owned(),
                    provider,
                    cross_region: geos.iter().map(|&geo| geo.to_owned()).collect(),
                };
                (id.to_owned(), info)
            })
            .collect();

        for (id, entry) in &llm.models {
            let info = ModelInfo {
                id: id.clone(),
                name: entry.name.clone().unwrap_or_else(|| id.clone()),
                provider: entry.provider,
                cross_region: entry.cross_region.clone(),
            };
            models.insert(id.clone(), info);
        }

        Self {
            models,
            default_model: llm.default_model.clone(),
            default_embedding_model: llm.default_embedding_model.clone(),
            region: bedrock.region.clone(),
            cross_region_inference: bedrock.cross_region_inference,
        }
    }

    /// Resolve a requested id for an endpoint of the given capability
    pub fn resolve(&self, requested: &str, capability: Capability) -> Result<ModelRoute, LlmError> {
        let requested = match (requested.trim(), capability) {
            ("", Capability::Chat) => self.default_model.as_str(),
            ("", Capability::Embedding) => self.default_embedding_model.as_str(),
            (id, _) => id,
        };

        let not_found = || LlmError::ModelNotFound {
            model: requested.to_owned(),
        };

        let route = if let Some(info) = self.models.get(requested) {
            self.table_route(requested, info)
        } else {
            let provider = qualified_family(requested, &self.models).ok_or_else(not_found)?;
            ModelRoute {
                requested: requested.to_owned(),
                provider,
                model_id: requested.to_owned(),
                region: self.region.clone(),
                cross_region: PROFILE_PREFIXES.iter().any(|prefix| requested.starts_with(prefix)),
            }
        };

        if route.provider.capability() != capability {
            return Err(not_found());
        }

        Ok(route)
    }

    fn table_route(&self, requested: &str, info: &ModelInfo) -> ModelRoute {
        let geo = if self.cross_region_inference {
            preferred_geo(&self.region, &info.cross_region)
        } else {
            None
        };

        ModelRoute {
            requested: requested.to_owned(),
            provider: info.provider,
            model_id: geo.map_or_else(|| info.id.clone(), |geo| format!("{geo}.{}", info.id)),
            region: self.region.clone(),
            cross_region: geo.is_some(),
        }
    }

    /// Model table in listing order
    pub fn list(&self) -> impl Iterator<Item = &ModelInfo> {
        self.models.values()
    }

    /// Table entry for an id
    pub fn get(&self, id: &str) -> Option<&ModelInfo> {
        self.models.get(id)
    }
}

/// Geo of the deployment region when the model offers it, else its first geo
fn preferred_geo<'a>(region: &str, geos: &'a [String]) -> Option<&'a str> {
    let home = region_geo(region);
    geos.iter()
        .find(|geo| Some(geo.as_str()) == home)
        .or_else(|| geos.first())
        .map(String::as_str)
}

fn region_geo(region: &str) -> Option<&'static str> {
    if region.starts_with("us-gov-") {
        Some("us-gov")
    } else if region.starts_with("us-") || region.starts_with("ca-") {
        Some("us")
    } else if region.starts_with("eu-") {
        Some("eu")
    } else if region.starts_with("ap-") {
        Some("apac")
    } else {
        None
    }
}

/// Family of a fully-qualified id that is not in the table
///
/// Covers ARNs, inference profile ids and custom model imports. Plain ids
/// outside the table are unknown.
fn qualified_family(id: &str, models: &IndexMap<String, ModelInfo>) -> Option<ProviderFamily> {
    if id.contains("imported-model") {
        return Some(ProviderFamily::CustomImport);
    }

    let base = if let Some(arn) = id.strip_prefix("arn:") {
        arn.rsplit('/').next().unwrap_or(arn)
    } else if let Some(base) = PROFILE_PREFIXES.iter().find_map(|prefix| id.strip_prefix(prefix)) {
        base
    } else {
        return None;
    };

    // The last ARN segment may itself be a profile id
    let base = PROFILE_PREFIXES
        .iter()
        .find_map(|prefix| base.strip_prefix(prefix))
        .unwrap_or(base);

    models.get(base).map(|info| info.provider).or_else(|| infer_family(base))
}

/// Family from the vendor naming scheme of a base model id
fn infer_family(base: &str) -> Option<ProviderFamily> {
    let family = if base.starts_with("anthropic.claude-v2") || base.starts_with("anthropic.claude-instant") {
        ProviderFamily::Claude
    } else if base.starts_with("anthropic.claude") {
        ProviderFamily::Claude3
    } else if base.starts_with("meta.llama2") {
        ProviderFamily::Llama2
    } else if base.starts_with("meta.llama") {
        ProviderFamily::Llama3
    } else if base.starts_with("mistral.mistral") || base.starts_with("mistral.mixtral") {
        ProviderFamily::Mistral
    } else if base.starts_with("cohere.command-r") {
        ProviderFamily::CohereCommand
    } else if base.starts_with("cohere.embed") {
        ProviderFamily::CohereEmbed
    } else if base.starts_with("amazon.titan-embed-text") {
        ProviderFamily::TitanEmbed
    } else {
        return None;
    };
    Some(family)
}

#[cfg(test)]
mod tests {
    use gateway_config::ModelEntryConfig;

    use super::*;

    fn resolver(region: &str, cross_region: bool) -> ModelResolver {
        let bedrock = BedrockConfig {
            region: region.to_owned(),
            cross_region_inference: cross_region,
            ..BedrockConfig::default()
        };
        ModelResolver::new(&LlmConfig::default(), &bedrock)
    }

    #[test]
    fn empty_id_selects_the_default_model() {
        let resolver = resolver("us-west-2", false);

        let chat = resolver.resolve("", Capability::Chat).unwrap();
        assert_eq!(chat.model_id, "anthropic.claude-3-sonnet-20240229-v1:0");
        assert_eq!(chat.provider, ProviderFamily::Claude3);

        let embedding = resolver.resolve("", Capability::Embedding).unwrap();
        assert_eq!(embedding.model_id, "cohere.embed-multilingual-v3");
        assert_eq!(embedding.provider, ProviderFamily::CohereEmbed);
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let err = resolver("us-west-2", false)
            .resolve("gpt-4o", Capability::Chat)
            .unwrap_err();
        assert!(matches!(err, LlmError::ModelNotFound { ref model } if model == "gpt-4o"));
    }

    #[test]
    fn capability_mismatch_is_not_found() {
        let resolver = resolver("us-west-2", false);
        assert!(matches!(
            resolver.resolve("cohere.embed-english-v3", Capability::Chat),
            Err(LlmError::ModelNotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("meta.llama3-8b-instruct-v1:0", Capability::Embedding),
            Err(LlmError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn cross_region_prefers_the_deployment_geo() {
        let route = resolver("eu-central-1", true)
            .resolve("anthropic.claude-3-haiku-20240307-v1:0", Capability::Chat)
            .unwrap();

        assert_eq!(route.model_id, "eu.anthropic.claude-3-haiku-20240307-v1:0");
        assert!(route.cross_region);
        assert_eq!(route.requested, "anthropic.claude-3-haiku-20240307-v1:0");
    }

    #[test]
    fn cross_region_falls_back_to_the_first_listed_geo() {
        let route = resolver("eu-west-1", true)
            .resolve("anthropic.claude-3-opus-20240229-v1:0", Capability::Chat)
            .unwrap();
        assert_eq!(route.model_id, "us.anthropic.claude-3-opus-20240229-v1:0");
    }

    #[test]
    fn models_without_profiles_stay_regional() {
        let route = resolver("us-east-1", true)
            .resolve("meta.llama3-8b-instruct-v1:0", Capability::Chat)
            .unwrap();
        assert_eq!(route.model_id, "meta.llama3-8b-instruct-v1:0");
        assert!(!route.cross_region);

        let disabled = resolver("us-east-1", false)
            .resolve("anthropic.claude-3-haiku-20240307-v1:0", Capability::Chat)
            .unwrap();
        assert_eq!(disabled.model_id, "anthropic.claude-3-haiku-20240307-v1:0");
    }

    #[test]
    fn fully_qualified_ids_pass_through() {
        let resolver = resolver("us-west-2", false);

        let profile = resolver
            .resolve("us.anthropic.claude-3-5-sonnet-20240620-v1:0", Capability::Chat)
            .unwrap();
        assert_eq!(profile.model_id, "us.anthropic.claude-3-5-sonnet-20240620-v1:0");
        assert_eq!(profile.provider, ProviderFamily::Claude3);
        assert!(profile.cross_region);

        let arn = "arn:aws:bedrock:us-west-2::foundation-model/meta.llama3-70b-instruct-v1:0";
        let route = resolver.resolve(arn, Capability::Chat).unwrap();
        assert_eq!(route.model_id, arn);
        assert_eq!(route.provider, ProviderFamily::Llama3);

        let imported = "arn:aws:bedrock:us-west-2:123456789012:imported-model/abc123";
        assert_eq!(
            resolver.resolve(imported, Capability::Chat).unwrap().provider,
            ProviderFamily::CustomImport
        );

        assert!(matches!(
            resolver.resolve("us.acme.unknown-model", Capability::Chat),
            Err(LlmError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn configured_entries_override_the_table() {
        let mut llm = LlmConfig::default();
        llm.models.insert(
            "meta.llama3-8b-instruct-v1:0".to_owned(),
            ModelEntryConfig {
                provider: ProviderFamily::Llama3,
                name: Some("Small Llama".to_owned()),
                cross_region: vec!["us".to_owned()],
            },
        );
        llm.models.insert(
            "mistral.mistral-small-2402-v1:0".to_owned(),
            ModelEntryConfig {
                provider: ProviderFamily::Mistral,
                name: None,
                cross_region: Vec::new(),
            },
        );
        let bedrock = BedrockConfig {
            cross_region_inference: true,
            ..BedrockConfig::default()
        };
        let resolver = ModelResolver::new(&llm, &bedrock);

        let llama = resolver.resolve("meta.llama3-8b-instruct-v1:0", Capability::Chat).unwrap();
        assert_eq!(llama.model_id, "us.meta.llama3-8b-instruct-v1:0");
        assert_eq!(resolver.get("meta.llama3-8b-instruct-v1:0").unwrap().name, "Small Llama");

        let added = resolver.resolve("mistral.mistral-small-2402-v1:0", Capability::Chat).unwrap();
        assert_eq!(added.provider, ProviderFamily::Mistral);
        assert_eq!(resolver.list().last().unwrap().id, "mistral.mistral-small-2402-v1:0");
    }

    #[test]
    fn resolution_is_idempotent() {
        let resolver = resolver("ap-southeast-2", true);
        for id in ["", "anthropic.claude-3-haiku-20240307-v1:0", "us.meta.llama3-8b-instruct-v1:0"] {
            let first = resolver.resolve(id, Capability::Chat).unwrap();
            let second = resolver.resolve(id, Capability::Chat).unwrap();
            assert_eq!(first, second);
        }
        assert_eq!(
            resolver.resolve("", Capability::Chat).unwrap().model_id,
            "apac.anthropic.claude-3-sonnet-20240229-v1:0"
        );
    }

    #[test]
    fn owned_by_is_the_vendor_prefix() {
        let resolver = resolver("us-west-2", false);
        assert_eq!(resolver.get("cohere.command-r-v1:0").unwrap().owned_by(), "cohere");
    }
}

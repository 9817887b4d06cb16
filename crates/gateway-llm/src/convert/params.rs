//! Policy for `OpenAI` parameters a provider family cannot express

use gateway_config::ParameterPolicy;

use crate::error::LlmError;
use crate::types::{CompletionParams, EmbeddingRequest};

/// Optional generation parameter of an `OpenAI` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Temperature,
    TopP,
    MaxTokens,
    Stop,
    FrequencyPenalty,
    PresencePenalty,
    Seed,
    Logprobs,
    ResponseFormat,
}

impl Param {
    pub const ALL: [Self; 9] = [
        Self::Temperature,
        Self::TopP,
        Self::MaxTokens,
        Self::Stop,
        Self::FrequencyPenalty,
        Self::PresencePenalty,
        Self::Seed,
        Self::Logprobs,
        Self::ResponseFormat,
    ];

    /// Name as it appears in the request body
    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::TopP => "top_p",
            Self::MaxTokens => "max_tokens",
            Self::Stop => "stop",
            Self::FrequencyPenalty => "frequency_penalty",
            Self::PresencePenalty => "presence_penalty",
            Self::Seed => "seed",
            Self::Logprobs => "logprobs",
            Self::ResponseFormat => "response_format",
        }
    }

    fn is_set(self, params: &CompletionParams) -> bool {
        match self {
            Self::Temperature => params.temperature.is_some(),
            Self::TopP => params.top_p.is_some(),
            Self::MaxTokens => params.max_tokens.is_some(),
            Self::Stop => params.stop.as_ref().is_some_and(|stop| !stop.is_empty()),
            Self::FrequencyPenalty => params.frequency_penalty.is_some(),
            Self::PresencePenalty => params.presence_penalty.is_some(),
            Self::Seed => params.seed.is_some(),
            // `logprobs: false` asks for nothing
            Self::Logprobs => params.logprobs == Some(true),
            Self::ResponseFormat => params.response_format.is_some(),
        }
    }

    fn clear(self, params: &mut CompletionParams) {
        match self {
            Self::Temperature => params.temperature = None,
            Self::TopP => params.top_p = None,
            Self::MaxTokens => params.max_tokens = None,
            Self::Stop => params.stop = None,
            Self::FrequencyPenalty => params.frequency_penalty = None,
            Self::PresencePenalty => params.presence_penalty = None,
            Self::Seed => params.seed = None,
            Self::Logprobs => params.logprobs = None,
            Self::ResponseFormat => params.response_format = None,
        }
    }
}

/// Apply the parameter policy to a chat request's parameters
///
/// Parameters outside `supported` are cleared under [`ParameterPolicy::Drop`]
/// and fail the request under [`ParameterPolicy::Reject`]. More than one
/// choice is never served. `user` carries no semantics for Bedrock and is
/// always cleared.
pub fn apply(
    params: &mut CompletionParams,
    supported: &[Param],
    policy: ParameterPolicy,
    model: &str,
) -> Result<(), LlmError> {
    if params.n.is_some_and(|n| n > 1) {
        return Err(LlmError::UnsupportedParameter {
            parameter: "n".to_owned(),
            model: model.to_owned(),
        });
    }
    params.n = None;
    params.user = None;

    for param in Param::ALL {
        if supported.contains(&param) || !param.is_set(params) {
            continue;
        }
        match policy {
            ParameterPolicy::Reject => {
                return Err(LlmError::UnsupportedParameter {
                    parameter: param.name().to_owned(),
                    model: model.to_owned(),
                });
            }
            ParameterPolicy::Drop => {
                tracing::debug!(parameter = param.name(), model, "dropping unsupported parameter");
                param.clear(params);
            }
        }
    }

    Ok(())
}

/// Apply the parameter policy to an embedding request
///
/// No supported embedding model takes an output size.
pub fn apply_embedding(request: &mut EmbeddingRequest, policy: ParameterPolicy, model: &str) -> Result<(), LlmError> {
    request.user = None;
    if request.dimensions.is_none() {
        return Ok(());
    }
    match policy {
        ParameterPolicy::Reject => Err(LlmError::UnsupportedParameter {
            parameter: "dimensions".to_owned(),
            model: model.to_owned(),
        }),
        ParameterPolicy::Drop => {
            tracing::debug!(parameter = "dimensions", model, "dropping unsupported parameter");
            request.dimensions = None;
            Ok(())
        }
    }
}

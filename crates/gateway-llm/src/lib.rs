//! OpenAI-compatible chat and embedding gateway over Amazon Bedrock
//!
//! Requests are normalized into canonical types, resolved to a model route,
//! encoded into the native payload of the route's provider family, invoked
//! through an [`InvocationBackend`], and decoded back into `OpenAI` responses
//! or SSE chunk streams.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod backend;
pub mod convert;
pub mod error;
#[cfg(feature = "http")]
pub mod handler;
pub mod images;
pub mod protocol;
pub mod resolver;
pub mod state;
pub mod types;

pub use backend::{ChunkStream, InvocationBackend, InvokeError};
pub use error::LlmError;
#[cfg(feature = "http")]
pub use handler::llm_router;
pub use resolver::{ModelResolver, ModelRoute};
pub use state::LlmState;
pub use types::{CompletionRequest, CompletionResponse, StreamEvent};

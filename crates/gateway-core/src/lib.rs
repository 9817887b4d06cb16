//! Types shared by every gateway crate: the per-request context and the
//! trait that turns domain errors into HTTP responses.

mod context;
mod error;

pub use context::RequestContext;
pub use error::HttpError;

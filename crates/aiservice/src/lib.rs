//! HTTP client library for the AI generation service.
//!
//! Provides typed request/response bodies for the `/generate/image` and
//! `/generate/video` endpoints, the [`GenerationApi`] REST client and the
//! [`GenerationBackend`] trait the job processor depends on.

pub mod api;
pub mod backend;
pub mod request;

pub use api::{GenerationApi, GenerationApiError};
pub use backend::GenerationBackend;
pub use request::{GenerationRequest, GenerationResponse};

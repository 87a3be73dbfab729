//! The seam between the job processor and the generation service.

use async_trait::async_trait;

use crate::api::{GenerationApi, GenerationApiError};
use crate::request::{GenerationRequest, GenerationResponse};

/// Anything that can turn a [`GenerationRequest`] into a stored output.
///
/// The processor only sees this trait, so tests can script successes,
/// failures and hangs without a running service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationApiError>;
}

#[async_trait]
impl GenerationBackend for GenerationApi {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationApiError> {
        GenerationApi::generate(self, request).await
    }
}

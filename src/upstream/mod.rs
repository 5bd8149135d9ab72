//! The upstream generation capability.
//!
//! [`ImageModel`] is the seam the broker schedules work against: it accepts a
//! composed prompt (plus an image payload for edits) and yields image bytes or
//! a classified failure. [`GeminiImageModel`] is the HTTP-backed
//! implementation; tests script the trait instead.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::ApiKeyAuthManager;
use crate::config::BrokerConfig;
use crate::error::{map_status, BrokerError, BrokerResult};
use crate::transport::{endpoints, HttpTransport, RequestBuilder};
use crate::types::{GenerateContentRequest, GenerateContentResponse, ImageData, Part};

/// Asynchronous capability to produce or modify an image.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Generate an image from a fully composed text prompt.
    async fn generate_image(&self, prompt: &str) -> BrokerResult<ImageData>;

    /// Edit an existing image, passed as raw base64, per a fully composed
    /// instruction.
    async fn edit_image(&self, image_base64: &str, instruction: &str) -> BrokerResult<ImageData>;
}

/// Gemini-backed image model.
pub struct GeminiImageModel {
    model: String,
    transport: Arc<dyn HttpTransport>,
    request_builder: RequestBuilder,
}

impl GeminiImageModel {
    /// Create a new Gemini image model from configuration and a transport.
    pub fn new(config: &BrokerConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let auth_manager = ApiKeyAuthManager::from_config(config);
        let request_builder = RequestBuilder::new(
            config.base_url.clone(),
            config.api_version.clone(),
            Box::new(auth_manager),
        );

        Self {
            model: config.model.clone(),
            transport,
            request_builder,
        }
    }

    /// Send a `generateContent` call and extract the first inline image.
    async fn dispatch(&self, parts: Vec<Part>) -> BrokerResult<ImageData> {
        let request = self.request_builder.post_json(
            &endpoints::generate_content(&self.model),
            &GenerateContentRequest::from_parts(parts),
        )?;

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let retry_after = response.retry_after();
            let err = map_status(response.status, retry_after, &response.body);
            tracing::debug!(status = response.status, error = %err, "upstream call failed");
            return Err(err);
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&response.body)?;

        let blob = parsed
            .first_inline_data()
            .ok_or(BrokerError::NoImageProduced)?;
        ImageData::from_base64(&blob.mime_type, &blob.data)
    }
}

#[async_trait]
impl ImageModel for GeminiImageModel {
    async fn generate_image(&self, prompt: &str) -> BrokerResult<ImageData> {
        tracing::debug!(model = %self.model, "dispatching image generation");
        self.dispatch(vec![Part::text(prompt)]).await
    }

    async fn edit_image(&self, image_base64: &str, instruction: &str) -> BrokerResult<ImageData> {
        tracing::debug!(model = %self.model, "dispatching image edit");
        // The source format is unknown at this point; PNG is what the service
        // accepts for arbitrary inline images.
        self.dispatch(vec![
            Part::text(instruction),
            Part::inline_data("image/png", image_base64),
        ])
        .await
    }
}

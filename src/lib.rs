//! # Gemini Image Broker
//!
//! Rate-limited, deduplicating, retrying client-side broker for Gemini image
//! generation.
//!
//! All image traffic goes through one [`ImageBroker`], which exposes two
//! operations: [`ImageBroker::generate`] (prompt to image) and
//! [`ImageBroker::edit`] (image + instruction to image). Behind that surface
//! the broker:
//!
//! - caches generation results by their full prompt, so identical prompts
//!   resolve instantly after the first success,
//! - serializes all upstream calls through a single-flight FIFO queue with a
//!   fixed pacing delay between dispatches,
//! - retries rate-limited calls with exponential backoff before failing.
//!
//! Images cross the API boundary as `data:<mime>;base64,<payload>` strings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gemini_image_broker::{BrokerConfig, ImageBroker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY / GOOGLE_API_KEY and friends.
//!     let config = BrokerConfig::from_env()?;
//!     let broker = ImageBroker::from_config(&config)?;
//!
//!     let image = broker
//!         .generate("a lighthouse at the edge of a dark sea")
//!         .await?;
//!     let edited = broker.edit(&image, "add a flock of ravens").await?;
//!     println!("{} bytes", edited.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `broker` - The request broker: cache, queue, drain loop, retry
//! - `config` - Configuration types and builder
//! - `auth` - API key management
//! - `error` - Error taxonomy and rate-limit classification
//! - `types` - Wire types and the data-URI image representation
//! - `transport` - HTTP transport layer
//! - `upstream` - The generation capability and its Gemini implementation

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod auth;
pub mod broker;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;
pub mod upstream;

// Development/testing modules - always available for integration tests
pub mod fixtures;
pub mod mocks;

// Re-exports for convenience
pub use auth::{ApiKeyAuthManager, AuthManager};
pub use broker::{ImageBroker, RetryExecutor};
pub use config::{
    AuthMethod, BrokerConfig, BrokerConfigBuilder, RetryPolicy, DEFAULT_BASE_URL,
    DEFAULT_IMAGE_MODEL, DEFAULT_MAX_RETRIES, DEFAULT_REQUEST_DELAY_MS, DEFAULT_STYLE_SUFFIX,
};
pub use error::{map_status, BrokerError, BrokerResult};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBuilder, ReqwestTransport,
};
pub use types::{
    strip_data_uri_prefix, Blob, Candidate, Content, GenerateContentRequest,
    GenerateContentResponse, ImageData, Part,
};
pub use upstream::{GeminiImageModel, ImageModel};

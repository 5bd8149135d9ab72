//! Configuration types for the image broker.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::{BrokerError, BrokerResult};

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Default image-capable model.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Default request timeout (120 seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout (30 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default delay between consecutive queued requests (2.5 seconds).
///
/// This is the broker's pacing interval: it keeps the dispatch rate under the
/// service's throughput ceiling regardless of how many callers enqueue work
/// at once.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 2500;

/// Default max retries for rate-limited requests (4 attempts in total).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial backoff before the first retry (2 seconds).
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 2000;

/// Default stylistic suffix appended to every generation prompt.
///
/// The full prompt (caller prompt + suffix) is also the cache key, so all
/// callers of the same scene prompt share one generated image.
pub const DEFAULT_STYLE_SUFFIX: &str = ", rusty lake game style, hand-drawn sketch, mysterious, \
surreal, sepia tones, thick outlines, paper texture background, vintage illustration, \
minimalist details.";

/// Default style-preservation clause appended to every edit instruction.
pub const DEFAULT_EDIT_STYLE_CLAUSE: &str =
    "Maintain the Rusty Lake, hand-drawn sketch style. Keep the sepia/vintage atmosphere.";

/// Authentication method for the API key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthMethod {
    /// Use the x-goog-api-key header (recommended).
    #[default]
    Header,
    /// Use the ?key= query parameter.
    QueryParam,
}

/// Retry policy for rate-limited requests.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff wait.
    pub max_backoff: Duration,
    /// Multiplier applied to the backoff after each retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Configuration for the image broker and its upstream client.
#[derive(Clone)]
pub struct BrokerConfig {
    /// API key. May be absent; the first upstream call will then fail with
    /// [`BrokerError::MissingCredential`].
    pub api_key: Option<SecretString>,
    /// Base URL for the API.
    pub base_url: Url,
    /// API version path segment.
    pub api_version: String,
    /// Model used for both generation and edits.
    pub model: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Pacing delay between consecutive queued requests.
    pub request_delay: Duration,
    /// Retry policy for rate-limited requests.
    pub retry: RetryPolicy,
    /// Authentication method.
    pub auth_method: AuthMethod,
    /// Stylistic suffix appended to generation prompts.
    pub style_suffix: String,
    /// Style-preservation clause appended to edit instructions.
    pub edit_style_clause: String,
}

impl BrokerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> BrokerConfigBuilder {
        BrokerConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `GEMINI_API_KEY` (falling back to `GOOGLE_API_KEY`),
    /// `GEMINI_BASE_URL`, `GEMINI_IMAGE_MODEL`, `GEMINI_REQUEST_DELAY_MS`, and
    /// `GEMINI_MAX_RETRIES`. A missing key is not an error here: it surfaces
    /// as [`BrokerError::MissingCredential`] on the first upstream call.
    pub fn from_env() -> BrokerResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok();

        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let model = std::env::var("GEMINI_IMAGE_MODEL")
            .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string());

        let request_delay_ms: u64 = std::env::var("GEMINI_REQUEST_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_DELAY_MS);

        let max_retries: u32 = std::env::var("GEMINI_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_RETRIES);

        let mut builder = Self::builder()
            .base_url(&base_url)?
            .model(&model)
            .request_delay(Duration::from_millis(request_delay_ms))
            .retry(RetryPolicy {
                max_retries,
                ..Default::default()
            });

        if let Some(key) = api_key {
            builder = builder.api_key(SecretString::new(key));
        }

        Ok(builder.build())
    }
}

/// Builder for [`BrokerConfig`].
#[derive(Default)]
pub struct BrokerConfigBuilder {
    api_key: Option<SecretString>,
    base_url: Option<Url>,
    api_version: Option<String>,
    model: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    request_delay: Option<Duration>,
    retry: Option<RetryPolicy>,
    auth_method: Option<AuthMethod>,
    style_suffix: Option<String>,
    edit_style_clause: Option<String>,
}

impl BrokerConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, api_key: SecretString) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: &str) -> Result<Self, BrokerError> {
        self.base_url = Some(Url::parse(base_url)?);
        Ok(self)
    }

    /// Set the API version.
    pub fn api_version(mut self, version: &str) -> Self {
        self.api_version = Some(version.to_string());
        self
    }

    /// Set the model.
    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the pacing delay between queued requests.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Set the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the authentication method.
    pub fn auth_method(mut self, method: AuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Set the stylistic suffix appended to generation prompts.
    pub fn style_suffix(mut self, suffix: &str) -> Self {
        self.style_suffix = Some(suffix.to_string());
        self
    }

    /// Set the style-preservation clause appended to edit instructions.
    pub fn edit_style_clause(mut self, clause: &str) -> Self {
        self.edit_style_clause = Some(clause.to_string());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> BrokerConfig {
        BrokerConfig {
            api_key: self.api_key,
            base_url: self
                .base_url
                .unwrap_or_else(|| Url::parse(DEFAULT_BASE_URL).unwrap()),
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            connect_timeout: self
                .connect_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            request_delay: self
                .request_delay
                .unwrap_or(Duration::from_millis(DEFAULT_REQUEST_DELAY_MS)),
            retry: self.retry.unwrap_or_default(),
            auth_method: self.auth_method.unwrap_or_default(),
            style_suffix: self
                .style_suffix
                .unwrap_or_else(|| DEFAULT_STYLE_SUFFIX.to_string()),
            edit_style_clause: self
                .edit_style_clause
                .unwrap_or_else(|| DEFAULT_EDIT_STYLE_CLAUSE.to_string()),
        }
    }
}

//! Endpoint path helpers for the Gemini API.

/// Base path for models endpoints.
pub const MODELS: &str = "/models";

/// Constructs the `generateContent` endpoint path for a model.
///
/// ```
/// use gemini_image_broker::transport::endpoints;
///
/// let path = endpoints::generate_content("gemini-2.5-flash-image");
/// assert_eq!(path, "/models/gemini-2.5-flash-image:generateContent");
/// ```
pub fn generate_content(model: &str) -> String {
    format!("{MODELS}/{model}:generateContent")
}

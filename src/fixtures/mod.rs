//! Canned Gemini response bodies for tests.

/// A successful `generateContent` body carrying one inline image.
pub fn inline_image_response(mime_type: &str, base64_data: &str) -> String {
    format!(
        r#"{{
            "candidates": [{{
                "content": {{
                    "parts": [{{"inlineData": {{"mimeType": "{mime_type}", "data": "{base64_data}"}}}}],
                    "role": "model"
                }},
                "finishReason": "STOP",
                "index": 0
            }}],
            "modelVersion": "gemini-2.5-flash-image"
        }}"#
    )
}

/// A successful body with only text parts, i.e. no usable image.
pub fn text_only_response(text: &str) -> String {
    format!(
        r#"{{
            "candidates": [{{
                "content": {{
                    "parts": [{{"text": "{text}"}}],
                    "role": "model"
                }},
                "finishReason": "STOP"
            }}]
        }}"#
    )
}

/// The structured 429 error body the API returns when rate limited.
pub fn rate_limit_error_body() -> &'static str {
    r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#
}

/// A structured 500 error body.
pub fn server_error_body() -> &'static str {
    r#"{"error":{"code":500,"message":"Internal error encountered.","status":"INTERNAL"}}"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerateContentResponse;

    #[test]
    fn test_inline_image_response_parses() {
        let body = inline_image_response("image/png", "QUJD");
        let parsed: GenerateContentResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.first_inline_data().unwrap().data, "QUJD");
    }

    #[test]
    fn test_text_only_response_parses() {
        let body = text_only_response("no image for you");
        let parsed: GenerateContentResponse = serde_json::from_str(&body).unwrap();
        assert!(parsed.first_inline_data().is_none());
    }
}

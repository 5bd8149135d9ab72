//! The `data:<mime>;base64,<payload>` boundary representation.
//!
//! Data URIs are the canonical exchange format between the broker and its
//! callers: `generate` and `edit` resolve to them, and `edit` accepts one as
//! input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;

use crate::error::{BrokerError, BrokerResult};

/// Decoded image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// The MIME type of the image.
    pub mime_type: String,
    /// Raw image bytes.
    pub bytes: Bytes,
}

impl ImageData {
    /// Create image data from raw bytes.
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Create image data from a base64 payload as returned by the API.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> BrokerResult<Self> {
        let bytes = STANDARD.decode(data).map_err(|e| BrokerError::Decode {
            message: format!("invalid base64 image payload: {e}"),
        })?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parse a strict `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> BrokerResult<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| BrokerError::InvalidImageData {
                message: "missing data: prefix".to_string(),
            })?;
        let (mime_type, payload) =
            rest.split_once(";base64,")
                .ok_or_else(|| BrokerError::InvalidImageData {
                    message: "missing ;base64, separator".to_string(),
                })?;
        if mime_type.is_empty() {
            return Err(BrokerError::InvalidImageData {
                message: "empty MIME type".to_string(),
            });
        }
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| BrokerError::InvalidImageData {
                message: format!("invalid base64 payload: {e}"),
            })?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Render as a `data:<mime>;base64,<payload>` URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// The base64 encoding of the image bytes.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Strip a `data:<mime>;base64,` prefix from an image payload, leaving the
/// raw base64.
///
/// Lenient by design: a bare base64 string passes through untouched, so
/// callers can hand `edit` either form.
pub fn strip_data_uri_prefix(payload: &str) -> &str {
    payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map_or(payload, |(_, b64)| b64)
}

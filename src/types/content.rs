//! Wire types for the Gemini `generateContent` endpoint, trimmed to what
//! image generation and editing need.

use serde::{Deserialize, Serialize};

/// A part of a content message: either text or inline binary data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Part {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Inline binary data.
    InlineData {
        /// The inline data blob.
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

impl Part {
    /// Convenience constructor for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Convenience constructor for an inline-data part.
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Part::InlineData {
            inline_data: Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            },
        }
    }
}

/// Binary data blob with MIME type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// The MIME type of the data.
    pub mime_type: String,
    /// Base64-encoded binary data.
    pub data: String,
}

/// A content message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    /// The parts of the content.
    pub parts: Vec<Part>,
    /// The role of the content author, when reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A candidate response from the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The content of the candidate. May be absent when generation was
    /// blocked or produced nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    /// The reason generation finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// The index of this candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<i32>,
}

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateContentRequest {
    /// The content to send to the model.
    pub contents: Content,
}

impl GenerateContentRequest {
    /// Build a request from a list of parts.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: Content { parts, role: None },
        }
    }
}

/// Response body for `generateContent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// The candidate responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates: Option<Vec<Candidate>>,
    /// The version of the model used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    /// Walk the candidates in order and return the first inline-data part.
    pub fn first_inline_data(&self) -> Option<&Blob> {
        self.candidates
            .as_deref()?
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .find_map(|part| match part {
                Part::InlineData { inline_data } => Some(inline_data),
                Part::Text { .. } => None,
            })
    }
}

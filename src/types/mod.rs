//! Core types for the image broker.

mod content;
mod image;

pub use content::{
    Blob, Candidate, Content, GenerateContentRequest, GenerateContentResponse, Part,
};
pub use image::{strip_data_uri_prefix, ImageData};

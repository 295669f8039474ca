//! Image loading errors

use thiserror::Error;

/// Errors that can occur while loading an image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("failed to read image file: {0}")]
    FileLoad(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid base64 data: {0}")]
    Base64(String),

    #[error("loader runtime error: {0}")]
    Runtime(String),
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for ImageError {
    fn from(err: base64::DecodeError) -> Self {
        ImageError::Base64(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageError>;

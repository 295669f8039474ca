//! Image decoding

use std::sync::Arc;

use base64::Engine;
use image::{DynamicImage, GenericImageView};

use crate::error::{ImageError, Result};
use crate::source::ImageSource;

/// A decoded image. Pixels are shared, so clones are cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pixels: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl ImageData {
    /// Create ImageData from raw RGBA pixels
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected_len = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected_len {
            return Err(ImageError::Decode(format!(
                "invalid pixel data length: expected {}, got {}",
                expected_len,
                pixels.len()
            )));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
            width,
            height,
        })
    }

    /// Load an image from a source on the calling thread.
    ///
    /// URL sources need the async path (`load_async`, "network" feature).
    pub fn load(source: ImageSource) -> Result<Self> {
        match source {
            ImageSource::File(path) => {
                let data = std::fs::read(&path)
                    .map_err(|e| ImageError::FileLoad(format!("{}: {}", path.display(), e)))?;
                Self::from_bytes(&data)
            }
            ImageSource::Base64(data) => Self::from_base64(&data),
            ImageSource::Bytes(data) => Self::from_bytes(&data),
            ImageSource::Url(url) => Err(ImageError::Network(if cfg!(feature = "network") {
                format!("{url}: URL sources load asynchronously")
            } else {
                format!("{url}: URL loading requires the 'network' feature")
            })),
        }
    }

    /// Load an image from a source, fetching URLs over HTTP
    #[cfg(feature = "network")]
    pub async fn load_async(source: ImageSource) -> Result<Self> {
        match source {
            ImageSource::Url(url) => {
                let response = reqwest::get(&url)
                    .await
                    .map_err(|e| ImageError::Network(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(ImageError::Network(format!(
                        "{url}: HTTP {}",
                        response.status()
                    )));
                }

                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| ImageError::Network(e.to_string()))?;

                Self::from_bytes(&bytes)
            }
            other => Self::load(other),
        }
    }

    /// Decode image from raw bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)?;
        Ok(Self::from_dynamic_image(img))
    }

    /// Decode image from plain base64 or a `data:` URI
    pub fn from_base64(data: &str) -> Result<Self> {
        let base64_data = if data.starts_with("data:") {
            data.find(";base64,")
                .map(|pos| &data[pos + 8..])
                .ok_or_else(|| ImageError::Base64("invalid data URI format".to_string()))?
        } else {
            data
        };

        let bytes = base64::engine::general_purpose::STANDARD.decode(base64_data.trim())?;
        Self::from_bytes(&bytes)
    }

    fn from_dynamic_image(img: DynamicImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            pixels: Arc::new(img.to_rgba8().into_raw()),
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Natural width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Natural height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }
}

//! Sus Image
//!
//! Image loading for lazy images.
//!
//! # Features
//!
//! - Load images from file paths, URLs (`network` feature) and base64 data
//! - Support for PNG, JPEG, GIF, WebP, BMP formats
//! - Off-thread decoding on a tokio runtime, completions delivered on the UI
//!   thread via [`ImageLoader::pump`]
//! - Process-wide cache keyed by resource identifier
//!
//! # Example
//!
//! ```ignore
//! use sus_image::{ImageCache, ImageLoader, ImageSource, TokioImageLoader};
//!
//! let loader = TokioImageLoader::new()?;
//! let cache = ImageCache::global();
//! loader.load(ImageSource::from_uri("assets/hero.png"), Box::new(move |result| {
//!     if let Ok(data) = result {
//!         cache.insert("assets/hero.png", data);
//!     }
//! }));
//!
//! // Later, on the UI thread
//! loader.pump();
//! ```

mod async_loader;
mod cache;
mod error;
mod loader;
mod source;

pub use async_loader::{BlockingImageLoader, ImageLoader, LoadCallback, TokioImageLoader};
pub use cache::ImageCache;
pub use error::{ImageError, Result};
pub use loader::ImageData;
pub use source::ImageSource;

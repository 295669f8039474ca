//! Image source types

use std::path::PathBuf;

/// Where the bytes of an image come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Load from a file path
    File(PathBuf),

    /// Load from a URL (requires the "network" feature)
    Url(String),

    /// Base64-encoded data, optionally as a `data:image/...;base64,` URI
    Base64(String),

    /// Raw encoded bytes
    Bytes(Vec<u8>),
}

impl ImageSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64(data.into())
    }

    pub fn bytes(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }

    /// Parse the `src` string a widget was given
    ///
    /// - `data:image/png;base64,...` is inline data
    /// - `http://...` and `https://...` are URLs
    /// - `file:///path/to/image.png` and bare paths are files
    pub fn from_uri(uri: &str) -> Self {
        if uri.starts_with("data:") {
            Self::Base64(uri.to_string())
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            Self::Url(uri.to_string())
        } else if let Some(path) = uri.strip_prefix("file://") {
            Self::File(PathBuf::from(path))
        } else {
            Self::File(PathBuf::from(uri))
        }
    }

    /// Short description for logs; never the full data URI
    pub fn describe(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Base64(data) => format!("<base64, {} chars>", data.len()),
            Self::Bytes(data) => format!("<{} bytes>", data.len()),
        }
    }
}

impl From<&str> for ImageSource {
    fn from(s: &str) -> Self {
        Self::from_uri(s)
    }
}

impl From<String> for ImageSource {
    fn from(s: String) -> Self {
        Self::from_uri(&s)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uri() {
        assert_eq!(
            ImageSource::from_uri("https://cdn.example.com/a.png"),
            ImageSource::Url("https://cdn.example.com/a.png".into())
        );
        assert_eq!(
            ImageSource::from_uri("file:///tmp/a.png"),
            ImageSource::File("/tmp/a.png".into())
        );
        assert_eq!(
            ImageSource::from_uri("assets/a.png"),
            ImageSource::File("assets/a.png".into())
        );
        assert!(matches!(
            ImageSource::from_uri("data:image/png;base64,AAAA"),
            ImageSource::Base64(_)
        ));
    }

    #[test]
    fn test_describe_hides_data() {
        let src = ImageSource::base64("data:image/png;base64,AAAA");
        assert_eq!(src.describe(), "<base64, 26 chars>");
    }
}

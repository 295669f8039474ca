//! Integration tests for loading into the shared cache
//!
//! - files written to disk decode on the tokio loader
//! - completions only run on `pump`, on the calling thread
//! - failures are reported and never cached

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use sus_image::{BlockingImageLoader, ImageCache, ImageError, ImageLoader, ImageSource, TokioImageLoader};

fn write_png(name: &str, width: u32, height: u32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("sus-image-{}-{name}.png", std::process::id()));
    RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

/// Load `uri` and cache the result under it, the way lazy images do
fn load_into(loader: &dyn ImageLoader, cache: &ImageCache, uri: &str, errors: Rc<RefCell<Vec<ImageError>>>) {
    let cache = cache.clone();
    let key = uri.to_string();
    loader.load(
        ImageSource::from_uri(uri),
        Box::new(move |result| match result {
            Ok(data) => cache.insert(key, data),
            Err(error) => errors.borrow_mut().push(error),
        }),
    );
}

#[test]
fn test_tokio_loader_fills_cache() {
    let path = write_png("wide", 6, 3);
    let uri = path.to_string_lossy().into_owned();
    let missing = std::env::temp_dir().join("sus-image-does-not-exist.png");
    let missing = missing.to_string_lossy().into_owned();

    let loader = TokioImageLoader::with_workers(2).unwrap();
    let cache = ImageCache::new();
    let errors = Rc::new(RefCell::new(Vec::new()));

    load_into(&loader, &cache, &uri, errors.clone());
    load_into(&loader, &cache, &missing, errors.clone());
    assert!(cache.is_empty());
    assert_eq!(loader.pending(), 2);

    assert_eq!(loader.wait_idle(Duration::from_secs(10)), 2);
    assert_eq!(cache.get(&uri).map(|d| d.dimensions()), Some((6, 3)));
    assert!(!cache.contains(&missing));
    assert!(matches!(errors.borrow()[0], ImageError::FileLoad(_)));

    let _ = std::fs::remove_file(path);
}

#[test]
fn test_file_uri_and_shared_cache_handles() {
    let path = write_png("square", 2, 2);
    let uri = format!("file://{}", path.display());

    let loader = BlockingImageLoader::new();
    let cache = ImageCache::new();
    let other = cache.clone();
    load_into(&loader, &cache, &uri, Rc::new(RefCell::new(Vec::new())));

    assert!(!other.contains(&uri));
    loader.pump();
    assert_eq!(other.get(&uri).map(|d| d.pixels().len()), Some(16));

    other.remove(&uri);
    assert!(cache.is_empty());

    let _ = std::fs::remove_file(path);
}

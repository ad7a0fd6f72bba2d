//! Remote card images, behind a cache.
//!
//! The [`Fetcher`] trait is the only network seam in the crate: it turns a URL
//! into raw bytes. [`HttpFetcher`] is the production implementation (blocking
//! `reqwest` with a request timeout); tests substitute a recording mock.
//!
//! [`fetch_image`] puts an [`ImageCache`] in front of a fetcher: a readable
//! cached file wins, otherwise the image is downloaded, decoded, and written
//! back to the cache before being returned.

use super::params::ImageOrigin;
use crate::cache::ImageCache;
use image::RgbImage;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Cannot build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Request for {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("Cannot decode image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
}

/// Download raw bytes for a URL.
///
/// Implementations must be shareable across threads; the pipeline may run on
/// a worker thread while the caller keeps a handle.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP fetcher with a per-request timeout.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        tracing::debug!(%url, "fetching card image");
        let response = self.client.get(url).send().map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

/// Get the image at `url`, from the cache when possible.
///
/// A freshly downloaded image is stored in the cache; failing to store it only
/// logs a warning.
pub fn fetch_image(
    fetcher: &dyn Fetcher,
    cache: &ImageCache,
    url: &str,
) -> Result<(RgbImage, ImageOrigin), FetchError> {
    if let Some(image) = cache.load(url) {
        tracing::debug!(%url, "image cache hit");
        return Ok((image, ImageOrigin::Cached));
    }

    let bytes = fetcher.fetch(url)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?
        .to_rgb8();

    if let Err(e) = cache.store(url, &image) {
        tracing::warn!(%url, error = %e, "could not write image to cache");
    }
    Ok((image, ImageOrigin::Fetched))
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::test_helpers::{encode_png, solid_image};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Mock fetcher that serves canned responses and records every request.
    /// Uses Mutex (not RefCell) so it is Sync like the real fetcher.
    #[derive(Default)]
    pub struct MockFetcher {
        pub responses: Mutex<HashMap<String, Vec<u8>>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `bytes` for `url`.
        pub fn with_response(self, url: &str, bytes: Vec<u8>) -> Self {
            self.responses.lock().unwrap().insert(url.to_string(), bytes);
            self
        }

        pub fn get_requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetcher for MockFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    const URL: &str = "https://cards.example/elsa.png";

    #[test]
    fn miss_fetches_and_populates_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path(), 90);
        let fetcher = MockFetcher::new().with_response(URL, encode_png(&solid_image(8, 12, [200, 10, 10])));

        let (image, origin) = fetch_image(&fetcher, &cache, URL).unwrap();
        assert_eq!(origin, ImageOrigin::Fetched);
        assert_eq!(image.dimensions(), (8, 12));
        assert!(cache.path_for(URL).exists());
        assert_eq!(fetcher.get_requests(), vec![URL]);
    }

    #[test]
    fn hit_skips_fetcher() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path(), 90);
        cache.store(URL, &solid_image(8, 12, [0, 0, 255])).unwrap();
        let fetcher = MockFetcher::new();

        let (image, origin) = fetch_image(&fetcher, &cache, URL).unwrap();
        assert_eq!(origin, ImageOrigin::Cached);
        assert_eq!(image.dimensions(), (8, 12));
        assert!(fetcher.get_requests().is_empty());
    }

    #[test]
    fn corrupt_cache_entry_is_refetched() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path(), 90);
        std::fs::write(cache.path_for(URL), b"not a jpeg").unwrap();
        let fetcher = MockFetcher::new().with_response(URL, encode_png(&solid_image(4, 4, [1, 2, 3])));

        let (_, origin) = fetch_image(&fetcher, &cache, URL).unwrap();
        assert_eq!(origin, ImageOrigin::Fetched);
        assert_eq!(fetcher.get_requests().len(), 1);
    }

    #[test]
    fn http_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path(), 90);
        let fetcher = MockFetcher::new();

        let err = fetch_image(&fetcher, &cache, URL).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert!(!cache.path_for(URL).exists());
    }

    #[test]
    fn undecodable_body_is_decode_error() {
        let tmp = TempDir::new().unwrap();
        let cache = ImageCache::new(tmp.path(), 90);
        let fetcher = MockFetcher::new().with_response(URL, b"<html>oops</html>".to_vec());

        let err = fetch_image(&fetcher, &cache, URL).unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }

    #[test]
    fn fetch_error_messages_name_the_url() {
        let err = FetchError::Status {
            url: URL.to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), format!("Request for {URL} returned HTTP 503"));
    }
}

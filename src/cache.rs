//! On-disk caches for the generation pipeline.
//!
//! Two artifacts live under the cache directory:
//!
//! ```text
//! cache_lorcana/
//! ├── cards_cache.json                                # flattened dataset
//! ├── https_cdn.example.com_cards_elsa_large.jpg      # fetched card images
//! └── ...
//! ```
//!
//! ## Dataset cache
//!
//! Flattening the full dataset walks every nested variant and promo, which is
//! the slowest part of a cold start. The flattened list is written once as a
//! versioned JSON document and reused on every later run. Whether a cached
//! copy is still trusted depends on the [`CachePolicy`]:
//!
//! - **`trust`** (default): the cache is used whenever it exists and parses.
//!   Edits to the source dataset are not picked up until the cache is removed
//!   (or `lorcy flatten` is run).
//! - **`mtime`**: the source file's modification time is recorded and must match.
//! - **`content-hash`**: a SHA-256 of the source file is recorded and must match.
//!   Survives `git checkout`, which resets modification times.
//!
//! A cache that fails to parse, or was written by a different
//! [`DATASET_CACHE_VERSION`], is logged and ignored.
//!
//! ## Image cache
//!
//! Fetched images are **content-addressed by URL**: the cache filename is a
//! sanitized form of the URL, so a hit never touches the network. Images are
//! stored re-encoded as JPEG.

use crate::card::Card;
use crate::imaging::Quality;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Name of the flattened dataset cache within the cache directory.
pub const DATASET_CACHE_FILENAME: &str = "cards_cache.json";

/// Version of the dataset cache format. Bump this to invalidate all
/// existing caches when the format or flattening rules change.
pub const DATASET_CACHE_VERSION: u32 = 1;

/// Sanitized URLs longer than this are truncated and suffixed with a digest.
const MAX_KEY_LEN: usize = 150;

/// When a cached flattened dataset may be reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    #[default]
    Trust,
    Mtime,
    ContentHash,
}

impl CachePolicy {
    /// Fingerprint of the source dataset under this policy.
    ///
    /// `Trust` never fingerprints; the other policies need the source file.
    pub fn fingerprint(self, source: &Path) -> io::Result<Option<String>> {
        match self {
            CachePolicy::Trust => Ok(None),
            CachePolicy::Mtime => {
                let modified = std::fs::metadata(source)?.modified()?;
                let since = modified
                    .duration_since(UNIX_EPOCH)
                    .map_err(|e| io::Error::other(e.to_string()))?;
                Ok(Some(format!("mtime:{}.{:09}", since.as_secs(), since.subsec_nanos())))
            }
            CachePolicy::ContentHash => Ok(Some(format!("sha256:{}", hash_file(source)?))),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::Trust => write!(f, "trust"),
            CachePolicy::Mtime => write!(f, "mtime"),
            CachePolicy::ContentHash => write!(f, "content-hash"),
        }
    }
}

/// Flattened dataset as persisted in [`DATASET_CACHE_FILENAME`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetCache {
    pub version: u32,
    /// Source fingerprint recorded at write time (`None` under `trust`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub cards: Vec<Card>,
}

impl DatasetCache {
    pub fn new(fingerprint: Option<String>, cards: Vec<Card>) -> Self {
        Self {
            version: DATASET_CACHE_VERSION,
            fingerprint,
            cards,
        }
    }

    /// Read a cache file. Returns `None` if it doesn't exist, can't be
    /// parsed, or has a different format version.
    pub fn load(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "dataset cache unreadable, reloading");
                return None;
            }
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "dataset cache corrupt, reloading");
                return None;
            }
        };
        if cache.version != DATASET_CACHE_VERSION {
            tracing::warn!(
                path = %path.display(),
                found = cache.version,
                expected = DATASET_CACHE_VERSION,
                "dataset cache version mismatch, reloading"
            );
            return None;
        }
        Some(cache)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Whether this cache may be used given the source's current fingerprint.
    pub fn is_fresh(&self, policy: CachePolicy, current: Option<&str>) -> bool {
        match policy {
            CachePolicy::Trust => true,
            CachePolicy::Mtime | CachePolicy::ContentHash => {
                current.is_some() && self.fingerprint.as_deref() == current
            }
        }
    }
}

/// Resolve the dataset cache path for a cache directory.
pub fn dataset_cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(DATASET_CACHE_FILENAME)
}

/// Filesystem-safe cache key for a URL.
///
/// Every character that is not alphanumeric, `-`, `_` or `.` becomes `_`,
/// so `https://cdn.x/cards/1.jpg?w=2` maps to `https___cdn.x_cards_1.jpg_w_2`.
pub fn cache_key(url: &str) -> String {
    let sanitized: String = url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.len() <= MAX_KEY_LEN {
        return sanitized;
    }
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!("{}-{}", &sanitized[..MAX_KEY_LEN - 17], &digest[..16])
}

/// Content-addressed store of fetched card images.
#[derive(Debug, Clone)]
pub struct ImageCache {
    dir: PathBuf,
    quality: Quality,
}

impl ImageCache {
    /// `quality` is clamped to 1-100.
    pub fn new(dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            dir: dir.into(),
            quality: Quality::new(quality.into()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the image for `url` is (or would be) stored.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", cache_key(url)))
    }

    /// Load a cached image. A file that fails to decode counts as a miss.
    pub fn load(&self, url: &str) -> Option<RgbImage> {
        let path = self.path_for(url);
        if !path.exists() {
            return None;
        }
        match image::open(&path) {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cached image unreadable, refetching");
                None
            }
        }
    }

    /// Persist an image for `url`, creating the cache directory if needed.
    pub fn store(&self, url: &str, img: &RgbImage) -> image::ImageResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(url);
        let file = std::fs::File::create(&path)?;
        let writer = io::BufWriter::new(file);
        img.write_with_encoder(JpegEncoder::new_with_quality(writer, self.quality.value()))?;
        Ok(path)
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Summary of where card images came from during a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub fetches: u32,
    pub synthesized: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn fetch(&mut self) {
        self.fetches += 1;
    }

    pub fn synthesize(&mut self) {
        self.synthesized += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.fetches + self.synthesized
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.hits > 0 {
            parts.push(format!("{} cached", self.hits));
        }
        if self.fetches > 0 {
            parts.push(format!("{} fetched", self.fetches));
        }
        if self.synthesized > 0 {
            parts.push(format!("{} text", self.synthesized));
        }
        if parts.is_empty() {
            return write!(f, "no images");
        }
        if parts.len() == 1 {
            write!(f, "{}", parts[0])
        } else {
            write!(f, "{} ({} total)", parts.join(", "), self.total())
        }
    }
}

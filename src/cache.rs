//! On-disk cache for background-removal results.
//!
//! The removal service is a network round trip and often the slowest step of
//! a `compose` run. Re-running the tool on the same photo (to try another
//! size, color, or crop) should not hit the service again, so successful
//! results are kept on disk as PNG files.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**:
//!
//! - **`source_hash`**: SHA-256 of the uploaded file's bytes. Renaming or
//!   moving the photo keeps the hit; editing it misses.
//! - **`params_hash`**: SHA-256 of the service endpoint. Pointing the tool at
//!   a different removal service produces different cut-outs, so it misses.
//!
//! An entry is stored as `<cache_dir>/<source_hash>-<params prefix>.png`.
//! A file that no longer decodes is treated as a miss.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `compose` to skip both lookup and store. This cache is
//! independent of the session's in-memory result, which always lives for the
//! duration of one upload.

use crate::imaging::{decode_image, encode_png};
use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Hex characters of the params hash kept in file names.
const PARAMS_PREFIX_LEN: usize = 16;

/// Cache key for one upload against one removal service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub source_hash: String,
    pub params_hash: String,
}

impl CacheKey {
    pub fn new(source_bytes: &[u8], endpoint: &str) -> Self {
        Self {
            source_hash: hash_bytes(source_bytes),
            params_hash: hash_removal_params(endpoint),
        }
    }

    fn file_name(&self) -> String {
        format!(
            "{}-{}.png",
            self.source_hash,
            &self.params_hash[..PARAMS_PREFIX_LEN]
        )
    }
}

/// Directory of cached removal results.
#[derive(Debug, Clone)]
pub struct RemovalCache {
    dir: PathBuf,
}

impl RemovalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Cached cut-out for `key`, if present and readable.
    pub fn find(&self, key: &CacheKey) -> Option<RgbaImage> {
        let path = self.path_for(key);
        let bytes = std::fs::read(&path).ok()?;
        match decode_image(&bytes) {
            Ok(image) => {
                tracing::debug!(path = %path.display(), "Removal cache hit");
                Some(image)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "Ignoring unreadable cache entry: {e}");
                None
            }
        }
    }

    /// Store a cut-out under `key`, creating the cache directory if needed.
    pub fn store(&self, key: &CacheKey, image: &RgbaImage) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let png = encode_png(image).map_err(io::Error::other)?;
        std::fs::write(&path, png)?;
        tracing::debug!(path = %path.display(), "Stored removal result");
        Ok(path)
    }
}

/// SHA-256 hash of `bytes`, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}

/// SHA-256 hash of the removal service identity.
pub fn hash_removal_params(endpoint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"removal\0");
    hasher.update(endpoint.as_bytes());
    format!("{:x}", hasher.finalize())
}

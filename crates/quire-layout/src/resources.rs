//! Image intrinsic sizes.
//!
//! [§ 5 Sizing images and objects](https://www.w3.org/TR/css-images-3/#sizing)
//!
//! Decoding is a collaborator's job. The engine only asks for intrinsic
//! dimensions, caches every answer (failures included) and logs each
//! failing URL once.

use std::collections::HashMap;

use quire_common::warning::warn_once;
use serde::Serialize;
use thiserror::Error;

/// "The natural dimensions of an object."
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IntrinsicSize {
    /// Natural width.
    pub width: Option<f32>,
    /// Natural height.
    pub height: Option<f32>,
    /// Natural aspect ratio (width / height).
    pub ratio: Option<f32>,
}

impl IntrinsicSize {
    /// A raster image of `width × height` px.
    #[must_use]
    pub fn pixels(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ratio: (height > 0.0).then(|| width / height),
        }
    }
}

/// Why an image has no intrinsic size.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// The resolver has no such resource.
    #[error("image not found: {0}")]
    NotFound(String),
    /// The resource exists but could not be decoded.
    #[error("image could not be decoded: {0}")]
    Corrupt(String),
}

/// Resolves an image URL to its intrinsic size.
pub trait ImageResolver {
    /// Intrinsic size of the image at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] when the image is missing or broken.
    fn intrinsic_size(&self, url: &str) -> Result<IntrinsicSize, ResourceError>;
}

/// Resolver backed by a fixed table, used by the CLI and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticImageResolver {
    sizes: HashMap<String, IntrinsicSize>,
}

impl StaticImageResolver {
    /// An empty table: every lookup fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `url` with a pixel size.
    pub fn insert(&mut self, url: impl Into<String>, width: f32, height: f32) {
        let _ = self
            .sizes
            .insert(url.into(), IntrinsicSize::pixels(width, height));
    }
}

impl ImageResolver for StaticImageResolver {
    fn intrinsic_size(&self, url: &str) -> Result<IntrinsicSize, ResourceError> {
        self.sizes
            .get(url)
            .copied()
            .ok_or_else(|| ResourceError::NotFound(url.to_owned()))
    }
}

/// Cached resolver answers for one document.
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, Option<IntrinsicSize>>,
}

impl ImageCache {
    /// Intrinsic size of `url`, or `None` when the image failed. A failure
    /// is logged the first time it is seen.
    pub fn get(&mut self, resolver: &dyn ImageResolver, url: &str) -> Option<IntrinsicSize> {
        if let Some(entry) = self.entries.get(url) {
            return *entry;
        }
        let entry = match resolver.intrinsic_size(url) {
            Ok(size) => Some(size),
            Err(err) => {
                let _ = warn_once("Image", &format!("{err}; using no intrinsic size"));
                None
            }
        };
        let _ = self.entries.insert(url.to_owned(), entry);
        entry
    }

    /// Number of cached failures.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.entries.values().filter(|e| e.is_none()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_cached() {
        let resolver = StaticImageResolver::new();
        let mut cache = ImageCache::default();
        assert_eq!(cache.get(&resolver, "missing.png"), None);
        assert_eq!(cache.get(&resolver, "missing.png"), None);
        assert_eq!(cache.failures(), 1);
    }
}

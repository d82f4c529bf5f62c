use std::{fmt, path::PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Opaque reference to an image the presentation layer knows how to show.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageHandle(pub String);

impl ImageHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAsset {
    pub width: u32,
    pub height: u32,
}

/// Turns a handle into something displayable. Failures are never fatal to a
/// session; callers swap in the placeholder.
pub trait AssetResolver: Send + Sync {
    fn resolve(&self, handle: &ImageHandle) -> Result<ResolvedAsset>;
}

/// Treats every handle as loadable. Used when handles are URLs the
/// presentation layer fetches itself.
#[derive(Debug, Clone, Default)]
pub struct PassthroughResolver;

impl AssetResolver for PassthroughResolver {
    fn resolve(&self, _handle: &ImageHandle) -> Result<ResolvedAsset> {
        Ok(ResolvedAsset {
            width: 0,
            height: 0,
        })
    }
}

/// Resolves handles as image files relative to `root`, reading only the header.
#[derive(Debug, Clone)]
pub struct FsAssetResolver {
    root: PathBuf,
}

impl FsAssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetResolver for FsAssetResolver {
    fn resolve(&self, handle: &ImageHandle) -> Result<ResolvedAsset> {
        let path = self.root.join(handle.as_str());
        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("failed to probe image {}", path.display()))?;
        Ok(ResolvedAsset { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_resolver_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(4, 3)
            .save(dir.path().join("face.png"))
            .unwrap();

        let resolver = FsAssetResolver::new(dir.path());
        let asset = resolver.resolve(&ImageHandle::new("face.png")).unwrap();
        assert_eq!(asset, ResolvedAsset { width: 4, height: 3 });
    }

    #[test]
    fn fs_resolver_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FsAssetResolver::new(dir.path());
        let err = resolver.resolve(&ImageHandle::new("nope.jpg")).unwrap_err();
        assert!(err.to_string().contains("nope.jpg"));
    }
}

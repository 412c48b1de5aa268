//! `resources://` image lookups made while a document renders.
//!
//! A template can reference bundled images with
//! `<img src="resources://images/logo.png"/>`. The locator resolves the part
//! after the scheme against its bundle (in-memory entries first, then the
//! resource root directory), decodes the image and applies the configured
//! pixel factor.
//!
//! Lookups never fail the render: a missing or broken resource is logged and
//! comes back as a [`FetchedImage`] without pixels, which the engine renders
//! as an empty region.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;

/// URI scheme handled by [`ResourceLocator`].
pub const RESOURCES_PREFIX: &str = "resources://";

/// Upper bound on the pixel count the scale factor may produce (about
/// 160 MB as RGBA).
pub const MAX_SCALED_PIXELS: u64 = 40_000_000;

/// An image handed back to the rendering engine.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub uri: String,
    /// `None` when the resource could not be read or decoded.
    pub image: Option<DynamicImage>,
}

impl FetchedImage {
    pub fn empty(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            image: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }
}

/// Image-fetch callback used by render engines.
pub trait ImageFetcher {
    /// Returns `None` if `uri` is not handled by this fetcher.
    fn fetch_image(&self, uri: &str) -> Option<FetchedImage>;
}

#[derive(Debug, Clone)]
pub struct ResourceLocator {
    root: PathBuf,
    bundled: HashMap<String, Cow<'static, [u8]>>,
    scale: u32,
}

impl Default for ResourceLocator {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ResourceLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bundled: HashMap::new(),
            scale: 1,
        }
    }

    /// Pixel factor applied to every fetched image (1 leaves it untouched).
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    /// Bundle bytes under a logical path, e.g. `include_bytes!` output.
    pub fn with_bundled(
        mut self,
        path: impl Into<String>,
        bytes: impl Into<Cow<'static, [u8]>>,
    ) -> Self {
        self.bundle(path, bytes);
        self
    }

    pub fn bundle(&mut self, path: impl Into<String>, bytes: impl Into<Cow<'static, [u8]>>) {
        self.bundled.insert(path.into(), bytes.into());
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `uri` uses the `resources://` scheme.
    pub fn handles(uri: &str) -> bool {
        uri.starts_with(RESOURCES_PREFIX)
    }

    /// Raw bytes for a logical path.
    pub fn read(&self, logical: &str) -> Result<Cow<'_, [u8]>, String> {
        if let Some(bytes) = self.bundled.get(logical) {
            return Ok(Cow::Borrowed(&**bytes));
        }
        let relative = Path::new(logical);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(format!("path escapes the resource root: {logical}"));
        }
        std::fs::read(self.root.join(relative))
            .map(Cow::Owned)
            .map_err(|e| e.to_string())
    }

    fn load(&self, logical: &str) -> Result<DynamicImage, String> {
        let bytes = self.read(logical)?;
        let image = image::load_from_memory(&bytes).map_err(|e| e.to_string())?;
        if self.scale == 1 {
            return Ok(image);
        }
        let scale = u64::from(self.scale);
        let width = u64::from(image.width()) * scale;
        let height = u64::from(image.height()) * scale;
        let target = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if width.saturating_mul(height) <= MAX_SCALED_PIXELS => (w, h),
            _ => {
                return Err(format!(
                    "scaling {}x{} by {} exceeds {MAX_SCALED_PIXELS} pixels",
                    image.width(),
                    image.height(),
                    self.scale
                ))
            }
        };
        Ok(image.resize_exact(target.0, target.1, FilterType::Triangle))
    }
}

impl ImageFetcher for ResourceLocator {
    fn fetch_image(&self, uri: &str) -> Option<FetchedImage> {
        let logical = uri.strip_prefix(RESOURCES_PREFIX)?;
        match self.load(logical) {
            Ok(image) => Some(FetchedImage {
                uri: uri.to_string(),
                image: Some(image),
            }),
            Err(e) => {
                log::warn!("Can't read image resource '{uri}': {e}");
                Some(FetchedImage::empty(uri))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedded::{EmbeddedImage, ImageFormat};
    use image::{Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])));
        EmbeddedImage::encode(&img, ImageFormat::Png)
            .unwrap()
            .bytes()
            .to_vec()
    }

    #[test]
    fn ignores_other_schemes() {
        let locator = ResourceLocator::default();
        assert!(locator.fetch_image("https://example.com/a.png").is_none());
        assert!(locator.fetch_image("data:image/png;base64,AAAA").is_none());
    }

    #[test]
    fn loads_from_root_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/logo.png"), png(6, 4)).unwrap();

        let locator = ResourceLocator::new(dir.path());
        let fetched = locator.fetch_image("resources://img/logo.png").unwrap();
        let image = fetched.image.unwrap();
        assert_eq!((image.width(), image.height()), (6, 4));
    }

    #[test]
    fn bundled_entries_win() {
        let locator = ResourceLocator::new("/nonexistent").with_bundled("avatar.png", png(3, 3));
        let fetched = locator.fetch_image("resources://avatar.png").unwrap();
        assert!(!fetched.is_empty());
    }

    #[test]
    fn applies_scale_factor() {
        let locator = ResourceLocator::default()
            .with_bundled("a.png", png(5, 2))
            .with_scale(3);
        let image = locator.fetch_image("resources://a.png").unwrap().image.unwrap();
        assert_eq!((image.width(), image.height()), (15, 6));
    }

    #[test]
    fn oversized_scale_is_empty_not_error() {
        let locator = ResourceLocator::default()
            .with_bundled("photo.png", png(400, 300))
            .with_scale(20);
        assert!(locator.read("photo.png").is_ok());
        assert!(locator.fetch_image("resources://photo.png").unwrap().is_empty());
    }

    #[test]
    fn missing_resource_is_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ResourceLocator::new(dir.path());
        let fetched = locator.fetch_image("resources://missing.png").unwrap();
        assert!(fetched.is_empty());
        assert_eq!(fetched.uri, "resources://missing.png");
    }

    #[test]
    fn undecodable_resource_is_empty() {
        let locator = ResourceLocator::default().with_bundled("bad.png", &b"nope"[..]);
        assert!(locator.fetch_image("resources://bad.png").unwrap().is_empty());
    }

    #[test]
    fn parent_components_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        std::fs::create_dir(&inner).unwrap();
        std::fs::write(dir.path().join("secret.png"), png(2, 2)).unwrap();

        let locator = ResourceLocator::new(&inner);
        assert!(locator.read("../secret.png").is_err());
        assert!(locator.fetch_image("resources://../secret.png").unwrap().is_empty());
    }
}

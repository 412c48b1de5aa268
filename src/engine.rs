//! Rendering engines – turn merged XHTML markup into PDF bytes.
//!
//! The builder talks to an engine only through [`RenderEngine`], so tests and
//! embedders can swap in their own. [`HtmlEngine`] is the default and hands the
//! markup to printpdf's HTML renderer.
//!
//! Markup that is not well-formed XML is rejected before layout. Fonts are
//! looked up by the family names in `font-family`, quoted or not.
//!
//! # Image resolution
//!
//! printpdf needs every image up front, keyed by the exact `src` string used
//! in the markup. Before rendering, [`HtmlEngine`] scans the markup for
//! `<img>` elements and resolves each `src`:
//!
//! - `resources://…` goes through the [`ImageFetcher`] in the context. A
//!   resource that cannot be read becomes a transparent 1×1 placeholder.
//! - `data:image/…;base64,…` is decoded in place.
//! - Anything else is left for printpdf to deal with.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ::image::{DynamicImage, Rgba, RgbaImage};
use printpdf::*;

use crate::embedded::{EmbeddedImage, ImageFormat};
use crate::error::{Error, Result};
use crate::fonts::RegisteredFont;
use crate::markup;
use crate::resources::ImageFetcher;

/// Everything an engine may consult while rendering one document.
pub struct RenderContext<'a> {
    /// Registered fonts at the time of the call.
    pub fonts: &'a [RegisteredFont],
    /// Callback for `resources://` images.
    pub images: &'a dyn ImageFetcher,
}

/// Converts merged markup into a complete PDF.
pub trait RenderEngine {
    /// Render `markup` into PDF bytes. Nothing is written anywhere until the
    /// whole document has been produced.
    fn render(&self, markup: &str, ctx: &RenderContext<'_>) -> Result<Vec<u8>>;
}

impl<E: RenderEngine + ?Sized> RenderEngine for &E {
    fn render(&self, markup: &str, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
        (**self).render(markup, ctx)
    }
}

impl<E: RenderEngine + ?Sized> RenderEngine for Box<E> {
    fn render(&self, markup: &str, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
        (**self).render(markup, ctx)
    }
}

/// printpdf-backed XHTML/CSS renderer.
#[derive(Default)]
pub struct HtmlEngine {
    options: GeneratePdfOptions,
}

impl HtmlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GeneratePdfOptions) -> Self {
        Self { options }
    }
}

impl std::fmt::Debug for HtmlEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlEngine").finish_non_exhaustive()
    }
}

impl RenderEngine for HtmlEngine {
    fn render(&self, markup: &str, ctx: &RenderContext<'_>) -> Result<Vec<u8>> {
        markup::check_well_formed(markup)?;
        let markup = markup::unquote_font_families(markup);
        let images = collect_images(&markup, ctx.images);
        let fonts = collect_fonts(ctx.fonts);
        log::debug!(
            "Rendering {} bytes of markup with {} image(s) and {} font(s)",
            markup.len(),
            images.len(),
            fonts.len()
        );

        let mut warnings = Vec::new();
        let doc = PdfDocument::from_html(&markup, &images, &fonts, &self.options, &mut warnings)
            .map_err(|e| Error::Render(e.to_string()))?;
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        for warning in &warnings {
            log::debug!("printpdf: {warning:?}");
        }

        log::info!("Rendered PDF ({} bytes)", bytes.len());
        Ok(bytes)
    }
}

/// Resolve every image the markup refers to, keyed by its `src`.
fn collect_images(markup: &str, fetcher: &dyn ImageFetcher) -> BTreeMap<String, Base64OrRaw> {
    let mut images = BTreeMap::new();
    for src in markup::image_sources(markup) {
        let bytes = if let Some(fetched) = fetcher.fetch_image(&src) {
            match fetched.image {
                Some(image) => encode_png(&image, &src),
                None => Some(placeholder_png().to_vec()),
            }
        } else if src.starts_with("data:") {
            match EmbeddedImage::from_data_url(&src) {
                Ok(embedded) => Some(embedded.bytes().to_vec()),
                Err(e) => {
                    log::warn!("Skipping inline image: {e}");
                    None
                }
            }
        } else {
            log::debug!("Leaving image '{src}' to the renderer");
            None
        };
        if let Some(bytes) = bytes {
            images.insert(src, Base64OrRaw::Raw(bytes));
        }
    }
    images
}

/// Registered faces keyed by family. printpdf turns each key, cut at the
/// first `.`, into the font name that `font-family` values are matched
/// against, and always reads face 0 of the bytes.
fn collect_fonts(fonts: &[RegisteredFont]) -> BTreeMap<String, Base64OrRaw> {
    fonts
        .iter()
        .filter(|font| {
            if font.index != 0 {
                log::warn!(
                    "Font family '{}' is face {} of a collection and can't be embedded",
                    font.family,
                    font.index
                );
                return false;
            }
            if font.family.contains('.') {
                log::warn!("Font family '{}' contains '.' and will not match", font.family);
            }
            true
        })
        .map(|font| (font.family.clone(), Base64OrRaw::Raw(font.bytes.as_ref().clone())))
        .collect()
}

fn encode_png(image: &DynamicImage, src: &str) -> Option<Vec<u8>> {
    match EmbeddedImage::encode(image, ImageFormat::Png) {
        Ok(encoded) => Some(encoded.bytes().to_vec()),
        Err(e) => {
            log::warn!("Can't encode image resource '{src}': {e}");
            Some(placeholder_png().to_vec())
        }
    }
}

/// A fully transparent 1×1 PNG.
fn placeholder_png() -> &'static [u8] {
    static PLACEHOLDER: OnceLock<Vec<u8>> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        let pixel = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        EmbeddedImage::encode(&pixel, ImageFormat::Png)
            .map(|e| e.bytes().to_vec())
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{FetchedImage, ResourceLocator};
    use ::image::{Rgb, RgbImage};

    fn raw_bytes(value: &Base64OrRaw) -> &[u8] {
        match value {
            Base64OrRaw::Raw(bytes) => bytes,
            _ => panic!("expected raw bytes"),
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 0, 0])));
        EmbeddedImage::encode(&img, ImageFormat::Png)
            .unwrap()
            .bytes()
            .to_vec()
    }

    struct NoImages;

    impl ImageFetcher for NoImages {
        fn fetch_image(&self, _uri: &str) -> Option<FetchedImage> {
            None
        }
    }

    #[test]
    fn resolves_resources_through_fetcher() {
        let locator = ResourceLocator::default().with_bundled("logo.png", png(4, 2));
        let images = collect_images(r#"<img src="resources://logo.png"/>"#, &locator);
        let bytes = raw_bytes(&images["resources://logo.png"]);
        let decoded = ::image::load_from_memory(bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 2));
    }

    #[test]
    fn missing_resource_becomes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ResourceLocator::new(dir.path());
        let images = collect_images(r#"<img src="resources://missing.png"/>"#, &locator);
        let decoded = ::image::load_from_memory(raw_bytes(&images["resources://missing.png"])).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1, 1));
        assert_eq!(decoded.to_rgba8().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn decodes_data_urls_and_skips_bad_ones() {
        let url = EmbeddedImage::from_encoded(png(2, 2), "png").unwrap().to_data_url();
        let markup = format!(r#"<img src="{url}"/><img src="data:image/png;base64,%%%"/>"#);
        let images = collect_images(&markup, &NoImages);
        assert_eq!(images.len(), 1);
        assert_eq!(raw_bytes(&images[&url]), png(2, 2).as_slice());
    }

    #[test]
    fn leaves_other_sources_alone() {
        let images = collect_images(r#"<img src="https://example.com/a.png"/>"#, &NoImages);
        assert!(images.is_empty());
    }

    #[test]
    fn fonts_are_keyed_by_family() {
        let bytes = crate::fonts::tests::tiny_font("Test Sans");
        let fonts = vec![RegisteredFont {
            family: "Test Sans".to_string(),
            path: None,
            index: 0,
            bytes: std::sync::Arc::new(bytes.clone()),
        }];
        let map = collect_fonts(&fonts);
        assert_eq!(raw_bytes(&map["Test Sans"]), bytes.as_slice());
    }

    #[test]
    fn collection_faces_past_the_first_are_skipped() {
        let bytes = std::sync::Arc::new(crate::fonts::tests::tiny_font("Test Serif"));
        let fonts = vec![
            RegisteredFont {
                family: "Test Serif".to_string(),
                path: None,
                index: 1,
                bytes: bytes.clone(),
            },
            RegisteredFont {
                family: "Test Sans".to_string(),
                path: None,
                index: 0,
                bytes,
            },
        ];
        let map = collect_fonts(&fonts);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Test Sans"]);
    }

    #[test]
    fn malformed_markup_fails_before_layout() {
        let ctx = RenderContext {
            fonts: &[],
            images: &NoImages,
        };
        let err = HtmlEngine::new()
            .render("<html><body><div><p>x</body>", &ctx)
            .unwrap_err();
        assert!(matches!(err, Error::Render(ref msg) if msg.starts_with("malformed markup")));
    }

    #[test]
    fn renders_a_pdf() {
        let ctx = RenderContext {
            fonts: &[],
            images: &NoImages,
        };
        let pdf = HtmlEngine::new()
            .render("<html><body><p>Hello</p></body></html>", &ctx)
            .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn engines_work_through_references() {
        let engine: Box<dyn RenderEngine> = Box::new(HtmlEngine::new());
        let ctx = RenderContext {
            fonts: &[],
            images: &NoImages,
        };
        assert!(engine.render("<p>x</p>", &ctx).unwrap().starts_with(b"%PDF"));
    }
}

//! Embedding raster images into templates as `data:` URLs.
//!
//! Two types cooperate here:
//!
//! - [`RasterImage`] holds decoded pixels plus the [`ScaleParameters`] used
//!   to resample them to a size given in pixels, points or millimetres.
//! - [`EmbeddedImage`] is the immutable, encoded result. It renders as
//!   `data:image/<format>;base64,<bytes>` wherever it is merged into a
//!   template, so `<img src="{{{avatar}}}">` just works.
//!
//! ```no_run
//! use motto_html::embedded::RasterImage;
//!
//! # fn main() -> motto_html::Result<()> {
//! let bytes = std::fs::read("photo.jpeg")?;
//! let avatar = RasterImage::decode(&bytes)?
//!     .with_device_pixel_ratio(2)
//!     .scale_with_points(228.0, 128.0)
//!     .to_embedded()?;
//! println!("{}", avatar.to_data_url());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::units::ScaleParameters;

/// Resampling filter used for every resize. Catmull-Rom is a bicubic kernel.
const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

/// The encodings an [`EmbeddedImage`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Short name used in the data-URL media type (`jpeg`, `png`).
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" | "image/jpeg" => Ok(ImageFormat::Jpeg),
            "png" | "image/png" => Ok(ImageFormat::Png),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// EmbeddedImage
// ---------------------------------------------------------------------------

/// An encoded image ready to be placed in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl EmbeddedImage {
    /// Wrap bytes that are already encoded. The bytes are stored verbatim;
    /// only the declared format is checked.
    pub fn from_encoded(bytes: impl Into<Vec<u8>>, format: &str) -> Result<Self> {
        let format = format.parse()?;
        Ok(Self {
            bytes: bytes.into(),
            format,
        })
    }

    /// Read already-encoded bytes from a stream.
    pub fn from_reader<R: Read>(mut reader: R, format: &str) -> Result<Self> {
        let format: ImageFormat = format.parse()?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self { bytes, format })
    }

    /// Encode decoded pixels.
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Self> {
        let mut bytes = Vec::new();
        match format {
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut Cursor::new(&mut bytes), format.codec())?,
            ImageFormat::Png => image.write_to(&mut Cursor::new(&mut bytes), format.codec())?,
        }
        Ok(Self { bytes, format })
    }

    /// Parse a `data:image/<format>;base64,<data>` URL.
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| Error::Image("not a data URL".to_string()))?;
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| Error::Image("data URL is missing the `,` separator".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::Image("only base64 data URLs are supported".to_string()))?;
        let format: ImageFormat = mime.parse()?;
        let bytes = BASE64_STD
            .decode(data.trim())
            .map_err(|e| Error::Image(format!("base64 decode error: {e}")))?;
        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// `data:image/<format>;base64,<bytes>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            BASE64_STD.encode(&self.bytes)
        )
    }

    /// Decode the stored bytes back into pixels.
    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory_with_format(
            &self.bytes,
            self.format.codec(),
        )?)
    }
}

impl fmt::Display for EmbeddedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_data_url())
    }
}

/// Templates see an embedded image as its data URL.
impl Serialize for EmbeddedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl From<EmbeddedImage> for serde_json::Value {
    fn from(image: EmbeddedImage) -> Self {
        serde_json::Value::String(image.to_data_url())
    }
}

impl From<&EmbeddedImage> for serde_json::Value {
    fn from(image: &EmbeddedImage) -> Self {
        serde_json::Value::String(image.to_data_url())
    }
}

// ---------------------------------------------------------------------------
// RasterImage
// ---------------------------------------------------------------------------

/// Decoded pixels with the ratios used to scale them.
///
/// Scaling never touches the receiver; each `scale_with_*` call returns a
/// new image of exactly `target * device_pixel_ratio` pixels per side.
/// Aspect ratio is not preserved for you.
#[derive(Debug, Clone)]
pub struct RasterImage {
    image: DynamicImage,
    params: ScaleParameters,
}

impl RasterImage {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image,
            params: ScaleParameters::default(),
        }
    }

    /// Decode JPEG or PNG bytes; the format is sniffed from the content.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_dynamic(image::load_from_memory(bytes)?))
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    pub fn with_scale_parameters(mut self, params: ScaleParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_dots_per_point(mut self, dots_per_point: f32) -> Self {
        self.params.dots_per_point = dots_per_point;
        self
    }

    pub fn with_dots_per_pixel(mut self, dots_per_pixel: u32) -> Self {
        self.params.dots_per_pixel = dots_per_pixel;
        self
    }

    /// Integer factor every scale target is multiplied by.
    pub fn with_device_pixel_ratio(mut self, ratio: u32) -> Self {
        self.params.device_pixel_ratio = ratio;
        self
    }

    pub fn scale_parameters(&self) -> ScaleParameters {
        self.params
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Resample to `width x height` pixels times the device pixel ratio.
    /// Zero-sized targets are clamped to one pixel.
    pub fn scale_with_pixels(&self, width: u32, height: u32) -> Self {
        let target_w = self.params.apply_ratio(width).max(1);
        let target_h = self.params.apply_ratio(height).max(1);
        log::debug!(
            "scaling image {}x{} -> {}x{}",
            self.width(),
            self.height(),
            target_w,
            target_h
        );
        Self {
            image: self.image.resize_exact(target_w, target_h, RESAMPLE_FILTER),
            params: self.params,
        }
    }

    pub fn scale_with_points(&self, width: f64, height: f64) -> Self {
        self.scale_with_pixels(
            self.params.points_to_pixels(width),
            self.params.points_to_pixels(height),
        )
    }

    pub fn scale_with_millimetres(&self, width: f64, height: f64) -> Self {
        self.scale_with_pixels(
            self.params.millimetres_to_pixels(width),
            self.params.millimetres_to_pixels(height),
        )
    }

    /// Encode as JPEG, whatever the source format was.
    pub fn to_embedded(&self) -> Result<EmbeddedImage> {
        EmbeddedImage::encode(&self.image, ImageFormat::Jpeg)
    }

    pub fn encode(&self, format: ImageFormat) -> Result<EmbeddedImage> {
        EmbeddedImage::encode(&self.image, format)
    }

    /// Write the current pixels as JPEG. Meant for eyeballing scale results.
    pub fn export_jpeg<W: Write>(&self, out: &mut W) -> Result<()> {
        let encoded = self.to_embedded()?;
        out.write_all(encoded.bytes())?;
        Ok(())
    }
}

impl From<DynamicImage> for RasterImage {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

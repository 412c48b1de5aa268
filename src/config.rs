//! Builder configuration – the knobs shared by the document builder, the
//! resource locator and the image helpers. Serialisable so callers can keep
//! it next to their templates as JSON.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::units::{DEFAULT_DEVICE_PIXEL_RATIO, DEFAULT_DOTS_PER_PIXEL, DEFAULT_DOTS_PER_POINT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Dots per typographic point (default: 26.67).
    pub dots_per_point: f32,
    /// Dots per CSS pixel (default: 20).
    pub dots_per_pixel: u32,
    /// Oversampling factor for embedded images (default: 1).
    pub device_pixel_ratio: u32,
    /// Directory that named templates are resolved against.
    pub template_root: PathBuf,
    /// Directory that `resources://` URIs are resolved against.
    pub resource_root: PathBuf,
    /// Pixel factor the resource locator applies to fetched images.
    pub resource_scale: u32,
    /// HTML-escape `{{value}}` output. `{{{value}}}` is never escaped.
    pub escape_html: bool,
    /// Fail rendering when the template references a missing merge key.
    pub strict: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            dots_per_point: DEFAULT_DOTS_PER_POINT,
            dots_per_pixel: DEFAULT_DOTS_PER_PIXEL,
            device_pixel_ratio: DEFAULT_DEVICE_PIXEL_RATIO,
            template_root: PathBuf::from("."),
            resource_root: PathBuf::from("."),
            resource_scale: 1,
            escape_html: true,
            strict: false,
        }
    }
}

impl BuilderConfig {
    /// Serialise to JSON. Fails for paths that are not valid UTF-8.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialise from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = root.into();
        self
    }

    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = BuilderConfig::from_json(r#"{ "dots_per_pixel": 10, "strict": true }"#).unwrap();
        assert_eq!(config.dots_per_pixel, 10);
        assert!(config.strict);
        assert_eq!(config.device_pixel_ratio, 1);
        assert!(config.escape_html);
        assert_eq!(config.template_root, PathBuf::from("."));
    }

    #[test]
    fn json_roundtrip() {
        let config = BuilderConfig::default().with_template_root("templates");
        let parsed = BuilderConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_root_does_not_serialise() {
        use std::os::unix::ffi::OsStrExt;

        let root = std::ffi::OsStr::from_bytes(b"templates-\xff");
        let config = BuilderConfig::default().with_template_root(root);
        assert!(matches!(config.to_json(), Err(crate::Error::Serialize(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(BuilderConfig::from_json("{ not json").is_err());
    }
}

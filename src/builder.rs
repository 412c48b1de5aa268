//! Document builder – merges data into a loaded template and renders a PDF.
//!
//! A builder moves through three states:
//!
//! ```text
//! Created ──load_template*──▶ TemplateLoaded ──save──▶ Rendered
//!                                   ▲                     │
//!                                   └──────reset──────────┘
//! ```
//!
//! `reset` clears the merge state but keeps the parsed template, so one
//! builder can produce many documents from a single parse.
//!
//! ```no_run
//! use motto_html::DocumentBuilder;
//!
//! # fn main() -> motto_html::Result<()> {
//! let mut out = std::fs::File::create("hello.pdf")?;
//! DocumentBuilder::new()
//!     .load_template_from_str("<html><body><p>Hello {{name}}</p></body></html>")?
//!     .merge("name", "Ada")
//!     .save(&mut out)?;
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::BuilderConfig;
use crate::embedded::RasterImage;
use crate::engine::{HtmlEngine, RenderContext, RenderEngine};
use crate::error::{Error, Result};
use crate::fonts::FontRegistry;
use crate::resources::ResourceLocator;
use crate::template::{LoadedTemplate, TemplateOptions};
use crate::units::ScaleParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    Created,
    TemplateLoaded,
    Rendered,
}

/// Fluent builder for one document cycle at a time. Not meant to be shared
/// between threads; give each concurrent job its own builder.
#[derive(Debug)]
pub struct DocumentBuilder<E: RenderEngine = HtmlEngine> {
    engine: E,
    fonts: FontRegistry,
    locator: ResourceLocator,
    config: BuilderConfig,
    template: Option<LoadedTemplate>,
    merge_state: Map<String, Value>,
    state: BuilderState,
}

impl DocumentBuilder<HtmlEngine> {
    /// Builder with the default configuration, sharing the process-wide
    /// font registry.
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        let locator = ResourceLocator::new(&config.resource_root).with_scale(config.resource_scale);
        Self::with_parts(HtmlEngine::new(), FontRegistry::global().clone(), locator, config)
    }
}

impl Default for DocumentBuilder<HtmlEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RenderEngine> DocumentBuilder<E> {
    /// Builder over explicitly supplied collaborators.
    pub fn with_parts(
        engine: E,
        fonts: FontRegistry,
        locator: ResourceLocator,
        config: BuilderConfig,
    ) -> Self {
        Self {
            engine,
            fonts,
            locator,
            config,
            template: None,
            merge_state: Map::new(),
            state: BuilderState::Created,
        }
    }

    // ── Template loading ──────────────────────────────────────────────────

    /// Load a template file relative to the configured template root.
    pub fn load_template(&mut self, name: &str) -> Result<&mut Self> {
        let template =
            LoadedTemplate::from_file(&self.config.template_root, name, self.template_options())?;
        Ok(self.set_template(template))
    }

    pub fn load_template_from_reader<R: Read>(&mut self, reader: R) -> Result<&mut Self> {
        let template = LoadedTemplate::from_reader(reader, self.template_options())?;
        Ok(self.set_template(template))
    }

    pub fn load_template_from_str(&mut self, source: &str) -> Result<&mut Self> {
        let template = LoadedTemplate::parse(source, self.template_options())?;
        Ok(self.set_template(template))
    }

    fn template_options(&self) -> TemplateOptions {
        TemplateOptions::from(&self.config)
    }

    fn set_template(&mut self, template: LoadedTemplate) -> &mut Self {
        log::debug!("Template '{}' loaded", template.name());
        self.template = Some(template);
        self.state = BuilderState::TemplateLoaded;
        self
    }

    // ── Merge state ───────────────────────────────────────────────────────

    /// Insert or overwrite one merge value.
    pub fn merge(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.merge_state.insert(key.into(), value.into());
        self
    }

    /// Merge any serializable value, e.g. a struct of row data.
    pub fn merge_serialize<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.merge(key, value))
    }

    /// Merge every entry of a mapping.
    pub fn merge_all<K, V, I>(&mut self, entries: I) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.merge_state.insert(key.into(), value.into());
        }
        self
    }

    /// Decode an image, scale it to `width` × `height` points with this
    /// builder's [`scale_parameters`](Self::scale_parameters) and merge it
    /// under `key` as a JPEG data URL.
    pub fn merge_image(
        &mut self,
        key: impl Into<String>,
        bytes: &[u8],
        width: f64,
        height: f64,
    ) -> Result<&mut Self> {
        let embedded = RasterImage::decode(bytes)?
            .with_scale_parameters(self.scale_parameters())
            .scale_with_points(width, height)
            .to_embedded()?;
        Ok(self.merge(key, embedded))
    }

    /// Merge the top-level entries of a JSON object. Other JSON values are
    /// rejected.
    pub fn merge_json(&mut self, value: Value) -> Result<&mut Self> {
        match value {
            Value::Object(map) => Ok(self.merge_all(map)),
            Value::Null => Ok(self),
            other => Err(Error::Serialize(format!(
                "expected a JSON object of merge values, got {other}"
            ))),
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────

    /// The template merged with the current merge state.
    pub fn render_markup(&self) -> Result<String> {
        let template = self.template.as_ref().ok_or(Error::TemplateNotLoaded)?;
        template.render(&Value::Object(self.merge_state.clone()))
    }

    /// Render the complete PDF in memory.
    pub fn render_pdf(&mut self) -> Result<Vec<u8>> {
        let markup = self.render_markup()?;
        let fonts = self.fonts.snapshot();
        let ctx = RenderContext {
            fonts: &fonts,
            images: &self.locator,
        };
        let pdf = self.engine.render(&markup, &ctx)?;
        self.state = BuilderState::Rendered;
        Ok(pdf)
    }

    /// Render and write the PDF to `out`. Nothing is written unless the
    /// whole document rendered. The sink is left open.
    pub fn save<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<&mut Self> {
        let pdf = self.render_pdf()?;
        out.write_all(&pdf)?;
        out.flush()?;
        Ok(self)
    }

    /// Clear the merge state for the next document. The template is kept.
    pub fn reset(&mut self) -> &mut Self {
        self.merge_state.clear();
        self.state = if self.template.is_some() {
            BuilderState::TemplateLoaded
        } else {
            BuilderState::Created
        };
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn state(&self) -> BuilderState {
        self.state
    }

    pub fn merge_state(&self) -> &Map<String, Value> {
        &self.merge_state
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Scaling parameters images embedded into this builder's documents should use.
    pub fn scale_parameters(&self) -> ScaleParameters {
        ScaleParameters::from(&self.config)
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    pub fn resources(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn resources_mut(&mut self) -> &mut ResourceLocator {
        &mut self.locator
    }

    /// Register a font with this builder's registry. See [`FontRegistry::add_font`].
    pub fn add_font(&mut self, spec: &str) -> Result<&mut Self> {
        self.fonts.add_font(spec)?;
        Ok(self)
    }
}

//! Template loading – parses Handlebars markup once so it can be merged
//! with fresh data for every document.

use std::fmt;
use std::io::Read;
use std::path::Path;

use handlebars::Handlebars;
use serde_json::Value;

use crate::config::BuilderConfig;
use crate::error::{Error, Result};

/// Name used for templates that did not come from a file.
const INLINE_TEMPLATE: &str = "inline";

/// How merged values are written into the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateOptions {
    pub escape_html: bool,
    pub strict: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            escape_html: true,
            strict: false,
        }
    }
}

impl From<&BuilderConfig> for TemplateOptions {
    fn from(config: &BuilderConfig) -> Self {
        Self {
            escape_html: config.escape_html,
            strict: config.strict,
        }
    }
}

/// A parsed template, immutable once loaded.
pub struct LoadedTemplate {
    registry: Handlebars<'static>,
    name: String,
}

impl LoadedTemplate {
    /// Parse template source held in memory.
    pub fn parse(source: &str, options: TemplateOptions) -> Result<Self> {
        Self::register(INLINE_TEMPLATE.to_string(), source, options)
    }

    /// Read and parse a template from a stream.
    pub fn from_reader<R: Read>(mut reader: R, options: TemplateOptions) -> Result<Self> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        Self::parse(&source, options)
    }

    /// Load `name` relative to `root`.
    pub fn from_file(root: &Path, name: &str, options: TemplateOptions) -> Result<Self> {
        let path = root.join(name);
        if !path.is_file() {
            return Err(Error::TemplateNotFound(path));
        }
        let source = std::fs::read_to_string(&path)?;
        log::debug!("Loaded template {}", path.display());
        Self::register(name.to_string(), &source, options)
    }

    fn register(name: String, source: &str, options: TemplateOptions) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(options.strict);
        if !options.escape_html {
            registry.register_escape_fn(handlebars::no_escape);
        }
        registry.register_template_string(&name, source)?;
        Ok(Self { registry, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merge `data` into the template and return the resulting markup.
    pub fn render(&self, data: &Value) -> Result<String> {
        Ok(self.registry.render(&self.name, data)?)
    }
}

impl fmt::Debug for LoadedTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

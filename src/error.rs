//! Error types shared by every stage of document generation.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("template not found: {0}")]
    TemplateNotFound(PathBuf),
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("template render error: {0}")]
    TemplateRender(String),
    #[error("no template loaded; call one of the load_template methods before save")]
    TemplateNotLoaded,
    #[error("unsupported image format: {0:?} (expected \"jpeg\" or \"png\")")]
    UnsupportedFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(String),
    #[error("cannot load font '{path}': {reason}")]
    Font { path: PathBuf, reason: String },
    #[error("PDF rendering error: {0}")]
    Render(String),
    #[error("cannot convert merge value: {0}")]
    Serialize(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Error::TemplateParse(err.to_string())
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::TemplateRender(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

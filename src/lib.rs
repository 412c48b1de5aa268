//! # motto-html – Template-driven HTML → PDF documents
//!
//! This crate merges data into Handlebars templates and renders the
//! resulting XHTML into PDF. The stages are:
//!
//! 1. **Load** – parse a template once ([`template`])
//! 2. **Merge** – collect key/value merge state on a [`DocumentBuilder`] ([`builder`])
//! 3. **Resolve** – find `<img>` references ([`markup`]) and load
//!    `resources://` images ([`resources`])
//! 4. **Render** – hand markup, fonts and images to a [`RenderEngine`] ([`engine`])
//!
//! Images can be embedded directly as data URLs with resolution-aware
//! scaling via [`embedded`] and [`units`]. Fonts are registered by family in
//! a [`FontRegistry`] ([`fonts`], [`font_paths`]).
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod builder;
pub mod config;
pub mod embedded;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod font_paths;
pub mod fonts;
pub mod markup;
pub mod resources;
pub mod template;
pub mod templates;
pub mod units;

// Re-exports for convenience
pub use builder::{BuilderState, DocumentBuilder};
pub use config::BuilderConfig;
pub use embedded::{EmbeddedImage, ImageFormat, RasterImage};
pub use engine::{HtmlEngine, RenderContext, RenderEngine};
pub use error::{Error, Result};
pub use fonts::{FontRegistry, RegisteredFont};
pub use resources::{FetchedImage, ImageFetcher, ResourceLocator};
pub use units::ScaleParameters;

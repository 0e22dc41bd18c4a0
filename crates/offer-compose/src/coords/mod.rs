//! Template coordinate maps
//!
//! A template is a directory holding a `manifest.json` and the background
//! files it names. Loading validates every rectangle and converts it into
//! PDF space once, so nothing downstream deals with origins.

mod loader;
mod map;
mod origin;

pub use loader::{Background, MANIFEST_FILE, TemplateLoader, TemplatePage, TemplateSet};
pub use map::{CoordinateMap, Placeholder, ResolvedStyle, StyleHint};
pub use origin::{Origin, from_pdf_space, to_pdf_space};

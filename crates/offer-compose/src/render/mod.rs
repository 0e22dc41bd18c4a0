//! PDF rendering primitives
//!
//! - Content stream building on a per-page [`Canvas`]
//! - Helvetica text metrics and fitting
//! - Raster image embedding
//! - Deep copying pages between documents
//! - Writing finished pages into a document

mod canvas;
pub(crate) mod raster;
pub mod text;
mod writer;
pub(crate) mod xobject;

pub use canvas::{Canvas, FontFace};
pub use raster::{DecodedImage, image_dimensions};
pub use writer::{PageWriter, set_info, to_bytes, write_pages};
pub use xobject::{ObjectCopier, get_page_dimensions, inherited_attribute};

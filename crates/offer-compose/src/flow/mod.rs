//! Flow layout for the extended pages
//!
//! Dynamic content (headings, paragraphs, tables, financing blocks) is
//! measured, laid out onto as many pages as it needs, and painted.

mod composer;
mod element;
mod measure;
mod paint;

pub use composer::{
    ComposerState, FlowComposer, FlowLayout, LaidOutPage, PageState, PlacedBlock,
    ProtectionDecision, ProtectionEntry,
};
pub use element::{FlowElement, FlowKind};
pub use measure::Block;
pub use paint::paint_flow_page;

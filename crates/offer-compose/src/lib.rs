//! Offer document composition
//!
//! Turns a page-background template, its coordinate map and precomputed
//! values into a finished PDF, extends it with flow-composed pages and
//! attachments, and repeats this across recipients in batch runs.

pub mod assemble;
pub mod batch;
pub mod collab;
pub mod constants;
pub mod coords;
pub mod decorate;
pub mod flow;
mod format;
pub mod job;
mod options;
pub mod pipeline;
pub mod render;
pub mod substitute;
mod types;

pub use assemble::{AssembledDocument, Segment, SegmentKind, assemble};
pub use batch::{
    BatchCancel, BatchOutput, BatchReport, BatchResult, CatalogJobFactory, FailureReason,
    JobFactory, Orchestrator, RecipientContext, RecipientSpec, escalated_price,
    load_recipients_csv, rotation_index,
};
pub use collab::{
    ChartRenderer, CollaboratorError, DirectoryStore, DocumentStore, NoCharts, NoDocuments,
};
pub use coords::{Origin, TemplateLoader, TemplateSet, to_pdf_space};
pub use decorate::{PageDecorator, StandardDecorator, render_flow};
pub use flow::{FlowComposer, FlowElement, FlowKind};
pub use format::AmountFormat;
pub use job::JobFile;
pub use options::*;
pub use pipeline::{
    ComposeContext, ComposedDocument, Deadline, DocumentJob, SharedContext, compose_document,
    compose_document_sync,
};
pub use substitute::{Value, ValueTable, render_page};
pub use types::*;

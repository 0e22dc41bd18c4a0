//! Multi-recipient batch runs

mod archive;
mod catalog;
mod orchestrator;
mod recipient;
mod report;
mod rotation;

pub use archive::{REPORT_ENTRY, entry_name, slugify, write_archive};
pub use catalog::{
    BatchFile, CandidateFile, CatalogJobFactory, JobFactory, RECIPIENT_TOKEN_PREFIX,
    RecipientContext,
};
pub use orchestrator::{
    BatchCancel, BatchOutput, BatchResult, FailureReason, Orchestrator, RecipientResult,
};
pub use recipient::{RecipientSpec, load_recipients_csv, parse_recipients};
pub use report::{BatchReport, OutcomeStatus, RecipientOutcome};
pub use rotation::{escalated_price, rotation_index, round_cents};

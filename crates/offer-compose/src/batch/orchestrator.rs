//! Running one template across many recipients
//!
//! Recipients are processed on a bounded pool: a semaphore limits how many
//! documents are in flight, every document runs on the blocking pool under a
//! timeout, and finished results are sent over a channel to a single
//! collector. A recipient failure never stops the batch.

use super::archive::{entry_name, write_archive};
use super::catalog::{JobFactory, RecipientContext};
use super::recipient::RecipientSpec;
use super::report::{BatchReport, OutcomeStatus, RecipientOutcome};
use super::rotation::{escalated_price, rotation_index};
use crate::coords::TemplateSet;
use crate::options::BatchOptions;
use crate::pipeline::{ComposedDocument, Deadline, SharedContext, compose_document_sync};
use crate::types::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

// =============================================================================
// Results
// =============================================================================

/// Why a recipient produced no document
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Error(String),
    Timeout,
    Panicked(String),
    /// The batch was cancelled before this recipient started
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Error(msg) => write!(f, "{}", msg),
            FailureReason::Timeout => write!(f, "timed out"),
            FailureReason::Panicked(msg) => write!(f, "panicked: {}", msg),
            FailureReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum BatchResult {
    Success(ComposedDocument),
    Failure(FailureReason),
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchResult::Success(_))
    }

    fn from_error(e: ComposeError) -> Self {
        match e {
            ComposeError::Timeout => BatchResult::Failure(FailureReason::Timeout),
            ComposeError::Cancelled => BatchResult::Failure(FailureReason::Cancelled),
            other => BatchResult::Failure(FailureReason::Error(other.to_string())),
        }
    }
}

/// Outcome for one recipient, in batch order
#[derive(Debug, Clone)]
pub struct RecipientResult {
    pub recipient: RecipientSpec,
    /// Archive entry name, for successes
    pub file: Option<String>,
    pub result: BatchResult,
}

/// Everything a batch run produces
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Zip with one PDF per success plus the report; empty when packaging failed
    pub archive: Vec<u8>,
    /// Why the archive could not be written
    pub archive_error: Option<String>,
    pub report: BatchReport,
    pub results: Vec<RecipientResult>,
}

// =============================================================================
// Cancellation
// =============================================================================

/// Handle for stopping a running batch.
///
/// Cancelling stops new recipients from starting. Recipients already in
/// flight run to completion or to their timeout.
#[derive(Debug, Clone, Default)]
pub struct BatchCancel {
    flag: Arc<AtomicBool>,
}

impl BatchCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct Orchestrator {
    template: Arc<TemplateSet>,
    factory: Arc<dyn JobFactory>,
    context: SharedContext,
    options: BatchOptions,
}

impl Orchestrator {
    pub fn new(
        template: Arc<TemplateSet>,
        factory: Arc<dyn JobFactory>,
        context: SharedContext,
        options: BatchOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            template,
            factory,
            context,
            options,
        })
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Product selection and price for the recipient at `position`
    pub fn plan(&self, recipient: &RecipientSpec, position: usize) -> RecipientContext {
        let selections: BTreeMap<String, usize> = self
            .factory
            .categories()
            .into_iter()
            .map(|(category, len)| {
                let index = rotation_index(
                    len,
                    recipient.cursor(&category),
                    self.options.step_for(&category),
                    position,
                );
                (category, index)
            })
            .collect();

        let price = self
            .factory
            .base_price(&selections)
            .map(|base| escalated_price(base, self.options.escalation_rate, position));

        RecipientContext {
            recipient: recipient.clone(),
            position,
            selections,
            price,
        }
    }

    /// Process every recipient and package the successes.
    ///
    /// Positions are reassigned from list order. The returned results and
    /// report always cover every recipient, even when the archive cannot be
    /// written.
    pub async fn run(&self, recipients: Vec<RecipientSpec>, cancel: &BatchCancel) -> BatchOutput {
        let total = recipients.len();
        log::info!(
            "Starting batch for template '{}': {} recipients, {} workers",
            self.template.id,
            total,
            self.options.workers
        );

        let semaphore = Arc::new(Semaphore::new(self.options.workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, RecipientSpec, BatchResult)>();

        for (position, mut recipient) in recipients.into_iter().enumerate() {
            recipient.position = position;

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) if !cancel.is_cancelled() => permit,
                _ => {
                    log::warn!("Recipient '{}' not started: batch cancelled", recipient.id);
                    let _ = tx.send((
                        position,
                        recipient,
                        BatchResult::Failure(FailureReason::Cancelled),
                    ));
                    continue;
                }
            };

            let plan = self.plan(&recipient, position);
            let template = Arc::clone(&self.template);
            let factory = Arc::clone(&self.factory);
            let context = self.context.clone();
            let timeout = self.options.timeout();
            let tx = tx.clone();

            tokio::spawn(async move {
                let result = run_recipient(template, factory, context, plan, timeout).await;
                drop(permit);
                let _ = tx.send((position, recipient, result));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<(RecipientSpec, BatchResult)>> =
            (0..total).map(|_| None).collect();
        while let Some((position, recipient, result)) = rx.recv().await {
            match &result {
                BatchResult::Success(doc) => log::info!(
                    "Recipient '{}' ({}): {} pages",
                    recipient.id,
                    position,
                    doc.page_count
                ),
                BatchResult::Failure(reason) => log::warn!(
                    "Recipient '{}' ({}) failed: {}",
                    recipient.id,
                    position,
                    reason
                ),
            }
            if let Some(slot) = slots.get_mut(position) {
                *slot = Some((recipient, result));
            }
        }

        let results: Vec<RecipientResult> = slots
            .into_iter()
            .enumerate()
            .map(|(position, slot)| {
                let (recipient, result) = slot.unwrap_or_else(|| {
                    (
                        RecipientSpec::new(format!("#{}", position), position),
                        BatchResult::Failure(FailureReason::Panicked(
                            "worker task ended without a result".to_string(),
                        )),
                    )
                });
                let file = result.is_success().then(|| {
                    entry_name(
                        &self.options.file_prefix,
                        position,
                        &recipient.id,
                        &recipient.name,
                    )
                });
                RecipientResult {
                    recipient,
                    file,
                    result,
                }
            })
            .collect();

        package(&self.template.id, results)
    }
}

/// Build the report and archive from ordered results
fn package(template_id: &str, results: Vec<RecipientResult>) -> BatchOutput {
    let outcomes = results.iter().map(outcome).collect();
    let report = BatchReport::new(template_id.to_string(), outcomes);

    let documents = results.iter().filter_map(|r| match (&r.file, &r.result) {
        (Some(file), BatchResult::Success(doc)) => Some((file.as_str(), doc.bytes.as_slice())),
        _ => None,
    });
    let written = report
        .to_json()
        .and_then(|json| write_archive(documents, &json));

    let (archive, archive_error) = match written {
        Ok(archive) => (archive, None),
        Err(e) => {
            log::error!("Failed to write batch archive: {}", e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    log::info!(
        "Batch finished: {} of {} succeeded, archive {} bytes",
        report.succeeded,
        report.total,
        archive.len()
    );

    BatchOutput {
        archive,
        archive_error,
        report,
        results,
    }
}

/// Build one recipient's document under a timeout
async fn run_recipient(
    template: Arc<TemplateSet>,
    factory: Arc<dyn JobFactory>,
    context: SharedContext,
    plan: RecipientContext,
    timeout: Duration,
) -> BatchResult {
    let abandoned = Arc::new(AtomicBool::new(false));
    let deadline = Deadline::after(timeout).with_abandon_flag(Arc::clone(&abandoned));

    let task = tokio::task::spawn_blocking(move || {
        let job = factory.build(&plan)?;
        deadline.check()?;
        compose_document_sync(&template, &job, context.as_context(), &deadline)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(doc))) => BatchResult::Success(doc),
        Ok(Ok(Err(e))) => BatchResult::from_error(e),
        Ok(Err(join)) if join.is_panic() => {
            BatchResult::Failure(FailureReason::Panicked(panic_message(join.into_panic())))
        }
        Ok(Err(join)) => BatchResult::Failure(FailureReason::Error(join.to_string())),
        Err(_) => {
            // The blocking thread stops at its next deadline check
            abandoned.store(true, Ordering::Relaxed);
            BatchResult::Failure(FailureReason::Timeout)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn outcome(result: &RecipientResult) -> RecipientOutcome {
    let (status, reason, warnings) = match &result.result {
        BatchResult::Success(doc) => (
            OutcomeStatus::Success,
            None,
            doc.warnings.iter().map(|w| w.to_string()).collect(),
        ),
        BatchResult::Failure(reason) => {
            (OutcomeStatus::Failure, Some(reason.to_string()), Vec::new())
        }
    };
    RecipientOutcome {
        recipient_id: result.recipient.id.clone(),
        position: result.recipient.position,
        status,
        file: result.file.clone(),
        reason,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(id: &str, position: usize, file: &str) -> RecipientResult {
        RecipientResult {
            recipient: RecipientSpec::new(id, position),
            file: Some(file.to_string()),
            result: BatchResult::Success(ComposedDocument {
                bytes: b"%PDF-1.7".to_vec(),
                page_count: 1,
                fixed_pages: 1,
                flow_pages: 0,
                warnings: Vec::new(),
                protection_log: Vec::new(),
            }),
        }
    }

    #[test]
    fn test_archive_failure_keeps_report() {
        // Two entries with one name cannot both go into the zip
        let results = vec![success("a", 0, "same.pdf"), success("b", 1, "same.pdf")];
        let output = package("standard", results);

        assert!(output.archive.is_empty());
        assert!(output.archive_error.is_some());
        assert_eq!(output.report.total, 2);
        assert_eq!(output.report.succeeded, 2);
        assert_eq!(output.results.len(), 2);
    }

    #[test]
    fn test_package_writes_archive() {
        let output = package("standard", vec![success("a", 0, "001_a.pdf")]);
        assert!(output.archive_error.is_none());
        assert!(!output.archive.is_empty());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(FailureReason::Timeout.to_string(), "timed out");
        assert_eq!(FailureReason::Cancelled.to_string(), "cancelled");
        assert_eq!(
            FailureReason::Panicked("boom".to_string()).to_string(),
            "panicked: boom"
        );
    }
}

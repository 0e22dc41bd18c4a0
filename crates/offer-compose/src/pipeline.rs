//! Single-document pipeline
//!
//! fixed template pages -> flow pages -> attachments -> assembly. The caller
//! gets either the complete document or one fatal error.

use crate::assemble::{Segment, assemble};
use crate::collab::{ChartRenderer, DocumentStore, NoCharts, NoDocuments};
use crate::coords::TemplateSet;
use crate::decorate::{StandardDecorator, render_flow};
use crate::flow::{FlowElement, ProtectionEntry};
use crate::options::RenderOptions;
use crate::substitute::{ValueTable, render_page};
use crate::types::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// =============================================================================
// Deadline
// =============================================================================

/// Cooperative time limit checked between pipeline steps.
///
/// Work running on a blocking thread cannot be interrupted from outside, so
/// the pipeline polls this between pages and between flow units.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    abandoned: Option<Arc<AtomicBool>>,
}

impl Deadline {
    /// No limit
    pub fn none() -> Self {
        Self::default()
    }

    pub fn after(limit: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(limit),
            abandoned: None,
        }
    }

    /// Also stop once `flag` is set
    pub fn with_abandon_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abandoned = Some(flag);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn check(&self) -> Result<()> {
        if self
            .abandoned
            .as_ref()
            .is_some_and(|f| f.load(Ordering::Relaxed))
        {
            return Err(ComposeError::Cancelled);
        }
        if self.is_expired() {
            return Err(ComposeError::Timeout);
        }
        Ok(())
    }
}

// =============================================================================
// Job and Context
// =============================================================================

/// Everything that varies between documents built from one template
#[derive(Debug, Clone, Default)]
pub struct DocumentJob {
    pub values: ValueTable,
    pub flow: Vec<FlowElement>,
    /// Datasheet ids, appended after the flow pages
    pub datasheets: Vec<String>,
    /// Other document ids, appended after the datasheets
    pub documents: Vec<String>,
}

/// Borrowed configuration and collaborators for one document
#[derive(Clone, Copy)]
pub struct ComposeContext<'a> {
    pub options: &'a RenderOptions,
    pub charts: &'a dyn ChartRenderer,
    pub documents: &'a dyn DocumentStore,
}

/// Owned counterpart of [`ComposeContext`], cheap to clone into tasks
#[derive(Clone)]
pub struct SharedContext {
    pub options: Arc<RenderOptions>,
    pub charts: Arc<dyn ChartRenderer>,
    pub documents: Arc<dyn DocumentStore>,
}

impl SharedContext {
    /// Context without chart or document collaborators
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options: Arc::new(options),
            charts: Arc::new(NoCharts),
            documents: Arc::new(NoDocuments),
        }
    }

    pub fn with_charts(mut self, charts: Arc<dyn ChartRenderer>) -> Self {
        self.charts = charts;
        self
    }

    pub fn with_documents(mut self, documents: Arc<dyn DocumentStore>) -> Self {
        self.documents = documents;
        self
    }

    pub fn as_context(&self) -> ComposeContext<'_> {
        ComposeContext {
            options: &self.options,
            charts: self.charts.as_ref(),
            documents: self.documents.as_ref(),
        }
    }
}

/// A finished document and what happened while building it
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub fixed_pages: usize,
    pub flow_pages: usize,
    pub warnings: Vec<ComposeWarning>,
    pub protection_log: Vec<ProtectionEntry>,
}

// =============================================================================
// Pipeline
// =============================================================================

/// Build one document on the current thread
pub fn compose_document_sync(
    template: &TemplateSet,
    job: &DocumentJob,
    ctx: ComposeContext<'_>,
    deadline: &Deadline,
) -> Result<ComposedDocument> {
    let mut warnings = Vec::new();
    let mut segments = Vec::new();

    for page in &template.pages {
        deadline.check()?;
        let rendered = render_page(
            page,
            &template.registry,
            &job.values,
            template.page_size,
            ctx.options,
            ctx.charts,
        )?;
        warnings.extend(rendered.warnings);
        segments.push(Segment::fixed(rendered.bytes));
    }

    let fixed_pages = template.page_count();
    let decorator = StandardDecorator::new(ctx.options);
    let mut flow_pages = 0;
    let mut protection_log = Vec::new();

    if let Some(flow) = render_flow(&job.flow, fixed_pages, &decorator, ctx.options, deadline)? {
        flow_pages = flow.page_count;
        protection_log = flow.protection_log;
        warnings.extend(flow.warnings);
        segments.push(Segment::flow(flow.bytes));
    }

    for id in job.datasheets.iter().chain(&job.documents) {
        deadline.check()?;
        match ctx.documents.fetch(id) {
            Ok(bytes) => segments.push(Segment::attachment(id.clone(), bytes)),
            Err(e) => {
                log::warn!("Attachment '{}' unavailable: {}", id, e);
                warnings.push(ComposeWarning::MissingAttachment {
                    name: id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    deadline.check()?;
    let assembled = assemble(segments, &ctx.options.title)?;
    warnings.extend(assembled.warnings);

    log::info!(
        "Composed '{}': {} pages ({} fixed, {} flow), {} warnings",
        template.id,
        assembled.page_count,
        fixed_pages,
        flow_pages,
        warnings.len()
    );

    Ok(ComposedDocument {
        bytes: assembled.bytes,
        page_count: assembled.page_count,
        fixed_pages,
        flow_pages,
        warnings,
        protection_log,
    })
}

/// Build one document on the blocking thread pool
pub async fn compose_document(
    template: Arc<TemplateSet>,
    job: DocumentJob,
    ctx: SharedContext,
    deadline: Deadline,
) -> Result<ComposedDocument> {
    tokio::task::spawn_blocking(move || {
        compose_document_sync(&template, &job, ctx.as_context(), &deadline)
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_deadline_reports_timeout() {
        let deadline = Deadline::after(Duration::ZERO);
        assert!(matches!(deadline.check(), Err(ComposeError::Timeout)));
        assert!(Deadline::none().check().is_ok());
    }

    #[test]
    fn test_abandon_flag_cancels() {
        let flag = Arc::new(AtomicBool::new(false));
        let deadline = Deadline::none().with_abandon_flag(Arc::clone(&flag));
        assert!(deadline.check().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(deadline.check(), Err(ComposeError::Cancelled)));
    }
}

//! Building per-recipient jobs
//!
//! A batch file describes the shared document content plus, per product
//! category, the candidates that rotate across recipients:
//!
//! ```json
//! {
//!   "base": { "values": {...}, "flow": [...], "datasheets": [...] },
//!   "base_price": 12500,
//!   "price_token": "offer_price",
//!   "categories": {
//!     "panels": [
//!       { "label": "Mono 400", "values": {"panel_name": "Mono 400"}, "datasheets": ["mono400"] },
//!       { "label": "Mono 420", "price": 300, "values": {"panel_name": "Mono 420"} }
//!     ]
//!   }
//! }
//! ```

use super::recipient::RecipientSpec;
use crate::format::AmountFormat;
use crate::job::{JobFile, JobValue, resolve_values};
use crate::pipeline::DocumentJob;
use crate::substitute::{Value, ValueTable};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix of tokens filled from recipient fields
pub const RECIPIENT_TOKEN_PREFIX: &str = "recipient.";

/// Everything that varies for one recipient
#[derive(Debug, Clone, PartialEq)]
pub struct RecipientContext {
    pub recipient: RecipientSpec,
    pub position: usize,
    /// Selected candidate index per category
    pub selections: BTreeMap<String, usize>,
    /// Escalated price, when the factory has a base price
    pub price: Option<f64>,
}

/// Produces the document job for one recipient.
///
/// Called on a blocking thread, once per recipient.
pub trait JobFactory: Send + Sync {
    /// Candidate count per product category
    fn categories(&self) -> BTreeMap<String, usize>;

    /// Price before escalation for a given product selection
    fn base_price(&self, selections: &BTreeMap<String, usize>) -> Option<f64>;

    fn build(&self, ctx: &RecipientContext) -> Result<DocumentJob>;
}

// =============================================================================
// Batch File
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchFile {
    pub base: JobFile,
    pub base_price: Option<f64>,
    pub price_token: Option<String>,
    pub amount_format: AmountFormat,
    pub categories: BTreeMap<String, Vec<CandidateFile>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateFile {
    pub label: String,
    /// Added to the base price when this candidate is selected
    pub price: f64,
    pub values: BTreeMap<String, JobValue>,
    pub datasheets: Vec<String>,
}

#[derive(Debug, Clone)]
struct Candidate {
    label: String,
    price: f64,
    values: ValueTable,
    datasheets: Vec<String>,
}

// =============================================================================
// Catalog Factory
// =============================================================================

/// [`JobFactory`] backed by a batch file
#[derive(Debug, Clone)]
pub struct CatalogJobFactory {
    base: DocumentJob,
    base_price: Option<f64>,
    price_token: Option<String>,
    format: AmountFormat,
    categories: BTreeMap<String, Vec<Candidate>>,
}

impl CatalogJobFactory {
    /// Load a batch file, resolving asset paths relative to it
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file: BatchFile = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Job(format!("{}: {}", path.display(), e)))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_file(file, base_dir).await
    }

    pub async fn from_file(file: BatchFile, base_dir: &Path) -> Result<Self> {
        if let Some(price) = file.base_price {
            if !price.is_finite() {
                return Err(ComposeError::Job("base_price must be finite".to_string()));
            }
        }

        let base = file.base.resolve(base_dir).await?;
        let mut categories = BTreeMap::new();
        for (name, candidates) in file.categories {
            if candidates.is_empty() {
                return Err(ComposeError::Config(format!(
                    "category '{}' lists no candidates",
                    name
                )));
            }
            let mut resolved = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                resolved.push(Candidate {
                    label: candidate.label,
                    price: candidate.price,
                    values: resolve_values(candidate.values, base_dir).await?,
                    datasheets: candidate.datasheets,
                });
            }
            log::debug!("Category '{}': {} candidates", name, resolved.len());
            categories.insert(name, resolved);
        }

        Ok(Self {
            base,
            base_price: file.base_price,
            price_token: file.price_token,
            format: file.amount_format,
            categories,
        })
    }

    /// Label of the candidate at `index` in `category`
    pub fn candidate_label(&self, category: &str, index: usize) -> Option<&str> {
        self.categories
            .get(category)?
            .get(index)
            .map(|c| c.label.as_str())
    }

    fn selected(&self, category: &str, index: usize) -> Option<&Candidate> {
        let candidates = self.categories.get(category)?;
        // An out-of-range cursor on a single-candidate list falls back to it
        candidates.get(index).or_else(|| candidates.first())
    }
}

impl JobFactory for CatalogJobFactory {
    fn categories(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(name, c)| (name.clone(), c.len()))
            .collect()
    }

    fn base_price(&self, selections: &BTreeMap<String, usize>) -> Option<f64> {
        let base = self.base_price?;
        let extras: f64 = selections
            .iter()
            .filter_map(|(category, &index)| self.selected(category, index))
            .map(|c| c.price)
            .sum();
        Some(base + extras)
    }

    fn build(&self, ctx: &RecipientContext) -> Result<DocumentJob> {
        let mut job = self.base.clone();

        for (field, value) in &ctx.recipient.fields {
            job.values.insert(
                format!("{}{}", RECIPIENT_TOKEN_PREFIX, field),
                Value::text(value.as_str()),
            );
        }
        for (key, value) in [
            ("id", &ctx.recipient.id),
            ("name", &ctx.recipient.name),
            ("email", &ctx.recipient.email),
        ] {
            job.values.insert(
                format!("{}{}", RECIPIENT_TOKEN_PREFIX, key),
                Value::text(value.as_str()),
            );
        }

        let mut datasheets = Vec::new();
        for (category, &index) in &ctx.selections {
            let candidate = self.selected(category, index).ok_or_else(|| {
                ComposeError::Job(format!("category '{}' has no candidates", category))
            })?;
            job.values.merge(candidate.values.clone());
            datasheets.extend(candidate.datasheets.iter().cloned());
        }
        // Product datasheets come before the shared ones
        datasheets.append(&mut job.datasheets);
        job.datasheets = datasheets;

        if let (Some(token), Some(price)) = (&self.price_token, ctx.price) {
            job.values
                .insert(token.clone(), Value::Text(self.format.format(price)));
        }

        Ok(job)
    }
}

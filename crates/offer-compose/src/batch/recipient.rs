//! Recipient lists
//!
//! CSV with a header row. `id` is required; `name` and `email` are optional;
//! `cursor.<category>` columns give the base product index per category and
//! every other column is kept as a free field.

use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const CURSOR_PREFIX: &str = "cursor.";

/// One recipient of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Base candidate index per product category
    #[serde(default)]
    pub rotation_cursor: BTreeMap<String, usize>,
    /// 0-based position within the batch
    #[serde(default)]
    pub position: usize,
}

impl RecipientSpec {
    pub fn new(id: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            position,
            ..Self::default()
        }
    }

    /// Base index for `category`, 0 when the recipient has no cursor for it
    pub fn cursor(&self, category: &str) -> usize {
        self.rotation_cursor.get(category).copied().unwrap_or(0)
    }

    /// Human-readable identity for logs and file names
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Load recipients from a CSV file
pub async fn load_recipients_csv(path: impl AsRef<Path>) -> Result<Vec<RecipientSpec>> {
    let path = path.as_ref().to_owned();
    let contents = tokio::fs::read_to_string(&path).await?;
    let recipients = tokio::task::spawn_blocking(move || parse_recipients(&contents)).await??;
    log::info!(
        "Loaded {} recipients from {}",
        recipients.len(),
        path.display()
    );
    Ok(recipients)
}

/// Parse recipients from CSV text
pub fn parse_recipients(contents: &str) -> Result<Vec<RecipientSpec>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());
    let headers = reader.headers()?.clone();

    let id_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("id"))
        .ok_or_else(|| ComposeError::Job("recipient list has no 'id' column".to_string()))?;

    let mut recipients = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let line = row + 2;
        let mut recipient = RecipientSpec::new("", recipients.len());

        for (col, (header, value)) in headers.iter().zip(record.iter()).enumerate() {
            if col == id_col {
                recipient.id = value.to_string();
            } else if header.eq_ignore_ascii_case("name") {
                recipient.name = value.to_string();
            } else if header.eq_ignore_ascii_case("email") {
                recipient.email = value.to_string();
            } else if let Some(category) = header.strip_prefix(CURSOR_PREFIX) {
                if value.is_empty() {
                    continue;
                }
                let index = value.parse::<usize>().map_err(|_| {
                    ComposeError::Job(format!(
                        "line {}: cursor '{}' is not a non-negative integer: '{}'",
                        line, category, value
                    ))
                })?;
                recipient.rotation_cursor.insert(category.to_string(), index);
            } else if !header.is_empty() {
                recipient.fields.insert(header.to_string(), value.to_string());
            }
        }

        if recipient.id.is_empty() {
            return Err(ComposeError::Job(format!("line {}: missing recipient id", line)));
        }
        recipients.push(recipient);
    }

    Ok(recipients)
}

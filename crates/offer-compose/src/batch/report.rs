//! Machine-readable batch outcome report

use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// One line of the report per recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub recipient_id: String,
    pub position: usize,
    pub status: OutcomeStatus,
    /// Archive entry name, for successes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Failure reason, for failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub template: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<RecipientOutcome>,
}

impl BatchReport {
    pub fn new(template: impl Into<String>, outcomes: Vec<RecipientOutcome>) -> Self {
        let succeeded = outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Success)
            .count();
        Self {
            generated_at: Utc::now(),
            template: template.into(),
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            outcomes,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }

    /// Outcomes that did not produce a document
    pub fn failures(&self) -> impl Iterator<Item = &RecipientOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_json_shape() {
        let outcomes = vec![
            RecipientOutcome {
                recipient_id: "a".into(),
                position: 0,
                status: OutcomeStatus::Success,
                file: Some("001_offer_a.pdf".into()),
                reason: None,
                warnings: vec![],
            },
            RecipientOutcome {
                recipient_id: "b".into(),
                position: 1,
                status: OutcomeStatus::Failure,
                file: None,
                reason: Some("timed out".into()),
                warnings: vec![],
            },
        ];
        let report = BatchReport::new("standard", outcomes);
        assert_eq!((report.total, report.succeeded, report.failed), (2, 1, 1));
        assert_eq!(report.failures().count(), 1);

        let json: serde_json::Value = serde_json::from_slice(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "success");
        assert_eq!(json["outcomes"][1]["reason"], "timed out");
        assert!(json["outcomes"][0].get("reason").is_none());
    }
}

//! JSON job files
//!
//! A job file supplies the values, flow content and attachment ids for one
//! document. Image paths are resolved relative to the job file.

use crate::flow::{FlowElement, FlowKind};
use crate::pipeline::DocumentJob;
use crate::substitute::{Value, ValueTable};
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A value as written in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobValue {
    Text(String),
    Number(f64),
    Series(Vec<f64>),
    Image { image: PathBuf },
    Chart { chart: String, series: Vec<f64> },
}

/// A flow element as written in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobElement {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub kind: JobElementKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobElementKind {
    Heading {
        text: String,
        #[serde(default = "default_level")]
        level: u8,
    },
    Paragraph {
        text: String,
    },
    Image {
        path: PathBuf,
        height: f32,
    },
    Table {
        #[serde(default)]
        columns: Vec<f32>,
        #[serde(default)]
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Financing {
        title: String,
        rows: Vec<(String, String)>,
        #[serde(default)]
        note: Option<String>,
    },
}

fn default_level() -> u8 {
    1
}

/// The on-disk job format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFile {
    pub values: BTreeMap<String, JobValue>,
    pub flow: Vec<JobElement>,
    pub datasheets: Vec<String>,
    pub documents: Vec<String>,
}

impl JobFile {
    /// Read a job file and resolve it into a [`DocumentJob`]
    pub async fn load(path: impl AsRef<Path>) -> Result<DocumentJob> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file: JobFile = serde_json::from_slice(&bytes)
            .map_err(|e| ComposeError::Job(format!("{}: {}", path.display(), e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        file.resolve(base).await
    }

    /// Load referenced images and convert into engine types
    pub async fn resolve(self, base_dir: &Path) -> Result<DocumentJob> {
        let values = resolve_values(self.values, base_dir).await?;

        let mut flow = Vec::with_capacity(self.flow.len());
        for element in self.flow {
            let kind = match element.kind {
                JobElementKind::Heading { text, level } => FlowKind::Heading { text, level },
                JobElementKind::Paragraph { text } => FlowKind::Paragraph { text },
                JobElementKind::Image { path, height } => FlowKind::Image {
                    data: Arc::new(read_asset(base_dir, &path).await?),
                    height,
                },
                JobElementKind::Table {
                    columns,
                    header,
                    rows,
                } => FlowKind::Table {
                    columns,
                    header,
                    rows,
                },
                JobElementKind::Financing { title, rows, note } => {
                    FlowKind::FinancingBlock { title, rows, note }
                }
            };
            flow.push(FlowElement {
                id: element.id,
                group: element.group,
                kind,
            });
        }

        Ok(DocumentJob {
            values,
            flow,
            datasheets: self.datasheets,
            documents: self.documents,
        })
    }
}

/// Convert JSON values, reading image files relative to `base_dir`
pub async fn resolve_values(
    values: BTreeMap<String, JobValue>,
    base_dir: &Path,
) -> Result<ValueTable> {
    let mut table = ValueTable::new();
    for (token, value) in values {
        let value = match value {
            JobValue::Text(s) => Value::Text(s),
            JobValue::Number(n) => Value::Text(n.to_string()),
            JobValue::Series(s) => Value::Series(s),
            JobValue::Image { image } => Value::Image(Arc::new(read_asset(base_dir, &image).await?)),
            JobValue::Chart { chart, series } => Value::Chart { key: chart, series },
        };
        table.insert(token, value);
    }
    Ok(table)
}

async fn read_asset(base_dir: &Path, path: &Path) -> Result<Vec<u8>> {
    let full = if path.is_relative() {
        base_dir.join(path)
    } else {
        path.to_path_buf()
    };
    tokio::fs::read(&full)
        .await
        .map_err(|e| ComposeError::Job(format!("cannot read {}: {}", full.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_value_shapes() {
        let json = r#"{
            "values": {
                "name": "Jane",
                "kwp": 9.6,
                "donut": [40, 75],
                "logo": {"image": "logo.png"},
                "roi": {"chart": "roi", "series": [1, 2, 3]}
            },
            "flow": [
                {"id": "h", "group": "g", "kind": "heading", "text": "Title"},
                {"id": "f", "kind": "financing", "title": "Plan", "rows": [["Rate", "12.00"]]}
            ]
        }"#;
        let job: JobFile = serde_json::from_str(json).unwrap();
        assert_eq!(job.values["name"], JobValue::Text("Jane".into()));
        assert_eq!(job.values["kwp"], JobValue::Number(9.6));
        assert_eq!(job.values["donut"], JobValue::Series(vec![40.0, 75.0]));
        assert!(matches!(job.values["logo"], JobValue::Image { .. }));
        assert!(matches!(job.values["roi"], JobValue::Chart { .. }));
        assert_eq!(job.flow.len(), 2);
        assert_eq!(job.flow[0].group.as_deref(), Some("g"));
        assert!(matches!(job.flow[0].kind, JobElementKind::Heading { level: 1, .. }));
    }
}

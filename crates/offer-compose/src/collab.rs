//! External collaborators consumed by the pipeline
//!
//! Chart images and attachment documents come from outside the engine. Both
//! are read-only; a failure here degrades the document, it never aborts it.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator not available")]
    Unavailable,
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
}

/// Renders a chart to image bytes (PNG or JPEG) from precomputed series
pub trait ChartRenderer: Send + Sync {
    fn render(&self, key: &str, series: &[f64]) -> Result<Vec<u8>, CollaboratorError>;
}

/// Supplies attachment documents (datasheets, terms) by id
pub trait DocumentStore: Send + Sync {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, CollaboratorError>;
}

/// Chart renderer used when none is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCharts;

impl ChartRenderer for NoCharts {
    fn render(&self, _key: &str, _series: &[f64]) -> Result<Vec<u8>, CollaboratorError> {
        Err(CollaboratorError::Unavailable)
    }
}

/// Document store used when none is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDocuments;

impl DocumentStore for NoDocuments {
    fn fetch(&self, _id: &str) -> Result<Vec<u8>, CollaboratorError> {
        Err(CollaboratorError::Unavailable)
    }
}

/// Reads attachments from `<dir>/<id>.pdf`
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DocumentStore for DirectoryStore {
    fn fetch(&self, id: &str) -> Result<Vec<u8>, CollaboratorError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(CollaboratorError::NotFound(id.to_string()));
        }
        let path = self.dir.join(format!("{}.pdf", id));
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CollaboratorError::NotFound(id.to_string()),
            _ => CollaboratorError::Failed(format!("{}: {}", path.display(), e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_store_reads_by_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("terms.pdf"), b"%PDF-1.7").unwrap();
        let store = DirectoryStore::new(dir.path());
        assert_eq!(store.fetch("terms").unwrap(), b"%PDF-1.7");
        assert_eq!(
            store.fetch("missing"),
            Err(CollaboratorError::NotFound("missing".to_string()))
        );
        assert!(store.fetch("../terms").is_err());
    }
}

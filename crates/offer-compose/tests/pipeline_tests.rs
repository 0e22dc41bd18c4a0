mod common;

use common::*;
use offer_compose::*;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct FixedChart(Vec<u8>);

impl ChartRenderer for FixedChart {
    fn render(&self, _key: &str, _series: &[f64]) -> std::result::Result<Vec<u8>, CollaboratorError> {
        Ok(self.0.clone())
    }
}

async fn standard_template(root: &TempDir) -> Arc<TemplateSet> {
    write_standard_template(root.path(), "standard");
    Arc::new(
        TemplateLoader::new(root.path())
            .load("standard")
            .await
            .unwrap(),
    )
}

fn sample_job() -> DocumentJob {
    let mut values = ValueTable::new();
    values.insert("customer_name", Value::text("Jane Doe"));
    values.insert("offer_price", Value::text("12,500.00"));
    values.insert("panel_name", Value::text("Mono 400"));
    values.insert("yield", Value::Series(vec![310.0, 420.0, 515.0, 480.0]));
    values.insert("note", Value::text("Indicative figures"));

    DocumentJob {
        values,
        flow: vec![
            FlowElement::heading("h", "Your financing", 1),
            FlowElement::financing(
                "fin",
                "Monthly plan",
                vec![("Rate".to_string(), "189.00".to_string())],
                Some("Subject to approval".to_string()),
            ),
        ],
        datasheets: vec!["panel".to_string()],
        documents: vec!["missing-terms".to_string()],
    }
}

#[tokio::test]
async fn test_compose_full_document() {
    let root = TempDir::new().unwrap();
    let template = standard_template(&root).await;

    let attachments = TempDir::new().unwrap();
    std::fs::write(attachments.path().join("panel.pdf"), create_test_pdf(2)).unwrap();

    let context = SharedContext::new(RenderOptions::default())
        .with_documents(Arc::new(DirectoryStore::new(attachments.path())));

    let doc = compose_document(template, sample_job(), context, Deadline::none())
        .await
        .unwrap();

    assert_eq!(doc.fixed_pages, 2);
    assert_eq!(doc.flow_pages, 1);
    assert_eq!(doc.page_count, 5);
    assert_eq!(page_count(&doc.bytes), 5);
    assert_eq!(doc.warnings.len(), 1);
    assert!(matches!(
        &doc.warnings[0],
        ComposeWarning::MissingAttachment { name, .. } if name == "missing-terms"
    ));
    assert!(!doc.protection_log.is_empty());
}

#[tokio::test]
async fn test_chart_collaborator_fills_slot() {
    let root = TempDir::new().unwrap();
    let template = standard_template(&root).await;

    let mut job = DocumentJob::default();
    job.values.insert(
        "customer_name",
        Value::Chart {
            key: "roi".to_string(),
            series: vec![1.0, 2.0],
        },
    );

    let options = RenderOptions::default();
    let charts = FixedChart(create_test_png(40, 20));
    let ctx = ComposeContext {
        options: &options,
        charts: &charts,
        documents: &NoDocuments,
    };
    let doc = compose_document_sync(&template, &job, ctx, &Deadline::none()).unwrap();

    assert_eq!(doc.page_count, 2);
    assert_eq!(doc.flow_pages, 0);
    assert!(!doc.warnings.iter().any(|w| matches!(
        w,
        ComposeWarning::UnresolvedToken { token, .. } if token == "customer_name"
    )));
}

#[tokio::test]
async fn test_missing_chart_renderer_leaves_blank() {
    let root = TempDir::new().unwrap();
    let template = standard_template(&root).await;

    let mut job = DocumentJob::default();
    job.values.insert(
        "customer_name",
        Value::Chart {
            key: "roi".to_string(),
            series: vec![1.0],
        },
    );

    let context = SharedContext::new(RenderOptions::default());
    let doc = compose_document(template, job, context, Deadline::none())
        .await
        .unwrap();
    assert!(doc.warnings.iter().any(|w| matches!(
        w,
        ComposeWarning::UnresolvedToken { token, reason, .. }
            if token == "customer_name" && reason.contains("roi")
    )));
}

#[tokio::test]
async fn test_expired_deadline_fails_document() {
    let root = TempDir::new().unwrap();
    let template = standard_template(&root).await;
    let context = SharedContext::new(RenderOptions::default());

    let result = compose_document(
        template,
        sample_job(),
        context,
        Deadline::after(Duration::ZERO),
    )
    .await;
    assert!(matches!(result, Err(ComposeError::Timeout)));
}

#[tokio::test]
async fn test_job_file_resolves_assets() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("roof.png"), create_test_png(8, 6)).unwrap();
    let job_path = dir.path().join("job.json");
    std::fs::write(
        &job_path,
        r#"{
            "values": {"customer_name": "Jane", "kwp": 9.6, "photo": {"image": "roof.png"}},
            "flow": [
                {"id": "h", "kind": "heading", "text": "Roof"},
                {"id": "img", "kind": "image", "path": "roof.png", "height": 120}
            ],
            "datasheets": ["panel"]
        }"#,
    )
    .unwrap();

    let job = JobFile::load(&job_path).await.unwrap();
    assert_eq!(job.values.get("customer_name"), Some(&Value::text("Jane")));
    assert_eq!(job.values.get("kwp"), Some(&Value::text("9.6")));
    assert!(matches!(job.values.get("photo"), Some(Value::Image(_))));
    assert_eq!(job.flow.len(), 2);
    assert_eq!(job.datasheets, vec!["panel".to_string()]);
}

#[tokio::test]
async fn test_job_file_with_missing_asset_fails() {
    let dir = TempDir::new().unwrap();
    let job_path = dir.path().join("job.json");
    std::fs::write(&job_path, r#"{"values": {"photo": {"image": "gone.png"}}}"#).unwrap();
    assert!(matches!(
        JobFile::load(&job_path).await,
        Err(ComposeError::Job(_))
    ));
}

mod common;

use common::*;
use offer_compose::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_standard_template() {
    let root = TempDir::new().unwrap();
    write_standard_template(root.path(), "standard");

    let template = TemplateLoader::new(root.path())
        .load("standard")
        .await
        .unwrap();

    assert_eq!(template.id, "standard");
    assert_eq!(template.page_count(), 2);
    assert_eq!(template.pages[0].index, 1);
    assert!(matches!(template.pages[0].background, coords::Background::Pdf(_)));
    assert!(matches!(template.pages[1].background, coords::Background::Blank));
    assert_eq!(template.registry.len(), 1);
    assert!(template.registry.lookup(2, "yield").is_some());
    assert!(template.registry.lookup(1, "yield").is_none());

    let tokens = template.tokens();
    assert_eq!(
        tokens,
        vec![
            (1, "customer_name"),
            (1, "offer_price"),
            (1, "panel_name"),
            (2, "note"),
            (2, "yield"),
        ]
    );
}

#[tokio::test]
async fn test_top_left_rects_are_converted_once() {
    let root = TempDir::new().unwrap();
    write_standard_template(root.path(), "standard");
    let template = TemplateLoader::new(root.path())
        .load("standard")
        .await
        .unwrap();

    let placeholder = template.pages[0].map.get("customer_name").unwrap();
    let height = PageSize::A4.height;
    let authored = Rect::new(50.0, 100.0, 300.0, 24.0);
    assert_eq!(placeholder.rect, to_pdf_space(authored, Origin::TopLeft, height));
    assert!((placeholder.rect.top() - (height - 100.0)).abs() < 1e-3);

    let back = coords::from_pdf_space(placeholder.rect, Origin::TopLeft, height);
    assert!((back.y - authored.y).abs() < 1e-3);
    assert_eq!(back.width, authored.width);
}

#[tokio::test]
async fn test_missing_template_is_not_found() {
    let root = TempDir::new().unwrap();
    let loader = TemplateLoader::new(root.path());

    assert!(matches!(
        loader.load("nope").await,
        Err(ComposeError::TemplateNotFound(_))
    ));
    assert!(matches!(
        loader.load("../escape").await,
        Err(ComposeError::TemplateNotFound(_))
    ));
}

#[tokio::test]
async fn test_missing_background_is_not_found() {
    let root = TempDir::new().unwrap();
    write_template(
        root.path(),
        "t",
        r#"{"pages": [{"background": "gone.pdf"}]}"#,
        &[],
    );
    let result = TemplateLoader::new(root.path()).load("t").await;
    assert!(matches!(result, Err(ComposeError::TemplateNotFound(_))));
}

#[tokio::test]
async fn test_malformed_maps_are_rejected() {
    let cases = [
        ("not json", "{"),
        ("no pages", r#"{"pages": []}"#),
        (
            "negative width",
            r#"{"pages": [{"placeholders": {"a": {"x": 0, "y": 0, "width": -5, "height": 10}}}]}"#,
        ),
        (
            "unknown field",
            r#"{"pages": [{"placeholders": {"a": {"x": 0, "y": 0, "width": 5, "height": 10, "colour": 1}}}]}"#,
        ),
        (
            "bad color",
            r#"{"pages": [{"placeholders": {"a": {"x": 0, "y": 0, "width": 5, "height": 10, "color": [2, 0, 0]}}}]}"#,
        ),
        (
            "unknown chart",
            r#"{"pages": [{"placeholders": {"a": {"x": 0, "y": 0, "width": 5, "height": 10, "chart": "pie"}}}]}"#,
        ),
    ];

    for (name, manifest) in cases {
        let root = TempDir::new().unwrap();
        write_template(root.path(), "t", manifest, &[]);
        let result = TemplateLoader::new(root.path()).load("t").await;
        assert!(
            matches!(result, Err(ComposeError::MalformedCoordinateMap(_))),
            "{}: expected MalformedCoordinateMap, got {:?}",
            name,
            result.map(|t| t.id)
        );
    }
}

#[tokio::test]
async fn test_unreadable_background_is_malformed() {
    let root = TempDir::new().unwrap();
    write_template(
        root.path(),
        "t",
        r#"{"pages": [{"background": "bg.png"}]}"#,
        &[("bg.png", b"definitely not a png")],
    );
    let result = TemplateLoader::new(root.path()).load("t").await;
    assert!(matches!(result, Err(ComposeError::MalformedCoordinateMap(_))));
}

#[tokio::test]
async fn test_unresolved_tokens_render_blank() {
    let root = TempDir::new().unwrap();
    write_standard_template(root.path(), "standard");
    let template = TemplateLoader::new(root.path())
        .load("standard")
        .await
        .unwrap();

    let mut values = ValueTable::new();
    values.insert("customer_name", Value::text("Jane Doe"));
    // Wrong arity is not fatal either: a text value on a chart slot
    values.insert("yield", Value::text("oops"));

    let options = RenderOptions::default();
    let first = render_page(
        &template.pages[0],
        &template.registry,
        &values,
        template.page_size,
        &options,
        &NoCharts,
    )
    .unwrap();
    assert_eq!(page_count(&first.bytes), 1);
    let unresolved: Vec<&str> = first
        .warnings
        .iter()
        .filter_map(|w| match w {
            ComposeWarning::UnresolvedToken { token, .. } => Some(token.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(unresolved, vec!["offer_price", "panel_name"]);

    let second = render_page(
        &template.pages[1],
        &template.registry,
        &values,
        template.page_size,
        &options,
        &NoCharts,
    )
    .unwrap();
    assert_eq!(page_count(&second.bytes), 1);
    assert!(second.warnings.iter().any(|w| matches!(
        w,
        ComposeWarning::UnresolvedToken { page: 2, token, .. } if token == "yield"
    )));
}

#[tokio::test]
async fn test_chart_slot_draws_series() {
    let root = TempDir::new().unwrap();
    write_standard_template(root.path(), "standard");
    let template = TemplateLoader::new(root.path())
        .load("standard")
        .await
        .unwrap();

    let mut values = ValueTable::new();
    values.insert("yield", Value::Series(vec![120.0, 0.0, 340.0]));
    values.insert("note", Value::text("Estimated yearly production"));

    let page = render_page(
        &template.pages[1],
        &template.registry,
        &values,
        template.page_size,
        &RenderOptions::default(),
        &NoCharts,
    )
    .unwrap();
    assert!(page.warnings.is_empty(), "{:?}", page.warnings);
}

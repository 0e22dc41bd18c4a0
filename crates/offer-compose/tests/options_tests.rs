use offer_compose::*;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_default_options_are_valid() {
    assert!(RenderOptions::default().validate().is_ok());
    assert!(BatchOptions::default().validate().is_ok());
}

#[test]
fn test_render_validation() {
    let mut options = RenderOptions::default();
    options.layout.margin_left_mm = -1.0;
    assert!(matches!(options.validate(), Err(ComposeError::Config(_))));

    let mut options = RenderOptions::default();
    options.layout.page_size.width = 0.0;
    assert!(options.validate().is_err());

    let mut options = RenderOptions::default();
    options.charts.bar_fill_ratio = 1.5;
    match options.validate() {
        Err(ComposeError::Config(msg)) => assert!(msg.contains("fill ratio")),
        other => panic!("Expected Config error, got {:?}", other),
    }

    let mut options = RenderOptions::default();
    options.layout.heading_font_sizes[2] = 0.0;
    assert!(options.validate().is_err());

    // Margins that swallow the whole page
    let mut options = RenderOptions::default();
    options.layout.margin_top_mm = 200.0;
    options.layout.margin_bottom_mm = 200.0;
    assert!(options.validate().is_err());
}

#[test]
fn test_batch_validation() {
    let invalid = [
        BatchOptions {
            workers: 0,
            ..BatchOptions::default()
        },
        BatchOptions {
            timeout_secs: 0.0,
            ..BatchOptions::default()
        },
        BatchOptions {
            escalation_rate: f64::NAN,
            ..BatchOptions::default()
        },
        BatchOptions {
            escalation_rate: -1.0,
            ..BatchOptions::default()
        },
        BatchOptions {
            file_prefix: "a/b".to_string(),
            ..BatchOptions::default()
        },
    ];
    for options in invalid {
        assert!(
            matches!(options.validate(), Err(ComposeError::Config(_))),
            "{:?} should be rejected",
            options
        );
    }
}

#[test]
fn test_batch_validation_rejects_unbounded_values() {
    let huge_timeout = BatchOptions {
        timeout_secs: 1e30,
        ..BatchOptions::default()
    };
    match huge_timeout.validate() {
        Err(ComposeError::Config(msg)) => assert!(msg.contains("Timeout")),
        other => panic!("Expected Config error, got {:?}", other),
    }

    let too_many_workers = BatchOptions {
        workers: usize::MAX,
        ..BatchOptions::default()
    };
    assert!(matches!(
        too_many_workers.validate(),
        Err(ComposeError::Config(_))
    ));

    let long_but_valid = BatchOptions {
        timeout_secs: 86_400.0,
        workers: 64,
        ..BatchOptions::default()
    };
    assert!(long_but_valid.validate().is_ok());
}

#[tokio::test]
async fn test_load_rejects_unbounded_timeout() {
    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), r#"{"timeout_secs": 1e30}"#).unwrap();
    assert!(matches!(
        BatchOptions::load(temp.path()).await,
        Err(ComposeError::Config(_))
    ));
}

#[test]
fn test_step_for_falls_back_to_global() {
    let mut options = BatchOptions {
        rotation_step: 2,
        ..BatchOptions::default()
    };
    options.category_steps.insert("battery".to_string(), 0);
    assert_eq!(options.step_for("battery"), 0);
    assert_eq!(options.step_for("panels"), 2);
}

#[tokio::test]
async fn test_save_and_load_render_options() {
    let mut options = RenderOptions::default();
    options.title = "Solar offer".to_string();
    options.layout.min_bottom_space_mm = 30.0;
    options.text.overflow = TextOverflow::Truncate;
    options.decorator.brand_text = Some("SUNCO".to_string());

    let temp = NamedTempFile::new().unwrap();
    options.save(temp.path()).await.unwrap();
    let loaded = RenderOptions::load(temp.path()).await.unwrap();

    assert_eq!(loaded, options);
}

#[tokio::test]
async fn test_load_reads_relative_logo() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("logo.png"), b"png bytes").unwrap();
    let path = dir.path().join("options.json");
    std::fs::write(&path, r#"{"decorator": {"logo_path": "logo.png"}}"#).unwrap();

    let loaded = RenderOptions::load(&path).await.unwrap();
    assert_eq!(
        loaded.decorator.logo.as_deref().map(Vec::as_slice),
        Some(b"png bytes".as_slice())
    );
}

#[tokio::test]
async fn test_load_rejects_invalid_file() {
    let temp = NamedTempFile::new().unwrap();
    std::fs::write(temp.path(), r#"{"workers": 0}"#).unwrap();
    assert!(matches!(
        BatchOptions::load(temp.path()).await,
        Err(ComposeError::Config(_))
    ));

    std::fs::write(temp.path(), "not json").unwrap();
    assert!(matches!(
        RenderOptions::load(temp.path()).await,
        Err(ComposeError::Config(_))
    ));
}

#[tokio::test]
async fn test_save_and_load_batch_options() {
    let mut options = BatchOptions {
        escalation_rate: 0.025,
        workers: 2,
        ..BatchOptions::default()
    };
    options.category_steps.insert("inverter".to_string(), 3);

    let temp = NamedTempFile::new().unwrap();
    options.save(temp.path()).await.unwrap();
    assert_eq!(BatchOptions::load(temp.path()).await.unwrap(), options);
}

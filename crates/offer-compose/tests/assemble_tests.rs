mod common;

use common::*;
use lopdf::{Document, Object};
use offer_compose::*;

#[test]
fn test_segments_concatenate_in_order() {
    let segments = vec![
        Segment::fixed(create_test_pdf(3)),
        Segment::flow(create_test_pdf(2)),
        Segment::attachment("broken", b"%PDF-1.7 this is not a document".to_vec()),
    ];

    let assembled = assemble(segments, "Offer").unwrap();

    assert_eq!(assembled.page_count, 5);
    assert_eq!(page_count(&assembled.bytes), 5);
    assert_eq!(assembled.warnings.len(), 1);
    assert!(matches!(
        &assembled.warnings[0],
        ComposeWarning::MissingAttachment { name, .. } if name == "broken"
    ));
}

#[test]
fn test_pages_carry_inherited_attributes() {
    let assembled = assemble(
        vec![
            Segment::fixed(create_test_pdf(1)),
            Segment::attachment("sheet", create_test_pdf(2)),
        ],
        "Offer",
    )
    .unwrap();

    let doc = Document::load_mem(&assembled.bytes).unwrap();
    for (_, page_id) in doc.get_pages() {
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box.len(), 4);
        assert!(page.has(b"Resources"));
    }
}

#[test]
fn test_single_page_label_range() {
    let assembled = assemble(
        vec![
            Segment::fixed(create_test_pdf(2)),
            Segment::attachment("a", create_test_pdf(1)),
        ],
        "Offer",
    )
    .unwrap();

    let doc = Document::load_mem(&assembled.bytes).unwrap();
    let catalog = doc.catalog().unwrap();
    let labels = match catalog.get(b"PageLabels").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(d) => d,
        other => panic!("unexpected PageLabels {:?}", other),
    };
    let nums = labels.get(b"Nums").unwrap().as_array().unwrap();
    assert_eq!(nums.len(), 2);
    assert_eq!(nums[0].as_i64().unwrap(), 0);
}

#[test]
fn test_empty_attachment_is_skipped() {
    let assembled = assemble(
        vec![
            Segment::fixed(create_test_pdf(1)),
            Segment::attachment("empty", create_test_pdf(0)),
        ],
        "Offer",
    )
    .unwrap();
    assert_eq!(assembled.page_count, 1);
    assert_eq!(assembled.warnings.len(), 1);
}

#[test]
fn test_broken_fixed_segment_is_fatal() {
    let result = assemble(vec![Segment::fixed(b"garbage".to_vec())], "Offer");
    assert!(result.is_err());
}

#[test]
fn test_nothing_to_assemble() {
    let result = assemble(vec![Segment::attachment("x", b"garbage".to_vec())], "Offer");
    assert!(matches!(result, Err(ComposeError::NoPages)));
}

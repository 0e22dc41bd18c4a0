#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::path::Path;

/// A PDF with `num_pages` empty US Letter pages
pub fn create_test_pdf(num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    // MediaBox and Resources live on the tree root so copies must inherit them
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        ),
        ("Resources", Object::Dictionary(Dictionary::new())),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([20, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn page_count(bytes: &[u8]) -> usize {
    Document::load_mem(bytes).unwrap().get_pages().len()
}

/// Write `<root>/<id>/manifest.json` plus any extra files
pub fn write_template(root: &Path, id: &str, manifest: &str, files: &[(&str, &[u8])]) {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("manifest.json"), manifest).unwrap();
    for (name, bytes) in files {
        std::fs::write(dir.join(name), bytes).unwrap();
    }
}

/// A two-page template: a PDF background with text slots, then a blank page
/// with a bar chart slot
pub fn write_standard_template(root: &Path, id: &str) {
    let manifest = r#"{
        "origin": "top_left",
        "pages": [
            {
                "background": "cover.pdf",
                "placeholders": {
                    "customer_name": {"x": 50, "y": 100, "width": 300, "height": 24, "font_size": 18, "bold": true},
                    "offer_price": {"x": 50, "y": 140, "width": 200, "height": 20, "align": "right"},
                    "panel_name": {"x": 50, "y": 170, "width": 200, "height": 20}
                }
            },
            {
                "placeholders": {
                    "yield": {"x": 50, "y": 100, "width": 400, "height": 200, "chart": "bars"},
                    "note": {"x": 50, "y": 320, "width": 400, "height": 40}
                }
            }
        ]
    }"#;
    let cover = create_test_pdf(1);
    write_template(root, id, manifest, &[("cover.pdf", &cover)]);
}

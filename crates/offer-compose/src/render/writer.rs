//! Turns finished canvases into PDF page objects

use crate::types::{PageSize, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::canvas::{Canvas, FontFace};
use super::xobject::{ObjectCopier, create_page_xobject};

/// Builds a document one page at a time.
///
/// Font objects are created lazily and shared across all pages.
pub struct PageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    regular_font: Option<ObjectId>,
    bold_font: Option<ObjectId>,
}

impl Default for PageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            regular_font: None,
            bold_font: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page of `size` carrying the canvas content
    pub fn add_page(&mut self, canvas: Canvas, size: PageSize) -> Result<ObjectId> {
        let mut fonts = Dictionary::new();
        if canvas.uses_regular {
            let id = self.font_id(FontFace::Regular);
            fonts.set(FontFace::Regular.resource_name(), Object::Reference(id));
        }
        if canvas.uses_bold {
            let id = self.font_id(FontFace::Bold);
            fonts.set(FontFace::Bold.resource_name(), Object::Reference(id));
        }

        let mut xobjects = Dictionary::new();
        for (name, image) in &canvas.images {
            let id = image.embed(&mut self.doc);
            xobjects.set(name.as_bytes(), Object::Reference(id));
        }
        for (name, form) in &canvas.forms {
            let mut copier = ObjectCopier::new(&form.doc);
            let id = create_page_xobject(&mut self.doc, &form.doc, form.page_id, &mut copier)?;
            xobjects.set(name.as_bytes(), Object::Reference(id));
        }

        let mut resources = Dictionary::new();
        if !fonts.is_empty() {
            resources.set("Font", Object::Dictionary(fonts));
        }
        if !xobjects.is_empty() {
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let content = canvas.ops().as_bytes().to_vec();
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(size.width),
                Object::Real(size.height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        let page_id = self.doc.add_object(page_dict);
        self.kids.push(Object::Reference(page_id));
        Ok(page_id)
    }

    fn font_id(&mut self, face: FontFace) -> ObjectId {
        let slot = match face {
            FontFace::Regular => &mut self.regular_font,
            FontFace::Bold => &mut self.bold_font,
        };
        if let Some(id) = *slot {
            return id;
        }
        let mut font_dict = Dictionary::new();
        font_dict.set("Type", Object::Name(b"Font".to_vec()));
        font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        font_dict.set("BaseFont", Object::Name(face.base_font().to_vec()));
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let id = self.doc.add_object(font_dict);
        *slot = Some(id);
        id
    }

    /// Write the page tree and catalog, returning the finished document
    pub fn finish(mut self, title: &str) -> Document {
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(self.kids.len() as i64));
        pages_dict.set("Kids", Object::Array(self.kids));
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        set_info(&mut self.doc, title);
        self.doc
    }
}

/// Attach an Info dictionary with title and producer
pub fn set_info(doc: &mut Document, title: &str) {
    let mut info = Dictionary::new();
    info.set("Title", Object::string_literal(title));
    info.set("Producer", Object::string_literal("offer-compose"));
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Compress and serialize a document
pub fn to_bytes(mut doc: Document) -> Result<Vec<u8>> {
    doc.compress();
    let mut writer = Vec::new();
    doc.save_to(&mut writer)?;
    Ok(writer)
}

/// Render canvases into a standalone PDF, one page per canvas
pub fn write_pages(canvases: Vec<Canvas>, size: PageSize, title: &str) -> Result<Vec<u8>> {
    let mut writer = PageWriter::new();
    for canvas in canvases {
        writer.add_page(canvas, size)?;
    }
    to_bytes(writer.finish(title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::test_png;
    use crate::render::DecodedImage;
    use crate::types::{Color, Rect};

    #[test]
    fn test_write_pages_roundtrips_through_lopdf() {
        let mut first = Canvas::new();
        first.text(50.0, 700.0, FontFace::Regular, 12.0, Color::BLACK, "Hello");
        let mut second = Canvas::new();
        let img = DecodedImage::decode(&test_png(3, 3)).unwrap();
        second.draw_image(img, &Rect::new(10.0, 10.0, 30.0, 30.0));

        let bytes = write_pages(vec![first, second], PageSize::A4, "Test").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_form_pages_are_embedded() {
        let inner = write_pages(vec![Canvas::new()], PageSize::A4, "inner").unwrap();
        let mut canvas = Canvas::new();
        canvas
            .draw_pdf_page(&inner, &Rect::new(0.0, 0.0, 595.28, 841.89))
            .unwrap();
        let bytes = write_pages(vec![canvas], PageSize::A4, "outer").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert!(xobjects.has(b"Fm0"));
    }
}

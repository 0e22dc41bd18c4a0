//! Copying pages between documents
//!
//! Background templates are placed as Form XObjects and attachment pages are
//! merged wholesale; both need a deep, cycle-safe copy of the source objects
//! into the output document.

use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Fallback page size when a page has no readable MediaBox (A4)
const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (595.28, 841.89);

/// Page attributes that may live on an ancestor `Pages` node
pub const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

// =============================================================================
// Deep Copy
// =============================================================================

/// Copies objects from one document into another, remapping references.
///
/// Each source object is copied at most once. The target id is reserved
/// before recursing so reference cycles (Page -> Parent -> Kids -> Page)
/// terminate.
pub struct ObjectCopier<'a> {
    source: &'a Document,
    id_map: HashMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            id_map: HashMap::new(),
        }
    }

    /// Map `source_id` to an object the caller writes itself.
    ///
    /// References to `source_id` found while copying other objects resolve
    /// to `target_id` instead of producing a second copy.
    pub fn reserve(&mut self, source_id: ObjectId, target_id: ObjectId) {
        self.id_map.insert(source_id, target_id);
    }

    /// Copy the object with `source_id` and everything it references
    pub fn copy_id(&mut self, target: &mut Document, source_id: ObjectId) -> Result<ObjectId> {
        if let Some(&new_id) = self.id_map.get(&source_id) {
            return Ok(new_id);
        }

        let new_id = target.add_object(Object::Null);
        self.id_map.insert(source_id, new_id);

        let obj = self.source.get_object(source_id)?.clone();
        let copied = self.remap(target, obj)?;
        target.objects.insert(new_id, copied);

        Ok(new_id)
    }

    /// Copy a direct object, following any references inside it
    pub fn remap(&mut self, target: &mut Document, obj: Object) -> Result<Object> {
        match obj {
            Object::Reference(id) => Ok(Object::Reference(self.copy_id(target, id)?)),
            Object::Array(arr) => {
                let copied: Result<Vec<_>> =
                    arr.into_iter().map(|item| self.remap(target, item)).collect();
                Ok(Object::Array(copied?))
            }
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.remap_dict(target, &dict)?)),
            Object::Stream(stream) => {
                let dict = self.remap_dict(target, &stream.dict)?;
                let mut copied = Stream::new(dict, stream.content.clone());
                copied.allows_compression = stream.allows_compression;
                Ok(Object::Stream(copied))
            }
            other => Ok(other),
        }
    }

    fn remap_dict(&mut self, target: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut out = Dictionary::new();
        for (key, value) in dict.iter() {
            out.set(key.clone(), self.remap(target, value.clone())?);
        }
        Ok(out)
    }
}

// =============================================================================
// Page Attributes
// =============================================================================

/// Look up a page attribute, walking up the page tree for inheritable keys
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Page trees are shallow; the bound guards against malformed cycles
    for _ in 0..32 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value).clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Source page dimensions (width, height) in points
pub fn get_page_dimensions(doc: &Document, page_id: ObjectId) -> Result<(f32, f32)> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox");
    if let Some(Object::Array(mb)) = media_box {
        if mb.len() == 4 {
            let coords: Vec<f32> = mb.iter().filter_map(extract_number).collect();
            if coords.len() == 4 {
                return Ok(((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs()));
            }
        }
    }
    Ok(DEFAULT_PAGE_DIMENSIONS)
}

/// Extract numeric value from a PDF object
fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Concatenated, decompressed content of a page
fn get_page_content(doc: &Document, page_dict: &Dictionary) -> Result<Vec<u8>> {
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()),
    };

    let ids: Vec<ObjectId> = match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            // Contents may point at an array of stream references
            Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
            _ => vec![*id],
        },
        Object::Array(arr) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => Vec::new(),
    };

    let mut result = Vec::new();
    for id in ids {
        if let Ok(stream) = doc.get_object(id)?.as_stream() {
            let content = stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone());
            result.extend_from_slice(&content);
            result.push(b'\n');
        }
    }
    Ok(result)
}

// =============================================================================
// XObject Creation
// =============================================================================

/// Create a Form XObject in `output` from a page of `source`.
///
/// The BBox is the page MediaBox shifted to the origin so callers can scale
/// the form with a plain `cm` matrix.
pub fn create_page_xobject(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    copier: &mut ObjectCopier<'_>,
) -> Result<ObjectId> {
    let page_dict = source.get_dictionary(page_id)?;
    let (width, height) = get_page_dimensions(source, page_id)?;

    let mut origin = (0.0, 0.0);
    if let Some(Object::Array(mb)) = inherited_attribute(source, page_id, b"MediaBox") {
        let coords: Vec<f32> = mb.iter().filter_map(extract_number).collect();
        if coords.len() == 4 {
            origin = (coords[0], coords[1]);
        }
    }

    let content_data = get_page_content(source, page_dict)?;

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(origin.0),
            Object::Real(origin.1),
            Object::Real(origin.0 + width),
            Object::Real(origin.1 + height),
        ]),
    );
    if origin != (0.0, 0.0) {
        xobject_dict.set(
            "Matrix",
            Object::Array(vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(-origin.0),
                Object::Real(-origin.1),
            ]),
        );
    }

    if let Some(resources) = inherited_attribute(source, page_id, b"Resources") {
        xobject_dict.set("Resources", copier.remap(output, resources)?);
    }

    Ok(output.add_object(Stream::new(xobject_dict, content_data)))
}

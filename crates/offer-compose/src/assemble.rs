//! Merging page segments into the final document
//!
//! Segments arrive in output order: fixed template pages, flow pages, then
//! attachments. Every page is deep-copied into one fresh page tree, so the
//! result carries no trace of the segments' own page trees or labels.

use crate::render::xobject::INHERITABLE_KEYS;
use crate::render::{ObjectCopier, inherited_attribute, set_info, to_bytes};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Where a segment comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Rendered template pages
    Fixed,
    /// Flow-composed extended pages
    Flow,
    /// An externally supplied document; skipped if unreadable
    Attachment { name: String },
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: SegmentKind,
    pub bytes: Vec<u8>,
}

impl Segment {
    pub fn fixed(bytes: Vec<u8>) -> Self {
        Self {
            kind: SegmentKind::Fixed,
            bytes,
        }
    }

    pub fn flow(bytes: Vec<u8>) -> Self {
        Self {
            kind: SegmentKind::Flow,
            bytes,
        }
    }

    pub fn attachment(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            kind: SegmentKind::Attachment { name: name.into() },
            bytes,
        }
    }
}

/// The finished document
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub warnings: Vec<ComposeWarning>,
}

/// Concatenate segments into one document.
///
/// Fixed and flow segments are produced by the engine, so a failure to read
/// one is an error. Attachments that do not parse, are encrypted or have no
/// pages are skipped with a [`ComposeWarning::MissingAttachment`].
pub fn assemble(segments: Vec<Segment>, title: &str) -> Result<AssembledDocument> {
    let mut output = Document::with_version("1.7");
    let pages_id = output.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    let mut warnings = Vec::new();

    for segment in segments {
        let source = match read_segment(&segment) {
            Ok(doc) => doc,
            Err(e) => match &segment.kind {
                SegmentKind::Attachment { name } => {
                    skip_attachment(name, &e.to_string(), &mut warnings);
                    continue;
                }
                _ => return Err(e),
            },
        };

        let mark = kids.len();
        let mut copier = ObjectCopier::new(&source);
        let copied: Result<()> = source
            .get_pages()
            .values()
            .try_for_each(|&page_id| {
                let new_id = copy_page(&mut output, &source, page_id, pages_id, &mut copier)?;
                kids.push(Object::Reference(new_id));
                Ok(())
            });

        if let Err(e) = copied {
            kids.truncate(mark);
            match &segment.kind {
                SegmentKind::Attachment { name } => {
                    skip_attachment(name, &e.to_string(), &mut warnings);
                }
                _ => return Err(e),
            }
        } else {
            log::debug!(
                "Assembled {:?} segment: {} pages",
                segment.kind,
                kids.len() - mark
            );
        }
    }

    if kids.is_empty() {
        return Err(ComposeError::NoPages);
    }
    let page_count = kids.len();

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(page_count as i64));
    pages_dict.set("Kids", Object::Array(kids));
    output
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    catalog.set("PageLabels", Object::Dictionary(page_labels()));
    let catalog_id = output.add_object(catalog);
    output.trailer.set("Root", Object::Reference(catalog_id));

    // Drops objects left behind by skipped segments
    output.prune_objects();
    set_info(&mut output, title);
    let bytes = to_bytes(output)?;

    Ok(AssembledDocument {
        bytes,
        page_count,
        warnings,
    })
}

fn read_segment(segment: &Segment) -> Result<Document> {
    let doc = Document::load_mem(&segment.bytes)?;
    if doc.is_encrypted() {
        return Err(ComposeError::Unreadable("document is encrypted".to_string()));
    }
    if doc.get_pages().is_empty() {
        return Err(ComposeError::NoPages);
    }
    Ok(doc)
}

fn skip_attachment(name: &str, reason: &str, warnings: &mut Vec<ComposeWarning>) {
    log::warn!("Skipping attachment '{}': {}", name, reason);
    warnings.push(ComposeWarning::MissingAttachment {
        name: name.to_string(),
        reason: reason.to_string(),
    });
}

/// Copy one page under `parent`, pulling inherited attributes onto it
fn copy_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent: ObjectId,
    copier: &mut ObjectCopier<'_>,
) -> Result<ObjectId> {
    let mut dict = source.get_dictionary(page_id)?.clone();
    dict.remove(b"Parent");

    for key in INHERITABLE_KEYS {
        if !dict.has(key) {
            if let Some(value) = inherited_attribute(source, page_id, key) {
                dict.set(key.to_vec(), value);
            }
        }
    }

    let new_id = output.new_object_id();
    copier.reserve(page_id, new_id);
    let mut copied = match copier.remap(output, Object::Dictionary(dict))? {
        Object::Dictionary(d) => d,
        _ => Dictionary::new(),
    };
    copied.set("Parent", Object::Reference(parent));
    output.objects.insert(new_id, Object::Dictionary(copied));
    Ok(new_id)
}

/// One decimal range covering the whole document, starting at 1
fn page_labels() -> Dictionary {
    let mut style = Dictionary::new();
    style.set("S", Object::Name(b"D".to_vec()));
    style.set("St", Object::Integer(1));

    let mut labels = Dictionary::new();
    labels.set(
        "Nums",
        Object::Array(vec![Object::Integer(0), Object::Dictionary(style)]),
    );
    labels
}

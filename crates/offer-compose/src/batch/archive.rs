//! Zip packaging of successful batch documents

use crate::types::*;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the report entry inside the archive
pub const REPORT_ENTRY: &str = "report.json";

const MAX_SLUG_LEN: usize = 48;

/// Deterministic archive entry name for a recipient document.
///
/// `NNN` is the 1-based batch position, so entries sort in batch order.
pub fn entry_name(prefix: &str, position: usize, recipient_id: &str, name: &str) -> String {
    let identity = if name.trim().is_empty() {
        recipient_id.to_string()
    } else {
        format!("{} {}", recipient_id, name)
    };
    let slug = slugify(&identity);
    let prefix = slugify(prefix);
    if prefix.is_empty() {
        format!("{:03}_{}.pdf", position + 1, slug)
    } else {
        format!("{:03}_{}_{}.pdf", position + 1, prefix, slug)
    }
}

/// Lowercase ASCII letters and digits separated by single dashes
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "recipient".to_string()
    } else {
        slug.to_string()
    }
}

/// Write documents and the report into an in-memory zip archive
pub fn write_archive<'a>(
    documents: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    report_json: &[u8],
) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, bytes) in documents {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }
    zip.start_file(REPORT_ENTRY, options)?;
    zip.write_all(report_json)?;

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names() {
        assert_eq!(entry_name("offer", 0, "R-17", "Jane Doe"), "001_offer_r-17-jane-doe.pdf");
        assert_eq!(entry_name("", 11, "c9", ""), "012_c9.pdf");
        assert_eq!(entry_name("offer", 2, "***", ""), "003_offer_recipient.pdf");
    }

    #[test]
    fn test_slug_is_bounded() {
        let long = "x".repeat(200);
        assert!(slugify(&long).len() <= MAX_SLUG_LEN);
        assert_eq!(slugify("  Müller & Söhne "), "m-ller-s-hne");
    }

    #[test]
    fn test_archive_contains_entries() {
        let bytes = write_archive([("001_a.pdf", b"%PDF-a".as_slice())], b"{}").unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert!(archive.by_name("001_a.pdf").is_ok());
        assert!(archive.by_name(REPORT_ENTRY).is_ok());
    }
}

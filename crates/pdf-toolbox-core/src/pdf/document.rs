use lopdf::{Document, ObjectId};

use crate::error::{Error, Result};
use super::geometry::PageSize;
use super::page;

/// A parsed input document together with the name it was uploaded under.
pub struct PdfDocument {
    /// File name used in error messages
    name: String,
    /// Parsed object graph
    doc: Document,
}

impl PdfDocument {
    /// Parse a PDF from bytes.
    ///
    /// Any parse failure is reported as `Error::DocumentRead` naming `name`.
    /// Password-protected files are refused the same way: lopdf silently
    /// decrypts those with an empty user password and leaves the others
    /// with their objects still encrypted.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let name = name.into();
        let doc = Document::load_mem(bytes).map_err(|e| Error::DocumentRead {
            file: name.clone(),
            reason: e.to_string(),
        })?;

        if is_protected(&doc) {
            return Err(Error::DocumentRead {
                file: name,
                reason: "document is encrypted".to_string(),
            });
        }

        Ok(Self { name, doc })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get number of pages
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Natural (MediaBox) size of every page, in page order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.page_ids()
            .into_iter()
            .map(|id| page::page_size(&self.doc, id))
            .collect()
    }

    fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    pub fn into_inner(self) -> Document {
        self.doc
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("name", &self.name)
            .field("page_count", &self.page_count())
            .finish_non_exhaustive()
    }
}

/// Whether a loaded document was (or still is) encrypted.
///
/// `encryption_state` is only set when lopdf decrypted the file on load.
fn is_protected(doc: &Document) -> bool {
    doc.is_encrypted() || doc.encryption_state.is_some()
}

/// Serialize a document to bytes.
pub fn save_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfSave(e.to_string()))?;
    Ok(output)
}

/// Cheap check for an `/Encrypt` entry in unparsed bytes.
///
/// Used to classify load failures of password-protected files.
pub fn looks_encrypted(bytes: &[u8]) -> bool {
    const NEEDLE: &[u8] = b"/Encrypt";
    bytes.windows(NEEDLE.len()).any(|w| w == NEEDLE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::pdf::testing::{blank_pdf, encrypted_pdf};

    #[test]
    fn test_from_bytes() {
        let bytes = blank_pdf(&[(100.0, 110.0), (120.0, 130.0)]);
        let doc = PdfDocument::from_bytes("a.pdf", &bytes).unwrap();
        assert_eq!(doc.name(), "a.pdf");
        assert_eq!(doc.page_count(), 2);
        assert_eq!(
            doc.page_sizes(),
            vec![PageSize::new(100.0, 110.0), PageSize::new(120.0, 130.0)]
        );
    }

    #[test]
    fn test_unreadable_names_file() {
        let err = PdfDocument::from_bytes("bad.pdf", b"this is not a valid pdf file").unwrap_err();
        match err {
            Error::DocumentRead { file, .. } => assert_eq!(file, "bad.pdf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encrypted_document_refused() {
        // Empty user password: decrypted by lopdf on load. Non-empty: still encrypted.
        for user_password in ["", "secret"] {
            let err = PdfDocument::from_bytes("locked.pdf", &encrypted_pdf(user_password)).unwrap_err();
            match err {
                Error::DocumentRead { file, reason } => {
                    assert_eq!(file, "locked.pdf");
                    assert!(reason.contains("encrypted"), "{reason}");
                }
                other => panic!("unexpected error for {user_password:?}: {other}"),
            }
        }
    }

    #[test]
    fn test_looks_encrypted() {
        assert!(looks_encrypted(b"trailer << /Encrypt 5 0 R >>"));
        assert!(!looks_encrypted(b"trailer << /Root 1 0 R >>"));
        assert!(looks_encrypted(&encrypted_pdf("")));
    }
}

//! Merging documents with optional page-size normalization.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use super::document::{PdfDocument, save_to_bytes};
use super::geometry::{PageSize, SizePolicy};
use super::page;

/// Size directives for a merge request.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Policy applied to every page unless a per-file directive says otherwise.
    pub page_size: Option<String>,
    /// One directive per input file, in input order.
    ///
    /// Files past the end of the list fall back to the global target.
    pub file_resize: Option<Vec<String>>,
}

impl MergeOptions {
    pub fn with_page_size(page_size: impl Into<String>) -> Self {
        Self {
            page_size: Some(page_size.into()),
            file_resize: None,
        }
    }
}

/// Summary of a finished merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub files: usize,
    pub pages: usize,
    /// Pages whose bounding box was changed
    pub resized_pages: usize,
    /// Resized pages whose content could not be scaled
    pub unscaled_pages: usize,
}

/// Merged document bytes with a report.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub bytes: Vec<u8>,
    pub report: MergeReport,
}

/// Merge `(filename, bytes)` inputs into one document, in input order.
///
/// Every input is parsed before anything is produced, so an unreadable file
/// fails the whole request with `Error::DocumentRead` naming it.
pub fn merge_documents(inputs: &[(String, Vec<u8>)], options: &MergeOptions) -> Result<MergeOutput> {
    if inputs.is_empty() {
        return Err(Error::NoInput);
    }

    let global_policy = options
        .page_size
        .as_deref()
        .map(str::parse::<SizePolicy>)
        .transpose()?;
    let directives = options
        .file_resize
        .as_deref()
        .map(|tokens| tokens.iter().map(|t| t.parse::<SizePolicy>()).collect::<Result<Vec<_>>>())
        .transpose()?;

    let documents = inputs
        .iter()
        .map(|(name, bytes)| PdfDocument::from_bytes(name.clone(), bytes))
        .collect::<Result<Vec<_>>>()?;

    let global_target = match global_policy {
        Some(policy) => {
            let all_sizes: Vec<PageSize> = documents.iter().flat_map(PdfDocument::page_sizes).collect();
            policy.resolve(&all_sizes)?
        }
        None => None,
    };
    if let Some(target) = global_target {
        debug!("Global merge target {}", target);
    }

    let mut report = MergeReport {
        files: documents.len(),
        ..MergeReport::default()
    };
    let mut merged = Document::with_version("1.5");
    let mut page_order: Vec<ObjectId> = Vec::new();
    let mut max_id: u32 = 1;

    for (index, document) in documents.into_iter().enumerate() {
        let directive = directives.as_ref().and_then(|d| d.get(index).copied());
        let target = match directive {
            None | Some(SizePolicy::Global) => global_target,
            Some(policy) => policy.resolve(&document.page_sizes())?,
        };

        let name = document.name().to_string();
        let mut doc = document.into_inner();
        for page_id in doc.get_pages().into_values() {
            page::materialize_inherited(&mut doc, page_id)?;
            if let Some(target) = target {
                let outcome = page::resize_page(&mut doc, page_id, target);
                report.resized_pages += 1;
                if !outcome.content_scaled {
                    report.unscaled_pages += 1;
                }
            }
        }

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        debug!("Appending {} pages from {}", page_ids.len(), name);
        page_order.extend(&page_ids);

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    report.pages = page_order.len();
    merged.max_id = max_id;
    let pages_id = merged.new_object_id();

    for page_id in &page_order {
        if let Ok(Object::Dictionary(dict)) = merged.get_object_mut(*page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    let kids: Vec<Object> = page_order.iter().map(|&id| Object::Reference(id)).collect();
    let count = i64::try_from(page_order.len()).unwrap_or(i64::MAX);
    merged.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );

    let catalog_id = merged.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();

    let bytes = save_to_bytes(&mut merged)?;
    info!(
        "Merged {} files into {} pages ({} resized, {} bytes)",
        report.files,
        report.pages,
        report.resized_pages,
        bytes.len()
    );

    Ok(MergeOutput { bytes, report })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pdf::testing::{blank_pdf, encrypted_pdf};

    fn sizes_of(bytes: &[u8]) -> Vec<PageSize> {
        PdfDocument::from_bytes("out.pdf", bytes).unwrap().page_sizes()
    }

    #[test]
    fn test_merge_requires_input() {
        let err = merge_documents(&[], &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoInput));
    }

    #[test]
    fn test_merge_preserves_order_without_resize() {
        let inputs = vec![
            ("b.pdf".to_string(), blank_pdf(&[(400.0, 500.0)])),
            ("a.pdf".to_string(), blank_pdf(&[(200.0, 300.0)])),
        ];
        let output = merge_documents(&inputs, &MergeOptions::default()).unwrap();

        assert_eq!(output.report.pages, 2);
        assert_eq!(output.report.resized_pages, 0);
        assert_eq!(
            sizes_of(&output.bytes),
            vec![PageSize::new(400.0, 500.0), PageSize::new(200.0, 300.0)]
        );
    }

    #[test]
    fn test_merge_many_pages_keeps_sequence() {
        // Enough pages that renumbered ids and page numbers diverge
        let first: Vec<(f32, f32)> = (1..=12).map(|i| (100.0 + i as f32, 100.0)).collect();
        let second: Vec<(f32, f32)> = (1..=3).map(|i| (500.0 + i as f32, 100.0)).collect();
        let inputs = vec![
            ("one.pdf".to_string(), blank_pdf(&first)),
            ("two.pdf".to_string(), blank_pdf(&second)),
        ];
        let output = merge_documents(&inputs, &MergeOptions::default()).unwrap();

        let widths: Vec<f32> = sizes_of(&output.bytes).iter().map(|s| s.width).collect();
        let expected: Vec<f32> = first.iter().chain(&second).map(|(w, _)| *w).collect();
        assert_eq!(widths, expected);
    }

    #[test]
    fn test_merge_largest() {
        let inputs = vec![
            ("a.pdf".to_string(), blank_pdf(&[(200.0, 300.0)])),
            ("b.pdf".to_string(), blank_pdf(&[(400.0, 600.0)])),
        ];
        let output = merge_documents(&inputs, &MergeOptions::with_page_size("largest")).unwrap();

        assert_eq!(output.report.resized_pages, 2);
        assert_eq!(output.report.unscaled_pages, 0);
        assert_eq!(sizes_of(&output.bytes), vec![PageSize::new(400.0, 600.0); 2]);
    }

    #[test]
    fn test_merge_per_file_directives() {
        let inputs = vec![
            ("a.pdf".to_string(), blank_pdf(&[(100.0, 110.0)])),
            ("b.pdf".to_string(), blank_pdf(&[(120.0, 130.0), (140.0, 150.0)])),
            ("c.pdf".to_string(), blank_pdf(&[(50.0, 50.0)])),
        ];
        let options = MergeOptions {
            page_size: Some("8.5inx11in".to_string()),
            file_resize: Some(vec!["preserve".to_string(), "A4".to_string()]),
        };
        let output = merge_documents(&inputs, &options).unwrap();
        let sizes = sizes_of(&output.bytes);

        assert_eq!(sizes.len(), 4);
        assert_eq!(sizes[0], PageSize::new(100.0, 110.0));
        assert!((sizes[1].width - 595.28).abs() < 1.0);
        assert!((sizes[2].height - 841.89).abs() < 1.0);
        // Missing trailing directive falls back to the global target
        assert!((sizes[3].width - 612.0).abs() < 1.0);
        assert!((sizes[3].height - 792.0).abs() < 1.0);
    }

    #[test]
    fn test_merge_directive_resolved_per_document() {
        let inputs = vec![
            ("a.pdf".to_string(), blank_pdf(&[(100.0, 100.0), (300.0, 200.0)])),
            ("b.pdf".to_string(), blank_pdf(&[(900.0, 900.0)])),
        ];
        let options = MergeOptions {
            page_size: None,
            file_resize: Some(vec!["largest".to_string(), "global".to_string()]),
        };
        let sizes = sizes_of(&merge_documents(&inputs, &options).unwrap().bytes);

        assert_eq!(sizes[0], PageSize::new(300.0, 200.0));
        assert_eq!(sizes[1], PageSize::new(300.0, 200.0));
        // "global" with no global policy leaves the page alone
        assert_eq!(sizes[2], PageSize::new(900.0, 900.0));
    }

    #[test]
    fn test_merge_reports_unreadable_file() {
        let inputs = vec![
            ("good.pdf".to_string(), blank_pdf(&[(100.0, 100.0)])),
            ("broken.pdf".to_string(), b"%PDF-1.4 garbage".to_vec()),
        ];
        let err = merge_documents(&inputs, &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DocumentRead { ref file, .. } if file == "broken.pdf"));
    }

    #[test]
    fn test_merge_refuses_password_protected_file() {
        for user_password in ["", "secret"] {
            let inputs = vec![
                ("good.pdf".to_string(), blank_pdf(&[(100.0, 100.0)])),
                ("locked.pdf".to_string(), encrypted_pdf(user_password)),
            ];
            let err = merge_documents(&inputs, &MergeOptions::with_page_size("largest")).unwrap_err();
            assert!(
                matches!(err, Error::DocumentRead { ref file, .. } if file == "locked.pdf"),
                "{user_password:?}: {err}"
            );
        }
    }

    #[test]
    fn test_merge_rejects_bad_size_token() {
        let inputs = vec![("a.pdf".to_string(), blank_pdf(&[(100.0, 100.0)]))];
        let err = merge_documents(&inputs, &MergeOptions::with_page_size("huge")).unwrap_err();
        assert!(matches!(err, Error::SizePolicyParse { .. }));
    }
}

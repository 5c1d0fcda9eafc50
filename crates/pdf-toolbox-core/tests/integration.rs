//! Integration tests for pdf-toolbox-core
//!
//! These tests exercise the public operations end to end:
//! - Merging with global and per-file page sizes
//! - Compression in every mode
//! - Text and signature overlays
//! - Upload store round trips

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Cursor;

use bytes::Bytes;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream};
use pdf_toolbox_core::pdf::overlay::{add_signature, add_text};
use pdf_toolbox_core::{
    CompressOptions, CompressionMode, Error, ImageElement, MergeOptions, PageSize, PdfDocument, Position,
    SignatureDate, UploadKey, UploadKind, UploadStore, compress_document, merge_documents,
};

// =============================================================================
// Test Fixtures
// =============================================================================

/// Build a PDF with one page per size, each drawing its page number.
fn make_pdf(sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for (i, &(width, height)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![20.into(), 20.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", i + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), width.into(), height.into()]),
            ),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        page_tree_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("Failed to save fixture");
    output
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 255]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn sizes(bytes: &[u8]) -> Vec<PageSize> {
    PdfDocument::from_bytes("result.pdf", bytes)
        .expect("Output should be a readable PDF")
        .page_sizes()
}

fn named(name: &str, bytes: Vec<u8>) -> (String, Vec<u8>) {
    (name.to_string(), bytes)
}

// =============================================================================
// Merge Tests
// =============================================================================

#[test]
fn test_merge_page_count_is_sum_of_inputs() {
    let inputs = vec![
        named("one.pdf", make_pdf(&[(612, 792)])),
        named("three.pdf", make_pdf(&[(612, 792), (612, 792), (612, 792)])),
        named("two.pdf", make_pdf(&[(300, 400), (400, 300)])),
    ];
    let output = merge_documents(&inputs, &MergeOptions::default()).expect("Merge should succeed");

    assert_eq!(output.report.files, 3);
    assert_eq!(output.report.pages, 6);
    assert_eq!(sizes(&output.bytes).len(), 6);
}

#[test]
fn test_merge_keeps_input_order() {
    let inputs = vec![named("b.pdf", make_pdf(&[(400, 500)])), named("a.pdf", make_pdf(&[(200, 300)]))];
    let output = merge_documents(&inputs, &MergeOptions::default()).unwrap();

    assert_eq!(sizes(&output.bytes), vec![PageSize::new(400.0, 500.0), PageSize::new(200.0, 300.0)]);
}

#[test]
fn test_merge_largest_normalizes_every_page() {
    let inputs = vec![named("a.pdf", make_pdf(&[(200, 300)])), named("b.pdf", make_pdf(&[(400, 600)]))];
    let output = merge_documents(&inputs, &MergeOptions::with_page_size("largest")).unwrap();

    assert_eq!(sizes(&output.bytes), vec![PageSize::new(400.0, 600.0); 2]);
}

#[test]
fn test_merge_explicit_and_named_sizes() {
    let inputs = vec![named("a.pdf", make_pdf(&[(100, 110)])), named("b.pdf", make_pdf(&[(120, 130)]))];

    let letter = merge_documents(&inputs, &MergeOptions::with_page_size("8.5inx11in")).unwrap();
    for size in sizes(&letter.bytes) {
        assert!((size.width - 612.0).abs() < 1.0 && (size.height - 792.0).abs() < 1.0, "{size}");
    }

    let a4 = merge_documents(&inputs, &MergeOptions::with_page_size("A4")).unwrap();
    for size in sizes(&a4.bytes) {
        assert!((size.width - 595.28).abs() < 1.0 && (size.height - 841.89).abs() < 1.0, "{size}");
    }
}

#[test]
fn test_merge_corrupt_input_names_the_file() {
    let inputs = vec![
        named("fine.pdf", make_pdf(&[(612, 792)])),
        named("corrupt.pdf", b"this is not a valid pdf file".to_vec()),
    ];
    match merge_documents(&inputs, &MergeOptions::default()) {
        Err(Error::DocumentRead { file, .. }) => assert_eq!(file, "corrupt.pdf"),
        other => panic!("expected DocumentRead, got {other:?}"),
    }
}

// =============================================================================
// Compression Tests
// =============================================================================

#[test]
fn test_compression_never_adds_pages() {
    let input = make_pdf(&[(612, 792), (612, 792)]);
    for mode in [CompressionMode::Lossless, CompressionMode::Optimize, CompressionMode::Downscale] {
        let output = compress_document("in.pdf", &input, &CompressOptions::new(mode)).unwrap();
        assert_eq!(sizes(&output.bytes).len(), 2, "{mode}");
        assert_eq!(output.report.mode, mode);
    }
}

#[test]
fn test_optimize_output_not_larger_than_conservative_pass() {
    let input = make_pdf(&[(612, 792); 5]);

    let mut conservative = Document::load_mem(&input).unwrap();
    conservative.prune_objects();
    conservative.delete_zero_length_streams();
    conservative.compress();
    conservative.renumber_objects();
    let mut conservative_bytes = Vec::new();
    conservative.save_to(&mut conservative_bytes).unwrap();

    let output = compress_document("in.pdf", &input, &CompressOptions::new(CompressionMode::Optimize)).unwrap();
    assert!(output.bytes.len() <= conservative_bytes.len());
}

/// Encrypt a one-page document with 128-bit RC4 under the given user password.
fn make_encrypted_pdf(user_password: &str) -> Vec<u8> {
    let mut doc = Document::load_mem(&make_pdf(&[(612, 792)])).unwrap();
    let id = Object::string_literal(b"0123456789abcdef".to_vec());
    doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::default(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();
    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

#[test]
fn test_encrypted_input_is_rejected() {
    for user_password in ["", "secret"] {
        let input = make_encrypted_pdf(user_password);

        let err = compress_document("locked.pdf", &input, &CompressOptions::new(CompressionMode::Lossless)).unwrap_err();
        assert!(matches!(err, Error::EncryptedDocument), "{user_password:?}: {err}");

        let inputs = vec![
            ("open.pdf".to_string(), make_pdf(&[(612, 792)])),
            ("locked.pdf".to_string(), input.clone()),
        ];
        let err = merge_documents(&inputs, &MergeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::DocumentRead { ref file, .. } if file == "locked.pdf"), "{err}");

        let err = add_text("locked.pdf", &input, 1, Position::default(), "x", 12.0).unwrap_err();
        assert!(matches!(err, Error::DocumentRead { .. }), "{err}");
    }
}

// =============================================================================
// Overlay Tests
// =============================================================================

#[test]
fn test_text_overlay_keeps_page_count() {
    let input = make_pdf(&[(612, 792), (612, 792)]);
    let output = add_text("in.pdf", &input, 2, Position { x: 72.0, y: 72.0 }, "Reviewed", 14.0).unwrap();
    assert_eq!(sizes(&output), sizes(&input));
}

#[test]
fn test_signature_overlay_keeps_page_count() {
    let input = make_pdf(&[(612, 792), (595, 842), (612, 792)]);
    let signature = ImageElement {
        data: png_bytes(60, 30),
        width: 100.0,
        height: 50.0,
        date: Some(SignatureDate::Today),
    };
    let output = add_signature("in.pdf", &input, 3, Position::default(), signature).unwrap();
    assert_eq!(sizes(&output), sizes(&input));
}

#[test]
fn test_overlay_page_out_of_range() {
    let input = make_pdf(&[(612, 792)]);
    let err = add_text("in.pdf", &input, 2, Position::default(), "late", 12.0).unwrap_err();
    assert!(matches!(err, Error::PageOutOfRange { page: 2, total: 1 }));
}

// =============================================================================
// Upload Store Tests
// =============================================================================

#[tokio::test]
async fn test_store_then_sign() {
    let store = UploadStore::new(16, 60);
    let token = uuid::Uuid::new_v4();
    let pdf_key = UploadKey::new(UploadKind::Pdf, token);
    let sig_key = UploadKey::new(UploadKind::Signature, token);

    store.put(pdf_key, Bytes::from(make_pdf(&[(612, 792)]))).await;
    store.put(sig_key, Bytes::from(png_bytes(20, 10))).await;

    let pdf = store.get(pdf_key).await.expect("PDF should be stored");
    let signature = store.get(sig_key).await.expect("Signature should be stored");
    let output = add_signature(
        "stored.pdf",
        &pdf,
        1,
        Position::default(),
        ImageElement {
            data: signature.to_vec(),
            width: 100.0,
            height: 50.0,
            date: None,
        },
    )
    .unwrap();
    assert_eq!(sizes(&output).len(), 1);
}

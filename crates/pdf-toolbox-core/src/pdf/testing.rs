//! In-memory PDF fixtures for unit tests.

#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use lopdf::content::{Content, Operation};
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream, dictionary};

/// Build a document with one page per `(width, height)`, each drawing a line of text.
pub fn build(sizes: &[(f32, f32)]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(sizes.len());
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![10.into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", index + 1))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Serialized form of [`build`].
pub fn blank_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = build(sizes);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A single page that has a MediaBox but no `/Contents` entry.
pub fn page_without_contents(width: f32, height: f32) -> Document {
    let mut doc = build(&[(width, height)]);
    let page_id = *doc.get_pages().get(&1).unwrap();
    doc.get_dictionary_mut(page_id).unwrap().remove(b"Contents");
    doc
}

/// A single-page document that draws one raw RGB image XObject named `/Im0`.
pub fn pdf_with_image(image_width: u32, image_height: u32) -> Vec<u8> {
    let mut doc = build(&[(612.0, 792.0)]);
    let page_id = *doc.get_pages().get(&1).unwrap();

    let mut pixels = Vec::with_capacity((image_width * image_height * 3) as usize);
    for y in 0..image_height {
        for x in 0..image_width {
            pixels.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 128]);
        }
    }
    let image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image_width),
            "Height" => i64::from(image_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        pixels,
    );
    let image_id = doc.add_object(image);

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    doc.get_dictionary_mut(page_id).unwrap().set(
        "Resources",
        dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => dictionary! { "Im0" => image_id },
        },
    );

    let draw = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("cm", vec![200.into(), 0.into(), 0.into(), 200.into(), 50.into(), 50.into()]),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    super::page::append_content(&mut doc, page_id, draw.operations).unwrap();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// A one-page document encrypted with 128-bit RC4 (security handler V2).
///
/// With an empty `user_password` lopdf decrypts it while loading.
pub fn encrypted_pdf(user_password: &str) -> Vec<u8> {
    let mut doc = build(&[(612.0, 792.0)]);
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(b"pdf-toolbox-test".to_vec()),
            Object::string_literal(b"pdf-toolbox-test".to_vec()),
        ]),
    );
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::default(),
    })
    .unwrap();
    doc.encrypt(&state).unwrap();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

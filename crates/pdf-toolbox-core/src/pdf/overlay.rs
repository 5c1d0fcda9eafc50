//! Text and signature overlays.
//!
//! # Coordinate System
//!
//! Callers position elements from the **top-left** corner of the page, with Y
//! increasing downward. PDF uses a bottom-left origin, so the element's
//! lower edge lands at
//! ```text
//! pdf_y = page_top - y - element_height
//! ```
//!
//! # Overlay Strategy
//!
//! The element is drawn into a Form XObject whose `BBox` is the target page's
//! MediaBox. The original page content is wrapped in `q … Q` and the form is
//! painted after it, so the overlay always sits on top. Only the target page
//! is touched.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDate};
use image::imageops::FilterType;
use lopdf::content::Operation;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::{Error, Result};
use super::document::{PdfDocument, save_to_bytes};
use super::font::{self, FONT_RESOURCE};
use super::page::{self, rect_object};
use super::page_index::{PageIndex, PagePlacement};

// =============================================================================
// Layout Constants
// =============================================================================

/// Font size of the date stamped under a signature.
const DATE_FONT_SIZE: f32 = 9.0;

/// Distance from the bottom edge of the signature to the date baseline.
const DATE_OFFSET: f32 = 15.0;

/// Resource name of the signature image inside the overlay form.
const IMAGE_RESOURCE: &str = "Sig";

// =============================================================================
// Public Types
// =============================================================================

/// Top-left based position of an element, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

/// Date printed under a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureDate {
    /// The local date when the overlay is rendered
    Today,
    On(NaiveDate),
}

impl SignatureDate {
    /// Parse a `YYYY-MM-DD` form value; blank means today.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::Today);
        }
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map(Self::On)
            .map_err(|_| Error::InvalidDate(input.to_string()))
    }

    /// The stamp text, e.g. `05-MAR-2024`.
    pub fn label(self) -> String {
        let date = match self {
            Self::Today => Local::now().date_naive(),
            Self::On(date) => date,
        };
        date.format("%d-%b-%Y").to_string().to_uppercase()
    }
}

/// A single line of Helvetica text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextElement {
    pub text: String,
    pub font_size: f32,
}

/// A raster image (typically a signature), optionally dated.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    /// Encoded image bytes in any format the `image` crate can read
    pub data: Vec<u8>,
    pub width: f32,
    pub height: f32,
    pub date: Option<SignatureDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayElement {
    Text(TextElement),
    Image(ImageElement),
}

/// Everything needed to place one element on one page.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRequest {
    /// 1-based page number
    pub page: usize,
    pub position: Position,
    pub element: OverlayElement,
    pub placement: PagePlacement,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Draw a line of text on one page.
pub fn add_text(name: &str, pdf: &[u8], page: usize, position: Position, text: &str, font_size: f32) -> Result<Vec<u8>> {
    apply_overlay(
        name,
        pdf,
        &OverlayRequest {
            page,
            position,
            element: OverlayElement::Text(TextElement {
                text: text.to_string(),
                font_size,
            }),
            placement: PagePlacement::default(),
        },
    )
}

/// Draw a signature image (and optionally its date) on one page.
pub fn add_signature(name: &str, pdf: &[u8], page: usize, position: Position, signature: ImageElement) -> Result<Vec<u8>> {
    apply_overlay(
        name,
        pdf,
        &OverlayRequest {
            page,
            position,
            element: OverlayElement::Image(signature),
            placement: PagePlacement::default(),
        },
    )
}

/// Composite the requested element onto its target page.
pub fn apply_overlay(name: &str, pdf: &[u8], request: &OverlayRequest) -> Result<Vec<u8>> {
    validate(&request.element)?;

    let document = PdfDocument::from_bytes(name, pdf)?;
    let index = PageIndex::from_one_based(request.page, document.page_count(), request.placement)?;
    let mut doc = document.into_inner();

    let pages = doc.get_pages();
    let page_id = *pages
        .get(&index.as_lopdf_page_number())
        .ok_or(Error::PageOutOfRange {
            page: request.page,
            total: pages.len(),
        })?;

    let media_box = page::media_box(&doc, page_id);
    let form_id = build_form(&mut doc, media_box, request.position, &request.element)?;
    attach_form(&mut doc, page_id, form_id)?;

    info!("Added overlay to page {} of {}", index.as_usize() + 1, name);
    save_to_bytes(&mut doc)
}

/// Decode a drawn signature sent as base64, optionally as a `data:` URI.
pub fn decode_signature_data(data: &str) -> Result<Vec<u8>> {
    let data = data.trim();
    let payload = if data.starts_with("data:image") {
        data.split_once(',').map_or("", |(_, payload)| payload)
    } else {
        data
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::ImageDecode(format!("invalid base64 signature: {e}")))?;
    if bytes.is_empty() {
        return Err(Error::ImageDecode("empty signature data".to_string()));
    }
    Ok(bytes)
}

// =============================================================================
// Form Construction
// =============================================================================

fn validate(element: &OverlayElement) -> Result<()> {
    match element {
        OverlayElement::Text(text) => {
            if text.text.is_empty() {
                return Err(Error::EmptyContent);
            }
            if !(text.font_size.is_finite() && text.font_size > 0.0) {
                return Err(Error::InvalidOverlaySize(format!("font size {}", text.font_size)));
            }
        }
        OverlayElement::Image(image) => {
            let positive = |v: f32| v.is_finite() && v >= 1.0;
            if !positive(image.width) || !positive(image.height) {
                return Err(Error::InvalidOverlaySize(format!("{}x{}", image.width, image.height)));
            }
        }
    }
    Ok(())
}

fn build_form(doc: &mut Document, media_box: [f32; 4], position: Position, element: &OverlayElement) -> Result<ObjectId> {
    let [llx, _, _, ury] = media_box;
    let left = llx + position.x;

    let mut resources = Dictionary::new();
    resources.set(
        "Font",
        Dictionary::from_iter([(FONT_RESOURCE, Object::Dictionary(font::helvetica()))]),
    );

    let mut operations = vec![Operation::new("q", vec![]), Operation::new("g", vec![Object::Integer(0)])];
    match element {
        OverlayElement::Text(text) => {
            let baseline = ury - position.y - text.font_size;
            operations.extend(text_operations(&text.text, text.font_size, left, baseline));
        }
        OverlayElement::Image(image) => {
            let bottom = ury - position.y - image.height;
            let image_id = embed_image(doc, image)?;
            resources.set(
                "XObject",
                Dictionary::from_iter([(IMAGE_RESOURCE, Object::Reference(image_id))]),
            );
            operations.extend([
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(image.width),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(image.height),
                        Object::Real(left),
                        Object::Real(bottom),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ]);

            if let Some(date) = image.date {
                let label = date.label();
                let centre = left + image.width / 2.0;
                let start = centre - font::text_width(&label, DATE_FONT_SIZE) / 2.0;
                operations.extend(text_operations(&label, DATE_FONT_SIZE, start, bottom - DATE_OFFSET));
            }
        }
    }
    operations.push(Operation::new("Q", vec![]));

    let content = lopdf::content::Content { operations }
        .encode()
        .map_err(|e| Error::Lopdf(format!("Failed to encode overlay: {e}")))?;

    let dict = Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Form".to_vec())),
        ("BBox", rect_object(media_box)),
        ("Resources", Object::Dictionary(resources)),
    ]);
    let mut form = Stream::new(dict, content);
    form.compress()
        .map_err(|e| Error::Lopdf(format!("Failed to compress overlay: {e}")))?;
    Ok(doc.add_object(form))
}

fn text_operations(text: &str, font_size: f32, x: f32, y: f32) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), Object::Real(font_size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::string_literal(font::encode(text))]),
        Operation::new("ET", vec![]),
    ]
}

/// Decode, resize and embed an image as RGB with an alpha soft mask.
fn embed_image(doc: &mut Document, image: &ImageElement) -> Result<ObjectId> {
    if image.data.is_empty() {
        return Err(Error::ImageDecode("empty image data".to_string()));
    }
    let decoded = image::load_from_memory(&image.data).map_err(|e| Error::ImageDecode(e.to_string()))?;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (width_px, height_px) = (image.width as u32, image.height as u32);
    let rgba = decoded
        .resize_exact(width_px.max(1), height_px.max(1), FilterType::Lanczos3)
        .to_rgba8();
    let (width_px, height_px) = rgba.dimensions();
    debug!("Embedding {}x{} signature image", width_px, height_px);

    let mut rgb = Vec::with_capacity(rgba.as_raw().len() / 4 * 3);
    let mut alpha = Vec::with_capacity(rgba.as_raw().len() / 4);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let image_dict = |color_space: &[u8]| {
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(width_px))),
            ("Height", Object::Integer(i64::from(height_px))),
            ("ColorSpace", Object::Name(color_space.to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ])
    };

    let mut mask = Stream::new(image_dict(b"DeviceGray"), alpha);
    mask.compress()
        .map_err(|e| Error::Lopdf(format!("Failed to compress image mask: {e}")))?;
    let mask_id = doc.add_object(mask);

    let mut dict = image_dict(b"DeviceRGB");
    dict.set("SMask", Object::Reference(mask_id));
    let mut stream = Stream::new(dict, rgb);
    stream
        .compress()
        .map_err(|e| Error::Lopdf(format!("Failed to compress image: {e}")))?;
    Ok(doc.add_object(stream))
}

// =============================================================================
// Page Attachment
// =============================================================================

/// Register the form in the page resources and paint it after the page content.
fn attach_form(doc: &mut Document, page_id: ObjectId, form_id: ObjectId) -> Result<()> {
    page::materialize_inherited(doc, page_id)?;

    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    let mut resources = match page_dict.get(b"Resources") {
        Ok(value) => match page::resolve(doc, value) {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    let mut xobjects = match resources.get(b"XObject") {
        Ok(value) => match page::resolve(doc, value) {
            Object::Dictionary(dict) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };

    let name = (0..)
        .map(|n| format!("Ov{n}"))
        .find(|candidate| !xobjects.has(candidate.as_bytes()))
        .unwrap_or_else(|| "Ov".to_string());
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(form_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    // Written inline so pages sharing the original dictionary are not affected
    doc.get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?
        .set("Resources", Object::Dictionary(resources));

    let paint = vec![
        Operation::new("q", vec![]),
        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
        Operation::new("Q", vec![]),
    ];
    let mut suffix = vec![Operation::new("Q", vec![])];
    suffix.extend(paint.clone());

    if !page::wrap_content(doc, page_id, vec![Operation::new("q", vec![])], suffix)? {
        page::append_content(doc, page_id, paint)?;
    }
    Ok(())
}

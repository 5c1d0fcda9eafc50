//! Page-level helpers on top of lopdf: bounding boxes, inherited
//! attributes and content-stream wrapping.
//!
//! # Coordinate System
//!
//! PDF uses a **bottom-left origin**: (0, 0) is the bottom-left corner of the
//! MediaBox and Y increases upward. Callers of the overlay annotator measure
//! from the top-left, so they convert with
//! ```text
//! pdf_y = page_height - y - element_height
//! ```

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::error::{Error, Result};
use super::geometry::{PageSize, scale_factor};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// US Letter, used when no MediaBox can be found anywhere in the tree.
const FALLBACK_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Outcome of resizing a single page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeOutcome {
    /// Uniform scale factor computed for the content
    pub scale: f32,
    /// Whether the content streams were actually wrapped in the scale transform
    pub content_scaled: bool,
}

/// Get the media box of a page, following `Parent` links for inherited values.
pub fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    doc.get_object(page_id)
        .ok()
        .and_then(|page| find_media_box(doc, page, 0))
        .unwrap_or(FALLBACK_MEDIA_BOX)
}

fn find_media_box(doc: &Document, node: &Object, depth: usize) -> Option<[f32; 4]> {
    // Malformed trees can contain Parent cycles
    if depth > 64 {
        return None;
    }
    let Object::Dictionary(dict) = node else {
        return None;
    };

    if let Ok(value) = dict.get(b"MediaBox")
        && let Some(rect) = rect_from_object(resolve(doc, value))
    {
        return Some(rect);
    }

    let parent_id = dict.get(b"Parent").ok()?.as_reference().ok()?;
    find_media_box(doc, doc.get_object(parent_id).ok()?, depth + 1)
}

/// Natural size of a page in points.
pub fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let [llx, lly, urx, ury] = media_box(doc, page_id);
    PageSize::new((urx - llx).abs(), (ury - lly).abs())
}

/// Follow a single indirect reference, returning the object itself otherwise.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Read a number stored as either an integer or a real.
#[allow(clippy::cast_precision_loss)]
pub const fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rect_from_object(object: &Object) -> Option<[f32; 4]> {
    let Object::Array(arr) = object else {
        return None;
    };
    if arr.len() != 4 {
        return None;
    }
    let values: Vec<f32> = arr.iter().filter_map(number).collect();
    (values.len() == 4).then(|| [values[0], values[1], values[2], values[3]])
}

/// A rectangle as a PDF array.
pub fn rect_object(rect: [f32; 4]) -> Object {
    Object::Array(rect.iter().map(|&v| Object::Real(v)).collect())
}

/// Copy inherited attributes onto the page itself.
///
/// Pages moved into a different page tree lose their ancestors, so any
/// MediaBox, CropBox, Resources or Rotate they inherited must be written onto
/// the page before the move.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
        let missing: Vec<&[u8]> = INHERITABLE_KEYS
            .into_iter()
            .filter(|key| !page.has(key))
            .collect();

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;
        while let Some(parent_id) = parent {
            if depth > 64 {
                break;
            }
            let Ok(node) = doc.get_dictionary(parent_id) else {
                break;
            };
            for key in &missing {
                if !inherited.iter().any(|(k, _)| k == key)
                    && let Ok(value) = node.get(key)
                {
                    inherited.push((key, value.clone()));
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// References to the page's content streams, in drawing order.
///
/// Returns `None` when the page has no content entry lopdf can address.
pub(crate) fn content_refs(doc: &Document, page_id: ObjectId) -> Option<Vec<Object>> {
    let page = doc.get_dictionary(page_id).ok()?;
    match page.get(b"Contents").ok()? {
        Object::Reference(id) => match doc.get_object(*id).ok()? {
            Object::Array(arr) => Some(arr.clone()),
            Object::Stream(_) => Some(vec![Object::Reference(*id)]),
            _ => None,
        },
        Object::Array(arr) => Some(arr.clone()),
        _ => None,
    }
}

/// Encode operations into a new stream object and return its id.
pub fn add_content_stream(doc: &mut Document, operations: Vec<Operation>) -> Result<ObjectId> {
    let content = Content { operations }
        .encode()
        .map_err(|e| Error::Lopdf(format!("Failed to encode content: {e}")))?;
    Ok(doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content))))
}

/// Surround the page's existing content with `prefix` and `suffix` streams.
///
/// Returns `Ok(false)` without touching the page if it has no content to wrap.
pub fn wrap_content(
    doc: &mut Document,
    page_id: ObjectId,
    prefix: Vec<Operation>,
    suffix: Vec<Operation>,
) -> Result<bool> {
    let Some(existing) = content_refs(doc, page_id).filter(|refs| !refs.is_empty()) else {
        return Ok(false);
    };

    let prefix_id = add_content_stream(doc, prefix)?;
    let suffix_id = add_content_stream(doc, suffix)?;

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(prefix_id));
    contents.extend(existing);
    contents.push(Object::Reference(suffix_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
    page.set("Contents", Object::Array(contents));
    Ok(true)
}

/// Append a content stream after whatever the page already draws.
pub fn append_content(doc: &mut Document, page_id: ObjectId, operations: Vec<Operation>) -> Result<()> {
    let content_id = add_content_stream(doc, operations)?;
    let existing = content_refs(doc, page_id).unwrap_or_default();

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if existing.is_empty() {
        page.set("Contents", Object::Reference(content_id));
    } else {
        let mut contents = existing;
        contents.push(Object::Reference(content_id));
        page.set("Contents", Object::Array(contents));
    }
    Ok(())
}

/// Resize a page to exactly `target`.
///
/// The content is scaled uniformly by `min(tw / w, th / h)` and moved to the
/// origin. Scaling is best-effort: when the page has no content streams to
/// wrap, or wrapping fails, the content is left as it is. The MediaBox (and
/// CropBox, if any) is set to `[0 0 tw th]` in every case, so unscaled
/// content may appear cropped or letterboxed.
pub fn resize_page(doc: &mut Document, page_id: ObjectId, target: PageSize) -> ResizeOutcome {
    let [llx, lly, urx, ury] = media_box(doc, page_id);
    let natural = PageSize::new((urx - llx).abs(), (ury - lly).abs());
    let scale = scale_factor(natural, target);

    let prefix = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                Object::Real(scale),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(scale),
                Object::Real(-llx.min(urx) * scale),
                Object::Real(-lly.min(ury) * scale),
            ],
        ),
    ];
    let suffix = vec![Operation::new("Q", vec![])];

    let content_scaled = match wrap_content(doc, page_id, prefix, suffix) {
        Ok(true) => true,
        Ok(false) => {
            debug!("Page {:?} has no content streams, skipping content scaling", page_id);
            false
        }
        Err(e) => {
            debug!("Content scaling failed for page {:?}: {}", page_id, e);
            false
        }
    };

    let target_box = rect_object([0.0, 0.0, target.width, target.height]);
    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        page.set("MediaBox", target_box.clone());
        if page.has(b"CropBox") {
            page.set("CropBox", target_box);
        }
    } else {
        debug!("Page {:?} is not a dictionary, bounding box left unchanged", page_id);
    }

    ResizeOutcome { scale, content_scaled }
}

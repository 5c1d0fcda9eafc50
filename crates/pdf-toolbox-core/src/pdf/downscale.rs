//! Raster image downscaling for oversized embedded images.

use std::collections::HashSet;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use super::page;

/// Counters collected while downscaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownscaleStats {
    pub downscaled: usize,
    pub skipped: usize,
}

/// Replace every image larger than `max_px` on either axis with a JPEG
/// re-encoding whose larger axis equals `max_px`.
///
/// Images within the bound are left untouched. Images that cannot be decoded
/// are skipped.
pub fn downscale_images(doc: &mut Document, max_px: u32, quality: u8) -> DownscaleStats {
    let mut stats = DownscaleStats::default();

    for image_id in collect_images(doc) {
        let Ok(Object::Stream(stream)) = doc.get_object(image_id) else {
            continue;
        };
        let (Some(width), Some(height)) = (dimension(&stream.dict, b"Width"), dimension(&stream.dict, b"Height")) else {
            debug!("Image {:?} has no usable dimensions, skipping", image_id);
            stats.skipped += 1;
            continue;
        };
        if width <= max_px && height <= max_px {
            continue;
        }

        let decoded = match decode_image(doc, stream, width, height) {
            Ok(image) => image,
            Err(reason) => {
                debug!("Cannot decode image {:?}: {}", image_id, reason);
                stats.skipped += 1;
                continue;
            }
        };

        let resized = decoded.resize(max_px, max_px, FilterType::Lanczos3);
        let replacement = match encode_jpeg(&resized, quality) {
            Ok(stream) => stream,
            Err(reason) => {
                debug!("Cannot re-encode image {:?}: {}", image_id, reason);
                stats.skipped += 1;
                continue;
            }
        };

        if let Ok(Object::Stream(stream)) = doc.get_object_mut(image_id) {
            debug!(
                "Downscaled image {:?} from {}x{} to {}x{}",
                image_id,
                width,
                height,
                resized.width(),
                resized.height()
            );
            replace_image(stream, replacement);
            stats.downscaled += 1;
        }
    }

    stats
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v > 0)
}

fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) if arr.len() == 1 => name_of(&arr[0]),
        _ => None,
    }
}

/// Image XObjects reachable from page resources, including inside Form XObjects.
fn collect_images(doc: &Document) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    for page_id in doc.get_pages().into_values() {
        let Some(resources) = page_resources(doc, page_id) else {
            continue;
        };
        for id in xobject_ids(doc, resources) {
            collect_recursive(doc, id, &mut images, &mut seen);
        }
    }
    images
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..64 {
        if let Ok(resources) = node.get(b"Resources") {
            return Some(page::resolve(doc, resources));
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn xobject_ids(doc: &Document, resources: &Object) -> Vec<ObjectId> {
    let Object::Dictionary(resources) = resources else {
        return Vec::new();
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    match page::resolve(doc, xobjects) {
        Object::Dictionary(dict) => dict
            .iter()
            .filter_map(|(_, value)| value.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_recursive(doc: &Document, id: ObjectId, images: &mut Vec<ObjectId>, seen: &mut HashSet<ObjectId>) {
    if !seen.insert(id) {
        return;
    }
    let Ok(Object::Stream(stream)) = doc.get_object(id) else {
        return;
    };
    match stream.dict.get(b"Subtype").ok().and_then(name_of) {
        Some(b"Image") => images.push(id),
        Some(b"Form") => {
            if let Ok(resources) = stream.dict.get(b"Resources") {
                for child in xobject_ids(doc, page::resolve(doc, resources)) {
                    collect_recursive(doc, child, images, seen);
                }
            }
        }
        _ => {}
    }
}

/// Pixel layout of an image's color space, with references resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup: `palette` holds `base.components()` bytes per entry.
    Indexed { base: Box<ColorModel>, palette: Vec<u8> },
}

impl ColorModel {
    const fn components(&self) -> usize {
        match self {
            Self::Gray | Self::Indexed { .. } => 1,
            Self::Rgb => 3,
            Self::Cmyk => 4,
        }
    }

    /// Convert one sample group of a non-indexed model to RGB.
    fn to_rgb(&self, px: &[u8]) -> [u8; 3] {
        match self {
            Self::Gray => [px[0]; 3],
            Self::Rgb => [px[0], px[1], px[2]],
            Self::Cmyk => {
                let k = 255 - u16::from(px[3]);
                let channel = |c: u8| u8::try_from((255 - u16::from(c)) * k / 255).unwrap_or(0);
                [channel(px[0]), channel(px[1]), channel(px[2])]
            }
            Self::Indexed { .. } => [0; 3],
        }
    }
}

fn color_model(doc: &Document, object: &Object) -> Result<ColorModel, String> {
    match page::resolve(doc, object) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Ok(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Ok(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Ok(ColorModel::Cmyk),
            other => Err(format!("unsupported color space {}", String::from_utf8_lossy(other))),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|f| f.as_name().ok()).unwrap_or_default();
            match family {
                b"ICCBased" => icc_model(doc, items.get(1)),
                b"CalGray" => Ok(ColorModel::Gray),
                b"CalRGB" => Ok(ColorModel::Rgb),
                b"Indexed" | b"I" => indexed_model(doc, items),
                _ if items.len() == 1 => color_model(doc, &items[0]),
                other => Err(format!("unsupported color space {}", String::from_utf8_lossy(other))),
            }
        }
        _ => Err("missing color space".to_string()),
    }
}

/// `[/ICCBased stream]`: use `/Alternate` when present, else the `/N` component count.
fn icc_model(doc: &Document, profile: Option<&Object>) -> Result<ColorModel, String> {
    let profile = profile
        .map(|p| page::resolve(doc, p))
        .and_then(|p| p.as_stream().ok())
        .ok_or("ICC profile is not a stream")?;
    if let Ok(alternate) = profile.dict.get(b"Alternate") {
        return color_model(doc, alternate);
    }
    match profile.dict.get(b"N").and_then(Object::as_i64) {
        Ok(1) => Ok(ColorModel::Gray),
        Ok(3) => Ok(ColorModel::Rgb),
        Ok(4) => Ok(ColorModel::Cmyk),
        _ => Err("ICC profile has no usable /N".to_string()),
    }
}

/// `[/Indexed base hival lookup]`
fn indexed_model(doc: &Document, items: &[Object]) -> Result<ColorModel, String> {
    let [_, base, hival, lookup] = items else {
        return Err("malformed Indexed color space".to_string());
    };
    let base = color_model(doc, base)?;
    if matches!(base, ColorModel::Indexed { .. }) {
        return Err("nested Indexed color space".to_string());
    }
    let entries = page::resolve(doc, hival)
        .as_i64()
        .ok()
        .and_then(|h| usize::try_from(h).ok())
        .map(|h| h + 1)
        .ok_or("Indexed hival is not a number")?;

    let palette = match page::resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => stream
            .get_plain_content()
            .map_err(|e| format!("invalid palette stream: {e}"))?,
        _ => return Err("Indexed lookup is neither a string nor a stream".to_string()),
    };
    let needed = entries * base.components();
    if palette.len() < needed {
        return Err(format!("palette has {} bytes, expected {needed}", palette.len()));
    }
    Ok(ColorModel::Indexed {
        base: Box::new(base),
        palette: palette[..needed].to_vec(),
    })
}

fn filter_names(dict: &Dictionary) -> Vec<&[u8]> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(items)) => items.iter().filter_map(|f| f.as_name().ok()).collect(),
        _ => Vec::new(),
    }
}

fn decode_image(doc: &Document, stream: &Stream, width: u32, height: u32) -> Result<DynamicImage, String> {
    let filters = filter_names(&stream.dict);
    match filters.as_slice() {
        // The JPEG decoder handles gray, RGB and CMYK scans itself
        [b"DCTDecode"] => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|e| format!("invalid JPEG data: {e}"));
        }
        [.., last] if !matches!(*last, b"FlateDecode" | b"LZWDecode" | b"ASCII85Decode") => {
            return Err(format!("unsupported filter {}", String::from_utf8_lossy(last)));
        }
        _ => {}
    }
    let raw = stream
        .get_plain_content()
        .map_err(|e| format!("invalid stream data: {e}"))?;

    let model = color_model(doc, stream.dict.get(b"ColorSpace").map_err(|_| "missing color space")?)?;
    let bits = stream.dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
    let (width_px, height_px) = (width as usize, height as usize);

    match model {
        ColorModel::Indexed { base, palette } => {
            let bits = u8::try_from(bits).ok().filter(|b| matches!(*b, 1 | 2 | 4 | 8));
            let bits = bits.ok_or("unsupported bit depth for Indexed image")?;
            let indices = unpack_indices(&raw, width_px, height_px, bits)?;
            let step = base.components();
            let mut rgb = Vec::with_capacity(indices.len() * 3);
            for index in indices {
                let start = usize::from(index) * step;
                // Out-of-range indices clamp to the last entry
                let start = start.min(palette.len() - step);
                rgb.extend_from_slice(&base.to_rgb(&palette[start..start + step]));
            }
            rgb_image(width, height, rgb)
        }
        model => {
            if bits != 8 {
                return Err(format!("unsupported bit depth {bits}"));
            }
            let step = model.components();
            let needed = width_px * height_px * step;
            if raw.len() < needed {
                return Err("truncated image data".to_string());
            }
            match model {
                ColorModel::Gray => GrayImage::from_raw(width, height, raw[..needed].to_vec())
                    .map(DynamicImage::ImageLuma8)
                    .ok_or_else(|| "gray buffer size mismatch".to_string()),
                ColorModel::Rgb => rgb_image(width, height, raw[..needed].to_vec()),
                _ => {
                    let rgb = raw[..needed].chunks_exact(step).flat_map(|px| model.to_rgb(px)).collect();
                    rgb_image(width, height, rgb)
                }
            }
        }
    }
}

fn rgb_image(width: u32, height: u32, data: Vec<u8>) -> Result<DynamicImage, String> {
    RgbImage::from_raw(width, height, data)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| "RGB buffer size mismatch".to_string())
}

/// Unpack palette indices; every row starts on a byte boundary.
fn unpack_indices(raw: &[u8], width: usize, height: usize, bits: u8) -> Result<Vec<u8>, String> {
    let row_bytes = (width * usize::from(bits)).div_ceil(8);
    if raw.len() < row_bytes * height {
        return Err("truncated image data".to_string());
    }
    if bits == 8 {
        return Ok(raw[..width * height].to_vec());
    }

    let per_byte = 8 / usize::from(bits);
    let mask = (1u8 << bits) - 1;
    let mut indices = Vec::with_capacity(width * height);
    for row in raw.chunks_exact(row_bytes).take(height) {
        for x in 0..width {
            let byte = row[x / per_byte];
            let shift = 8 - usize::from(bits) * (x % per_byte + 1);
            indices.push((byte >> shift) & mask);
        }
    }
    Ok(indices)
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Stream, String> {
    let rgb = image.to_rgb8();
    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| format!("JPEG encoding failed: {e}"))?;

    let mut dict = Dictionary::new();
    dict.set("Width", Object::Integer(i64::from(rgb.width())));
    dict.set("Height", Object::Integer(i64::from(rgb.height())));
    Ok(Stream::new(dict, jpeg.into_inner()))
}

/// Swap in the re-encoded pixels, keeping unrelated dictionary entries.
fn replace_image(target: &mut Stream, replacement: Stream) {
    for key in [b"SMask".as_slice(), b"Mask", b"DecodeParms", b"Decode"] {
        target.dict.remove(key);
    }
    for key in [b"Width".as_slice(), b"Height"] {
        if let Ok(value) = replacement.dict.get(key) {
            target.dict.set(key.to_vec(), value.clone());
        }
    }
    target.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    target.dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    target.dict.set("BitsPerComponent", Object::Integer(8));
    target.dict.set("Length", Object::Integer(i64::try_from(replacement.content.len()).unwrap_or(i64::MAX)));
    target.content = replacement.content;
    // JPEG data must not be Flate-wrapped again on save
    target.allows_compression = false;
}

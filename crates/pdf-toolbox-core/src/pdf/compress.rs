//! Compression strategies.
//!
//! Three mutually exclusive modes:
//! - `Lossless`: compress page content streams that are stored raw
//! - `Optimize`: structural cleanup and stream re-encoding
//! - `Downscale`: re-encode oversized raster images as JPEG

use std::fmt;
use std::str::FromStr;

use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{CompressConfig, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION_PX};
use crate::error::{Error, Result};
use super::document::{PdfDocument, looks_encrypted, save_to_bytes};
use super::page;

/// Which compression strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    Lossless,
    Optimize,
    Downscale,
}

impl CompressionMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::Optimize => "optimize",
            Self::Downscale => "downscale",
        }
    }

    /// Whether this build can run the strategy.
    pub const fn is_available(self) -> bool {
        match self {
            Self::Lossless => true,
            Self::Optimize => cfg!(feature = "optimize"),
            Self::Downscale => cfg!(feature = "downscale"),
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lossless" => Ok(Self::Lossless),
            "optimize" => Ok(Self::Optimize),
            "downscale" => Ok(Self::Downscale),
            _ => Err(Error::UnknownCompressionMode(s.to_string())),
        }
    }
}

/// Options for a compression request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressOptions {
    pub mode: CompressionMode,
    /// Drop the `/Info` dictionary and the catalog `/Metadata` stream
    pub remove_metadata: bool,
    /// Request linearized output (not supported by the writer; logged and ignored)
    pub linearize: bool,
    /// Bound on the larger image axis in `Downscale` mode
    pub max_dimension_px: u32,
    /// JPEG quality (1-100) used in `Downscale` mode
    pub jpeg_quality: u8,
}

impl CompressOptions {
    pub const fn new(mode: CompressionMode) -> Self {
        Self {
            mode,
            remove_metadata: false,
            linearize: false,
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Options seeded from the `[compress]` config section.
    pub const fn from_config(mode: CompressionMode, config: &CompressConfig) -> Self {
        Self {
            mode,
            remove_metadata: false,
            linearize: false,
            max_dimension_px: config.max_dimension_px,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// What a compression run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressReport {
    pub mode: CompressionMode,
    pub input_bytes: usize,
    pub output_bytes: usize,
    pub images_downscaled: usize,
    pub images_skipped: usize,
    /// Content streams that could not be compressed
    pub streams_failed: usize,
    /// Whether the aggressive optimize pass produced the output
    pub aggressive: bool,
}

impl CompressReport {
    const fn new(mode: CompressionMode, input_bytes: usize) -> Self {
        Self {
            mode,
            input_bytes,
            output_bytes: 0,
            images_downscaled: 0,
            images_skipped: 0,
            streams_failed: 0,
            aggressive: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompressOutput {
    pub bytes: Vec<u8>,
    pub report: CompressReport,
}

/// Compress a document with the strategy selected in `options`.
///
/// Encrypted input is rejected before any strategy runs.
pub fn compress_document(name: &str, bytes: &[u8], options: &CompressOptions) -> Result<CompressOutput> {
    if !options.mode.is_available() {
        return Err(Error::CapabilityUnavailable {
            capability: options.mode.as_str(),
        });
    }

    let document = match PdfDocument::from_bytes(name, bytes) {
        Ok(doc) => doc,
        Err(Error::DocumentRead { .. }) if looks_encrypted(bytes) => return Err(Error::EncryptedDocument),
        Err(e) => return Err(e),
    };
    let mut doc = document.into_inner();
    let mut report = CompressReport::new(options.mode, bytes.len());

    if options.remove_metadata {
        remove_metadata(&mut doc);
    }
    if options.linearize {
        warn!("Linearized output is not supported, writing a regular PDF");
    }

    let output = match options.mode {
        CompressionMode::Lossless => {
            report.streams_failed = compress_page_contents(&mut doc);
            save_to_bytes(&mut doc)?
        }
        CompressionMode::Optimize => optimize(doc, bytes.len(), &mut report)?,
        CompressionMode::Downscale => downscale(doc, options, &mut report)?,
    };

    report.output_bytes = output.len();
    info!(
        "Compressed {} with {}: {} -> {} bytes",
        name, options.mode, report.input_bytes, report.output_bytes
    );

    Ok(CompressOutput { bytes: output, report })
}

/// Remove document-level metadata.
pub fn remove_metadata(doc: &mut Document) {
    doc.trailer.remove(b"Info");
    let catalog_id = doc.trailer.get(b"Root").and_then(Object::as_reference);
    if let Ok(catalog_id) = catalog_id
        && let Ok(catalog) = doc.get_dictionary_mut(catalog_id)
    {
        catalog.remove(b"Metadata");
    }
}

/// Compress every raw content stream, page by page.
///
/// Each stream is handled on its own; returns how many could not be
/// compressed. Those streams are left as they were.
fn compress_page_contents(doc: &mut Document) -> usize {
    let mut failed = 0;
    for (number, page_id) in doc.get_pages() {
        let refs = page::content_refs(doc, page_id).unwrap_or_default();
        for id in refs.iter().filter_map(|r| r.as_reference().ok()) {
            let result = match doc.get_object_mut(id) {
                Ok(Object::Stream(stream)) if !stream.dict.has(b"Filter") => {
                    stream.compress().map_err(|e| e.to_string())
                }
                Ok(Object::Stream(_)) => Ok(()),
                Ok(_) => Err("not a stream".to_string()),
                Err(e) => Err(e.to_string()),
            };
            if let Err(reason) = result {
                debug!("Skipping content stream {:?} on page {}: {}", id, number, reason);
                failed += 1;
            }
        }
    }
    failed
}

#[cfg(feature = "optimize")]
fn optimize(doc: Document, input_len: usize, report: &mut CompressReport) -> Result<Vec<u8>> {
    let mut conservative = doc.clone();
    conservative.prune_objects();
    conservative.delete_zero_length_streams();
    conservative.compress();
    conservative.renumber_objects();
    let conservative = save_to_bytes(&mut conservative)?;

    if conservative.len() < input_len {
        return Ok(conservative);
    }

    debug!(
        "Conservative pass did not shrink the file ({} >= {}), trying aggressive pass",
        conservative.len(),
        input_len
    );
    let mut aggressive = doc;
    aggressive.prune_objects();
    aggressive.delete_zero_length_streams();
    reencode_flate_streams(&mut aggressive);
    aggressive.compress();
    aggressive.renumber_objects();
    let aggressive = save_to_bytes(&mut aggressive)?;

    if aggressive.len() < conservative.len() {
        report.aggressive = true;
        Ok(aggressive)
    } else {
        Ok(conservative)
    }
}

#[cfg(not(feature = "optimize"))]
fn optimize(_doc: Document, _input_len: usize, _report: &mut CompressReport) -> Result<Vec<u8>> {
    Err(Error::CapabilityUnavailable { capability: "optimize" })
}

/// Decode every plain Flate stream so the writer re-encodes it.
#[cfg(feature = "optimize")]
fn reencode_flate_streams(doc: &mut Document) {
    for object in doc.objects.values_mut() {
        let Object::Stream(stream) = object else {
            continue;
        };
        let is_flate = matches!(stream.dict.get(b"Filter"), Ok(Object::Name(name)) if name == b"FlateDecode");
        if !is_flate || stream.dict.has(b"DecodeParms") {
            continue;
        }
        match stream.decompressed_content() {
            Ok(plain) => stream.set_plain_content(plain),
            Err(e) => debug!("Keeping Flate stream as is: {}", e),
        }
    }
}

#[cfg(feature = "downscale")]
fn downscale(mut doc: Document, options: &CompressOptions, report: &mut CompressReport) -> Result<Vec<u8>> {
    let stats = super::downscale::downscale_images(&mut doc, options.max_dimension_px, options.jpeg_quality);
    report.images_downscaled = stats.downscaled;
    report.images_skipped = stats.skipped;
    doc.compress();
    save_to_bytes(&mut doc)
}

#[cfg(not(feature = "downscale"))]
fn downscale(_doc: Document, _options: &CompressOptions, _report: &mut CompressReport) -> Result<Vec<u8>> {
    Err(Error::CapabilityUnavailable { capability: "downscale" })
}

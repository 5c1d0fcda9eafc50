mod document;
mod font;
mod geometry;
mod page_index;
pub mod compress;
#[cfg(feature = "downscale")]
mod downscale;
pub mod merge;
pub mod overlay;
pub mod page;

#[cfg(test)]
mod testing;

pub use compress::{CompressOptions, CompressOutput, CompressReport, CompressionMode, compress_document};
pub use document::{PdfDocument, looks_encrypted, save_to_bytes};
pub use geometry::{NamedSize, PageSize, SizePolicy, parse_dimensions, scale_factor};
pub use merge::{MergeOptions, MergeOutput, MergeReport, merge_documents};
pub use overlay::{
    ImageElement, OverlayElement, OverlayRequest, Position, SignatureDate, TextElement, add_signature, add_text,
    apply_overlay, decode_signature_data,
};
pub use page_index::{PageIndex, PagePlacement};

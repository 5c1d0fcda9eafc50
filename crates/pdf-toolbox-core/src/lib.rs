//! PDF Toolbox Core Library
//!
//! This library provides the document operations behind the toolbox:
//! - Merging with page-size normalization
//! - Lossless, structural and image-downscaling compression
//! - Text and signature overlays
//! - A bounded store for uploads reused across requests
//! - Optional Google Drive upload

pub mod config;
pub mod drive;
pub mod error;
pub mod pdf;
pub mod store;
pub mod util;

pub use config::{
    AppConfig, CompressConfig, DriveConfig, MergeConfig, UploadConfig, DEFAULT_JPEG_QUALITY,
    DEFAULT_MAX_DIMENSION_PX, DEFAULT_PAGE_SIZE,
};
pub use drive::{DriveApi, DriveCredentials, DriveFolder, DriveUpload, GoogleDrive, UploadedFile, create_drive_client};
pub use error::{Error, Result};
pub use pdf::{
    CompressOptions, CompressOutput, CompressReport, CompressionMode, ImageElement, MergeOptions, MergeOutput,
    MergeReport, OverlayElement, OverlayRequest, PageSize, PagePlacement, PdfDocument, Position, SignatureDate,
    SizePolicy, TextElement, compress_document, merge_documents,
};
pub use store::{UploadKey, UploadKind, UploadStore};
pub use util::output_filename;

/// Default download name for merged documents
pub const MERGED_FILENAME: &str = "merged.pdf";
/// Default download name for compressed documents
pub const COMPRESSED_FILENAME: &str = "compressed.pdf";
/// Download name for documents with a signature overlay
pub const SIGNED_FILENAME: &str = "signed.pdf";
/// Download name for documents with a text overlay
pub const ANNOTATED_FILENAME: &str = "annotated.pdf";

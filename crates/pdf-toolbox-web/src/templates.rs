//! Askama templates for the full-page views.
//!
//! ## Template Structure
//!
//! - `base.html` - Common layout with navigation and stylesheet
//! - `index.html` - Merge form with file list and previews
//! - `compress.html` - Compression form
//! - `edit.html` - Signature and text overlay forms
//! - `drive_settings.html` - Google Drive connection state

use askama::Template;
use askama_web::WebTemplate;
use pdf_toolbox_core::{CompressionMode, DEFAULT_PAGE_SIZE};

/// Merge page.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub default_page_size: String,
}

impl Default for IndexTemplate {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE.to_string(),
        }
    }
}

/// Compression page.
///
/// Modes compiled out of this build are rendered disabled.
#[derive(Template, WebTemplate)]
#[template(path = "compress.html")]
pub struct CompressTemplate {
    pub optimize_available: bool,
    pub downscale_available: bool,
    pub max_dimension_px: u32,
    pub jpeg_quality: u8,
}

impl CompressTemplate {
    pub const fn new(max_dimension_px: u32, jpeg_quality: u8) -> Self {
        Self {
            optimize_available: CompressionMode::Optimize.is_available(),
            downscale_available: CompressionMode::Downscale.is_available(),
            max_dimension_px,
            jpeg_quality,
        }
    }
}

/// Signature and text overlay page.
#[derive(Template, WebTemplate, Default)]
#[template(path = "edit.html")]
pub struct EditTemplate {
    /// Whether the Drive upload button is offered
    pub drive_connected: bool,
}

/// Google Drive settings page.
#[derive(Template, WebTemplate)]
#[template(path = "drive_settings.html")]
pub struct DriveSettingsTemplate {
    pub configured: bool,
    pub connected: bool,
}

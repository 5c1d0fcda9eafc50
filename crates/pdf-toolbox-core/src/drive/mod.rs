//! Optional Google Drive upload integration.

mod google;
mod traits;

pub use google::{DRIVE_SCOPE, GoogleDrive};
pub use traits::{DriveApi, DriveCredentials, DriveFolder, DriveUpload, UploadedFile};

use crate::config::DriveConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a Drive client from configuration
pub fn create_drive_client(config: &DriveConfig) -> Result<Arc<dyn DriveApi>> {
    let drive = GoogleDrive::new(config.clone())?;
    if !drive.is_configured() {
        tracing::info!("Google Drive client id not set, Drive upload disabled");
    }
    Ok(Arc::new(drive))
}

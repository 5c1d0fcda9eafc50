use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// OAuth tokens for one connected Google account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCredentials {
    pub access_token: String,
    /// Present when the user granted offline access
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// A folder in the user's Drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
}

/// A file to upload.
#[derive(Debug, Clone)]
pub struct DriveUpload {
    pub name: String,
    /// Parent folder id; the Drive root when `None`
    pub folder_id: Option<String>,
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// An uploaded file as reported by Drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    /// Browser link to the file
    pub link: Option<String>,
}

/// Trait for Google Drive access
///
/// Calls that take `&mut DriveCredentials` may refresh the access token; the
/// caller should persist the credentials afterwards.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Whether OAuth client credentials are configured
    fn is_configured(&self) -> bool;

    /// Consent screen URL carrying the anti-forgery `state`
    fn authorization_url(&self, state: &str) -> Result<String>;

    /// Exchange an authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<DriveCredentials>;

    /// Folders directly under the Drive root
    async fn list_folders(&self, credentials: &mut DriveCredentials) -> Result<Vec<DriveFolder>>;

    /// Create a folder under the Drive root
    async fn create_folder(&self, credentials: &mut DriveCredentials, name: &str) -> Result<DriveFolder>;

    /// Upload a file
    async fn upload(&self, credentials: &mut DriveCredentials, file: DriveUpload) -> Result<UploadedFile>;
}

use anyhow::{Context, Result};
use pdf_toolbox_core::{AppConfig, DriveApi, DriveCredentials, UploadKey, UploadKind, UploadStore, create_drive_client};
use std::sync::Arc;
use tower_sessions::Session;
use uuid::Uuid;

use crate::helpers::{ResultExt, RouteResult};

/// Session key holding the token that names this visitor's uploads
const UPLOAD_TOKEN_KEY: &str = "upload_token";
/// Session key holding the pending OAuth `state`
const DRIVE_STATE_KEY: &str = "drive_state";
/// Session key holding Drive OAuth tokens
const DRIVE_CREDENTIALS_KEY: &str = "drive_credentials";

/// Global application state
pub struct AppState {
    pub config: AppConfig,
    /// Uploaded PDFs and signatures awaiting a follow-up request
    pub store: UploadStore,
    pub drive: Arc<dyn DriveApi>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let drive = create_drive_client(&config.drive).context("Failed to create Google Drive client")?;
        Ok(Self::with_drive(config, drive))
    }

    pub fn with_drive(config: AppConfig, drive: Arc<dyn DriveApi>) -> Self {
        Self {
            store: UploadStore::from_config(&config.upload),
            config,
            drive,
        }
    }
}

/// Typed accessors for the values kept in the cookie session.
///
/// The session only holds small values; uploaded bytes live in the
/// [`UploadStore`] under keys derived from the session's upload token.
pub struct SessionData<'a> {
    session: &'a Session,
}

impl<'a> SessionData<'a> {
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Store key for this session's upload of `kind`, minting the token on first use.
    pub async fn upload_key(&self, kind: UploadKind) -> RouteResult<UploadKey> {
        let existing = self
            .session
            .get::<String>(UPLOAD_TOKEN_KEY)
            .await
            .or_internal_error()?
            .and_then(|token| Uuid::parse_str(&token).ok());

        let token = if let Some(token) = existing {
            token
        } else {
            let token = Uuid::new_v4();
            self.session
                .insert(UPLOAD_TOKEN_KEY, token.to_string())
                .await
                .or_internal_error()?;
            token
        };
        Ok(UploadKey::new(kind, token))
    }

    /// Store key for an existing upload, without minting a token.
    pub async fn existing_upload_key(&self, kind: UploadKind) -> RouteResult<Option<UploadKey>> {
        Ok(self
            .session
            .get::<String>(UPLOAD_TOKEN_KEY)
            .await
            .or_internal_error()?
            .and_then(|token| Uuid::parse_str(&token).ok())
            .map(|token| UploadKey::new(kind, token)))
    }

    pub async fn set_drive_state(&self, state: &str) -> RouteResult<()> {
        self.session.insert(DRIVE_STATE_KEY, state).await.or_internal_error()
    }

    /// Remove and return the pending OAuth state.
    pub async fn take_drive_state(&self) -> RouteResult<Option<String>> {
        self.session.remove::<String>(DRIVE_STATE_KEY).await.or_internal_error()
    }

    pub async fn drive_credentials(&self) -> RouteResult<Option<DriveCredentials>> {
        self.session
            .get::<DriveCredentials>(DRIVE_CREDENTIALS_KEY)
            .await
            .or_internal_error()
    }

    pub async fn set_drive_credentials(&self, credentials: &DriveCredentials) -> RouteResult<()> {
        self.session
            .insert(DRIVE_CREDENTIALS_KEY, credentials)
            .await
            .or_internal_error()
    }

    /// Forget the Drive connection and any pending OAuth state.
    pub async fn clear_drive(&self) -> RouteResult<()> {
        self.session
            .remove::<DriveCredentials>(DRIVE_CREDENTIALS_KEY)
            .await
            .or_internal_error()?;
        self.session.remove::<String>(DRIVE_STATE_KEY).await.or_internal_error()?;
        Ok(())
    }
}

//! Google Drive routes - OAuth connection, folders and uploads.
//!
//! Credentials live in the cookie session. Calls that refresh the access
//! token write the new credentials back before responding.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::Redirect,
};
use axum_extra::extract::Multipart;
use pdf_toolbox_core::{DriveCredentials, DriveFolder, DriveUpload, Error};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};
use uuid::Uuid;

use crate::helpers::{JsonError, JsonResult, MultipartForm, RouteResult, status_for};
use crate::state::{AppState, SessionData};

const SETTINGS_PATH: &str = "/drive/settings";

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    #[serde(default)]
    pub folder_name: String,
}

#[derive(Debug, Serialize)]
pub struct FoldersResponse {
    pub success: bool,
    pub folders: Vec<DriveFolder>,
}

#[derive(Debug, Serialize)]
pub struct CreatedFolderResponse {
    pub success: bool,
    pub folder_id: String,
    pub folder_name: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub file_id: String,
    pub name: String,
    pub link: Option<String>,
}

/// Redirect to the Google consent screen.
pub async fn auth(State(state): State<Arc<AppState>>, session: Session) -> RouteResult<Redirect> {
    if !state.drive.is_configured() {
        return Err((StatusCode::BAD_REQUEST, format!("{}\n", Error::DriveNotConfigured)));
    }

    let oauth_state = Uuid::new_v4().simple().to_string();
    let url = state.drive.authorization_url(&oauth_state).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error initializing Google Drive auth: {e}\n"),
        )
    })?;
    SessionData::new(&session).set_drive_state(&oauth_state).await?;

    Ok(Redirect::to(&url))
}

/// Finish the OAuth flow and keep the tokens in the session.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> RouteResult<Redirect> {
    let data = SessionData::new(&session);
    let expected = data.take_drive_state().await?;

    if let Some(error) = query.error {
        warn!("Google Drive authorization declined: {}", error);
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Error completing Google Drive auth: {error}\n"),
        ));
    }
    if expected.is_none() || expected != query.state {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Error completing Google Drive auth: {}\n", Error::DriveStateMismatch),
        ));
    }
    let code = query.code.filter(|c| !c.is_empty()).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Error completing Google Drive auth: missing authorization code\n".to_string(),
        )
    })?;

    let credentials = state.drive.exchange_code(&code).await.map_err(|e| {
        (
            status_for(&e),
            format!("Error completing Google Drive auth: {e}\n"),
        )
    })?;
    data.set_drive_credentials(&credentials).await?;
    info!("Connected Google Drive");

    Ok(Redirect::to(SETTINGS_PATH))
}

pub async fn folders(State(state): State<Arc<AppState>>, session: Session) -> JsonResult<FoldersResponse> {
    let data = SessionData::new(&session);
    let mut credentials = require_credentials(&data, "Not authorized").await?;

    let result = state.drive.list_folders(&mut credentials).await;
    persist(&data, &credentials).await?;
    let folders = result.map_err(|e| drive_error("Failed to list folders", &e))?;

    Ok(Json(FoldersResponse { success: true, folders }))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(request): Json<CreateFolderRequest>,
) -> JsonResult<CreatedFolderResponse> {
    let data = SessionData::new(&session);
    let mut credentials = require_credentials(&data, "Not authorized").await?;

    let name = request.folder_name.trim();
    if name.is_empty() {
        return Err(JsonError::new(StatusCode::BAD_REQUEST, "Folder name is required"));
    }

    let result = state.drive.create_folder(&mut credentials, name).await;
    persist(&data, &credentials).await?;
    let folder = result.map_err(|e| drive_error("Failed to create folder", &e))?;

    Ok(Json(CreatedFolderResponse {
        success: true,
        folder_id: folder.id,
        folder_name: folder.name,
    }))
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> JsonResult<UploadResponse> {
    let data = SessionData::new(&session);
    let mut credentials =
        require_credentials(&data, "Not authorized. Please connect to Google Drive first.").await?;

    let form = MultipartForm::read(multipart).await?;
    let file = form
        .file("file")
        .ok_or_else(|| JsonError::new(StatusCode::BAD_REQUEST, "No file provided"))?;

    let name = form
        .text("filename")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or(Some(file.filename.as_str()).filter(|n| !n.is_empty()))
        .unwrap_or("document.pdf")
        .to_string();
    let folder_id = form
        .text("folder_id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let upload = DriveUpload {
        name,
        folder_id,
        mime_type: "application/pdf".to_string(),
        data: file.data.to_vec(),
    };
    let result = state.drive.upload(&mut credentials, upload).await;
    persist(&data, &credentials).await?;
    let uploaded = result.map_err(|e| drive_error("Upload failed", &e))?;
    info!("Uploaded {} to Google Drive", uploaded.name);

    Ok(Json(UploadResponse {
        success: true,
        file_id: uploaded.id,
        name: uploaded.name,
        link: uploaded.link,
    }))
}

pub async fn disconnect(session: Session) -> RouteResult<Redirect> {
    SessionData::new(&session).clear_drive().await?;
    info!("Disconnected Google Drive");
    Ok(Redirect::to(SETTINGS_PATH))
}

async fn require_credentials(data: &SessionData<'_>, message: &str) -> Result<DriveCredentials, JsonError> {
    data.drive_credentials()
        .await?
        .ok_or_else(|| JsonError::new(StatusCode::UNAUTHORIZED, message))
}

async fn persist(data: &SessionData<'_>, credentials: &DriveCredentials) -> Result<(), JsonError> {
    data.set_drive_credentials(credentials).await.map_err(JsonError::from)
}

fn drive_error(context: &str, error: &Error) -> JsonError {
    JsonError::new(status_for(error), format!("{context}: {error}"))
}

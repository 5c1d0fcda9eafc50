//! Edit routes - stored uploads, signatures and text overlays.
//!
//! Signing is a two-step flow: the PDF (and optionally a signature image)
//! is stored first, then `add-signature` draws onto the stored copy.

use axum::{Json, extract::State, http::StatusCode, response::Response};
use axum_extra::extract::Multipart;
use pdf_toolbox_core::pdf::overlay::{add_signature as overlay_signature, add_text as overlay_text, decode_signature_data};
use pdf_toolbox_core::{ANNOTATED_FILENAME, ImageElement, Position, SIGNED_FILENAME, SignatureDate, UploadKind};
use serde::Serialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;

use crate::helpers::{
    CoreResultExt, JsonError, JsonResult, MultipartForm, OptionExt, RouteResult, pdf_attachment, run_blocking,
};
use crate::state::{AppState, SessionData};

/// Response body for the store endpoints.
#[derive(Debug, Serialize)]
pub struct StoredUpload {
    pub success: bool,
    pub size: usize,
    pub key: String,
}

pub async fn store_pdf(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> JsonResult<StoredUpload> {
    store_upload(&state, &session, multipart, UploadKind::Pdf, "No PDF file uploaded").await
}

pub async fn store_signature(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> JsonResult<StoredUpload> {
    store_upload(&state, &session, multipart, UploadKind::Signature, "No signature file uploaded").await
}

async fn store_upload(
    state: &AppState,
    session: &Session,
    multipart: Multipart,
    kind: UploadKind,
    missing: &str,
) -> JsonResult<StoredUpload> {
    let form = MultipartForm::read(multipart).await?;
    let file = form
        .file("file")
        .ok_or_else(|| JsonError::new(StatusCode::BAD_REQUEST, missing))?;

    let key = SessionData::new(session).upload_key(kind).await?;
    let size = file.data.len();
    state.store.put(key, file.data.clone()).await;
    info!("Stored {} ({} bytes)", key, size);

    Ok(Json(StoredUpload {
        success: true,
        size,
        key: key.token.to_string(),
    }))
}

/// Draw the drawn or uploaded signature onto the stored PDF.
///
/// The date line is always printed: `signature_date` when given, else today.
pub async fn add_signature(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> RouteResult<Response> {
    let form = MultipartForm::read(multipart).await?;
    let data = SessionData::new(&session);

    let pdf_key = data
        .existing_upload_key(UploadKind::Pdf)
        .await?
        .or_bad_request("No PDF stored in session. Please upload PDF first.\n")?;
    let pdf = state
        .store
        .get(pdf_key)
        .await
        .or_bad_request("No PDF stored in session. Please upload PDF first.\n")?;

    let image = if form.text("signature_source") == Some("upload") {
        let sig_key = data
            .existing_upload_key(UploadKind::Signature)
            .await?
            .or_bad_request("No stored signature found. Please upload a signature image.\n")?;
        state
            .store
            .get(sig_key)
            .await
            .or_bad_request("No stored signature found. Please upload a signature image.\n")?
            .to_vec()
    } else {
        let encoded = form
            .text("signature_data")
            .filter(|s| !s.trim().is_empty())
            .or_bad_request("No signature data provided.\n")?;
        decode_signature_data(encoded).or_status("Error adding signature")?
    };

    let page = form.parse_or("page_num", 1_usize)?;
    let position = Position {
        x: form.parse_or("x", 50.0)?,
        y: form.parse_or("y", 50.0)?,
    };
    let date = SignatureDate::parse(form.text("signature_date").unwrap_or_default()).or_status("Error adding signature")?;
    let signature = ImageElement {
        data: image,
        width: form.parse_or("width", 100.0)?,
        height: form.parse_or("height", 50.0)?,
        date: Some(date),
    };

    let signed = run_blocking(move || overlay_signature("stored.pdf", &pdf, page, position, signature))
        .await?
        .or_status("Error adding signature")?;

    info!("Signed page {} of {}", page, pdf_key);
    pdf_attachment(signed, SIGNED_FILENAME)
}

/// Draw text onto one page of the uploaded PDF.
pub async fn add_text(multipart: Multipart) -> RouteResult<Response> {
    let form = MultipartForm::read(multipart).await?;
    let file = form.file("file").or_bad_request("No PDF file uploaded\n")?;

    let text = form
        .text("text")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_bad_request("No text provided\n")?
        .to_string();

    let page = form.parse_or("page_num", 1_usize)?;
    let position = Position {
        x: form.parse_or("x", 50.0)?,
        y: form.parse_or("y", 50.0)?,
    };
    let font_size = form.parse_or("font_size", 12.0)?;
    let name = file.filename.clone();
    let pdf = file.data.clone();

    let annotated = run_blocking(move || overlay_text(&name, &pdf, page, position, &text, font_size))
        .await?
        .or_status("Error adding text")?;

    pdf_attachment(annotated, ANNOTATED_FILENAME)
}

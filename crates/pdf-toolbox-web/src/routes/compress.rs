//! Compress route - shrink an uploaded PDF with the chosen algorithm.

use axum::{extract::State, http::StatusCode, response::Response};
use axum_extra::extract::Multipart;
use pdf_toolbox_core::{COMPRESSED_FILENAME, CompressOptions, CompressionMode, compress_document, output_filename};
use std::sync::Arc;
use tracing::info;

use crate::helpers::{CoreResultExt, MultipartForm, OptionExt, RouteResult, pdf_attachment, run_blocking};
use crate::state::AppState;

pub async fn compress(State(state): State<Arc<AppState>>, multipart: Multipart) -> RouteResult<Response> {
    let form = MultipartForm::read(multipart).await?;
    let file = form.file("file").or_bad_request("No file uploaded\n")?;

    let mode: CompressionMode = form
        .text("algorithm")
        .unwrap_or(CompressionMode::Lossless.as_str())
        .parse()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("{e}\n")))?;

    let mut options = CompressOptions::from_config(mode, &state.config.compress);
    options.remove_metadata = form.is_checked("remove_metadata");
    options.linearize = form.is_checked("linearize");
    options.max_dimension_px = form.parse_or("max_px", options.max_dimension_px)?;
    options.jpeg_quality = form.parse_or("jpeg_quality", options.jpeg_quality)?;
    if options.max_dimension_px == 0 || !(1..=100).contains(&options.jpeg_quality) {
        return Err((
            StatusCode::BAD_REQUEST,
            "max_px must be positive and jpeg_quality between 1 and 100\n".to_string(),
        ));
    }

    let filename = output_filename(form.text("output_filename"), COMPRESSED_FILENAME);
    let name = file.filename.clone();
    let data = file.data.clone();

    let result = run_blocking(move || compress_document(&name, &data, &options))
        .await?
        .or_status("Error compressing file")?;

    info!(
        "Compressed {} with {}: {} -> {} bytes",
        file.filename, mode, result.report.input_bytes, result.report.output_bytes
    );
    pdf_attachment(result.bytes, &filename)
}

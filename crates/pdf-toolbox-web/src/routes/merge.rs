//! Merge route - combine uploaded PDFs into one download.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::Multipart;
use pdf_toolbox_core::{MERGED_FILENAME, MergeOptions, merge_documents, output_filename};
use tracing::info;

use crate::helpers::{CoreResultExt, MultipartForm, RouteResult, pdf_attachment, run_blocking};

/// Merge the uploaded `files` in submission order.
///
/// With no files the browser is sent back to the form. `page_size` is the
/// global policy (blank means none); `file_resize` carries one directive per file.
pub async fn merge(multipart: Multipart) -> RouteResult<Response> {
    let form = MultipartForm::read(multipart).await?;

    let documents: Vec<(String, Vec<u8>)> = form
        .files("files")
        .into_iter()
        .map(|f| {
            let name = if f.filename.is_empty() { "upload.pdf" } else { f.filename.as_str() };
            (name.to_string(), f.data.to_vec())
        })
        .collect();
    if documents.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let page_size = form.text("page_size").map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let file_resize = form.texts("file_resize");
    let options = MergeOptions {
        page_size,
        file_resize: (!file_resize.is_empty()).then_some(file_resize),
    };
    let filename = output_filename(form.text("output_filename"), MERGED_FILENAME);

    info!("Merging {} uploaded files", documents.len());
    let merged = run_blocking(move || merge_documents(&documents, &options))
        .await?
        .or_status("Error merging files")?;

    pdf_attachment(merged.bytes, &filename)
}

//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, reducing boilerplate in routes.

use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use pdf_toolbox_core::Error;
use std::str::FromStr;
use tracing::error;

/// Standard result type for route handlers returning HTML or files.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Result type for JSON endpoints; errors render as `{"error": "..."}`.
pub type JsonResult<T> = Result<Json<T>, JsonError>;

/// A JSON error body with its status code.
#[derive(Debug)]
pub struct JsonError {
    pub status: StatusCode,
    pub message: String,
}

impl JsonError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<(StatusCode, String)> for JsonError {
    fn from((status, message): (StatusCode, String)) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

/// Status code for a core error.
///
/// Caller mistakes map to 400, rejected Drive credentials to 401.
pub const fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::DriveUnauthorized => StatusCode::UNAUTHORIZED,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 400 Bad Request error.
    fn or_bad_request(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_bad_request(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::BAD_REQUEST, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
///
/// Provides convenient methods for converting errors into
/// appropriate HTTP status codes.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }
}

/// Extension trait mapping core errors through [`status_for`].
pub trait CoreResultExt<T> {
    /// Prefix the error message with `context` and pick the status from the error kind.
    fn or_status(self, context: &str) -> RouteResult<T>;
}

impl<T> CoreResultExt<T> for pdf_toolbox_core::Result<T> {
    fn or_status(self, context: &str) -> RouteResult<T> {
        self.map_err(|e| {
            let status = status_for(&e);
            if status.is_server_error() {
                error!("{}: {}", context, e);
            }
            (status, format!("{context}: {e}\n"))
        })
    }
}

/// Run synchronous PDF work off the async runtime.
pub async fn run_blocking<T, F>(task: F) -> RouteResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        error!("PDF task panicked: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "PDF processing failed".to_string())
    })
}

/// Build a PDF download response.
pub fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> RouteResult<Response> {
    let safe_name: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{safe_name}\""),
        )
        .body(Body::from(bytes))
        .or_internal_error()
}

/// An uploaded file part.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub filename: String,
    pub data: Bytes,
}

/// A fully buffered multipart form.
///
/// Field names ending in `[]` are stored without the suffix so that
/// `files` and `files[]` read the same.
#[derive(Debug, Default)]
pub struct MultipartForm {
    files: Vec<(String, FilePart)>,
    fields: Vec<(String, String)>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> RouteResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.or_bad_request()? {
            let name = field.name().unwrap_or_default().trim_end_matches("[]").to_string();

            if let Some(filename) = field.file_name().map(str::to_string) {
                let data = field.bytes().await.or_bad_request()?;
                // Browsers send an empty part for an untouched file input
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push((name, FilePart { filename, data }));
            } else {
                let value = field.text().await.or_bad_request()?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    /// First file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    /// Every file uploaded under `name`, in submission order.
    pub fn files(&self, name: &str) -> Vec<&FilePart> {
        self.files.iter().filter(|(n, _)| n == name).map(|(_, f)| f).collect()
    }

    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// Every value of a repeated text field, in submission order.
    pub fn texts(&self, name: &str) -> Vec<String> {
        self.fields.iter().filter(|(n, _)| n == name).map(|(_, v)| v.clone()).collect()
    }

    /// Checkbox state; browsers submit `on` for a ticked box.
    pub fn is_checked(&self, name: &str) -> bool {
        self.text(name) == Some("on")
    }

    /// Parse a field, using `default` when it is missing or blank.
    pub fn parse_or<T: FromStr>(&self, name: &str, default: T) -> RouteResult<T> {
        match self.text(name).map(str::trim) {
            None | Some("") => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| (StatusCode::BAD_REQUEST, format!("Invalid value for {name}: {value}\n"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_error_kinds() {
        assert_eq!(status_for(&Error::NoInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::EncryptedDocument), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::DriveUnauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&Error::PdfSave("disk full".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_parse_or_defaults_and_rejects() {
        let form = MultipartForm {
            files: Vec::new(),
            fields: vec![
                ("x".to_string(), "72.5".to_string()),
                ("y".to_string(), " ".to_string()),
                ("page_num".to_string(), "two".to_string()),
            ],
        };
        assert!((form.parse_or("x", 50.0_f32).unwrap_or_default() - 72.5).abs() < f32::EPSILON);
        assert!((form.parse_or("y", 50.0_f32).unwrap_or_default() - 50.0).abs() < f32::EPSILON);
        assert_eq!(form.parse_or("width", 100_u32).ok(), Some(100));
        assert!(form.parse_or("page_num", 1_usize).is_err());
    }

    #[test]
    fn test_pdf_attachment_sanitizes_name() {
        let response = pdf_attachment(b"%PDF".to_vec(), "report \"final\".pdf").ok();
        let disposition = response
            .as_ref()
            .and_then(|r| r.headers().get(header::CONTENT_DISPOSITION))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert_eq!(disposition.as_deref(), Some("attachment; filename=\"report final.pdf\""));
    }
}

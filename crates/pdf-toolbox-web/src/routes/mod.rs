//! HTTP route handlers for the PDF toolbox web application.
//!
//! Page routes render Askama templates; form posts return PDF downloads;
//! the store and Drive endpoints answer with JSON.

mod compress;
mod drive;
mod edit;
mod merge;
mod pages;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_sessions::{MemoryStore, SessionManagerLayer, cookie::SameSite};

use crate::state::AppState;

/// Build the application router with its session and body-limit layers.
///
/// `secure_cookies` marks the session cookie `Secure`; leave it off when
/// serving plain HTTP. The cookie is `SameSite=Lax` so that it survives the
/// redirect back from the Google consent screen.
pub fn router(state: Arc<AppState>, secure_cookies: bool) -> Router {
    let body_limit = state.config.upload.max_body_mb.saturating_mul(1024 * 1024);
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure_cookies)
        .with_same_site(SameSite::Lax);

    Router::new()
        // Pages
        .route("/", get(pages::index))
        .route("/compress", get(pages::compress_page).post(compress::compress))
        .route("/edit", get(pages::edit_page))
        .route("/drive/settings", get(pages::drive_settings))
        .route("/healthz", get(pages::healthz))
        // Form posts returning PDFs
        .route("/merge", post(merge::merge))
        .route("/edit/add-signature", post(edit::add_signature))
        .route("/edit/add-text", post(edit::add_text))
        // JSON endpoints
        .route("/edit/store-pdf", post(edit::store_pdf))
        .route("/edit/store-signature", post(edit::store_signature))
        // Google Drive
        .route("/drive/auth", get(drive::auth))
        .route("/drive/callback", get(drive::callback))
        .route("/drive/folders", get(drive::folders))
        .route("/drive/create-folder", post(drive::create_folder))
        .route("/drive/upload", post(drive::upload))
        .route("/drive/disconnect", post(drive::disconnect))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(sessions)
        .with_state(state)
}

//! Page routes - full HTML page renders.

use axum::extract::State;
use std::sync::Arc;
use tower_sessions::Session;

use crate::helpers::RouteResult;
use crate::state::{AppState, SessionData};
use crate::templates::{CompressTemplate, DriveSettingsTemplate, EditTemplate, IndexTemplate};

/// Landing page with the merge form.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate {
        default_page_size: state.config.merge.default_page_size.clone(),
    }
}

pub async fn compress_page(State(state): State<Arc<AppState>>) -> CompressTemplate {
    CompressTemplate::new(state.config.compress.max_dimension_px, state.config.compress.jpeg_quality)
}

pub async fn edit_page(session: Session) -> RouteResult<EditTemplate> {
    let drive_connected = SessionData::new(&session).drive_credentials().await?.is_some();
    Ok(EditTemplate { drive_connected })
}

pub async fn drive_settings(State(state): State<Arc<AppState>>, session: Session) -> RouteResult<DriveSettingsTemplate> {
    let connected = SessionData::new(&session).drive_credentials().await?.is_some();
    Ok(DriveSettingsTemplate {
        configured: state.drive.is_configured(),
        connected,
    })
}

/// Liveness check.
pub async fn healthz() -> &'static str {
    "ok"
}

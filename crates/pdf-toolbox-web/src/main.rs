//! PDF Toolbox Web - Web server for merging, compressing and signing PDFs.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, header};
use clap::Parser;
use pdf_toolbox_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./static if it exists
/// 3. Crate's built-in static directory
fn resolve_static_dir(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return PathBuf::from(path);
    }

    let local_static = PathBuf::from("static");
    if local_static.is_dir() {
        return local_static;
    }

    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Parser, Debug)]
#[command(name = "pdf-toolbox-web")]
#[command(author, version, about = "PDF Toolbox Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Google OAuth client id (enables Drive upload)
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    google_client_id: Option<String>,

    /// Google OAuth client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    google_client_secret: Option<String>,

    /// OAuth redirect URI registered with Google
    #[arg(long, env = "GOOGLE_REDIRECT_URI")]
    google_redirect_uri: Option<String>,

    /// Mark the session cookie Secure (enable behind HTTPS)
    #[arg(long, env = "SESSION_SECURE")]
    session_secure: bool,

    /// Request body limit in MB
    #[arg(long, env = "MAX_UPLOAD_MB")]
    max_upload_mb: Option<usize>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,
}

impl Args {
    /// Apply command-line and environment overrides on top of the config file.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(id) = &self.google_client_id {
            config.drive.client_id.clone_from(id);
        }
        if let Some(secret) = &self.google_client_secret {
            config.drive.client_secret.clone_from(secret);
        }
        if let Some(uri) = &self.google_redirect_uri {
            config.drive.redirect_uri.clone_from(uri);
        }
        if let Some(mb) = self.max_upload_mb {
            config.upload.max_body_mb = mb;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(path) = &args.config {
        AppConfig::from_file(path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);
    info!(
        "Upload limit {} MB, Google Drive {}",
        state.config.upload.max_body_mb,
        if state.drive.is_configured() { "enabled" } else { "disabled" }
    );

    let app = routes::router(state, args.session_secure)
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(resolve_static_dir(args.static_dir.as_deref()))),
        )
        // Generated PDFs must not be cached
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

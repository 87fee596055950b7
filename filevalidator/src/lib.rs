//! Declarative validation of uploaded files.
//!
//! A [`FileValidator`] maps form field names to a [`Field`] policy (required,
//! single file) and an ordered list of [`Rule`]s. Validation runs every rule
//! on every uploaded file and collects all failures per field as
//! [`FileError`] values that can be rendered or re-translated later.
//!
//! ```no_run
//! use filevalidator::{Field, FileSize, FileValidator, MemoryFile, MimeTypes, MinPixelSize};
//! use std::collections::HashMap;
//!
//! let mut fields = HashMap::new();
//! fields.insert(
//!     "avatar".to_string(),
//!     Field::new(true, true)
//!         .rule(FileSize::new(100, 100_000))
//!         .rule(MimeTypes::new(["image/png", "image/jpeg"]))
//!         .rule(MinPixelSize::new(100, 100)),
//! );
//! let validator = FileValidator::new(Some(fields)).unwrap();
//!
//! let mut uploads = HashMap::new();
//! uploads.insert("avatar".to_string(), vec![MemoryFile::new("me.png", std::fs::read("me.png").unwrap())]);
//!
//! let report = validator.validate(Some(&uploads));
//! for error in report.field_errors("avatar") {
//!     println!("{}", error);
//! }
//! ```

pub mod config;
pub mod error;
pub mod files;
pub mod handlers;
pub mod middleware;
pub mod models;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use files::{
    DiskFile, ErrorArg, ErrorKind, ErrorTemplates, Field, FileError, FileHandle, FileSize,
    FileValidator, MaxPixelSize, MemoryFile, MimeTypes, MinPixelSize, Rule, RuleOutcome,
    ValidationReport, ValidatorError,
};
pub use handlers::routes::create_routes;

use axum::{extract::DefaultBodyLimit, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub validator: Arc<FileValidator>,
}

impl AppState {
    pub fn new(validator: FileValidator) -> Self {
        Self {
            app_name: "File Validation Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            validator: Arc::new(validator),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    create_app_with_config(state, &AppConfig::default())
}

pub fn create_app_with_config(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        .merge(create_routes())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )))
        .layer(middleware::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    error::{AppError, Result},
    files::MemoryFile,
    AppState,
};

/// Buffers every file part of a multipart body, grouped by part name.
/// Parts without a file name (plain form values, or a file input left
/// empty) are skipped.
pub async fn collect_uploads(
    multipart: &mut Multipart,
) -> Result<HashMap<String, Vec<MemoryFile>>> {
    let mut uploads: HashMap<String, Vec<MemoryFile>> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let filename = match field.file_name() {
            Some(filename) if !filename.is_empty() => filename.to_string(),
            _ => {
                debug!(field = %name, "skipping multipart part without a file");
                continue;
            }
        };

        // The declared type is only logged, rules sniff the bytes.
        let declared = field.content_type().map(str::to_string);
        let data = field.bytes().await?;

        debug!(
            field = %name,
            file = %filename,
            size = data.len(),
            declared = ?declared,
            "buffered upload"
        );

        uploads
            .entry(name)
            .or_default()
            .push(MemoryFile::new(filename, data.to_vec()));
    }

    Ok(uploads)
}

pub async fn validate_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let uploads = collect_uploads(&mut multipart).await?;
    info!(
        "POST /api/validate - {} file(s) in {} field(s)",
        uploads.values().map(Vec::len).sum::<usize>(),
        uploads.len()
    );

    // rules do blocking reads and image decoding
    let validator = Arc::clone(&state.validator);
    let report = tokio::task::spawn_blocking(move || validator.validate(Some(&uploads)))
        .await
        .map_err(|e| AppError::Other(anyhow::anyhow!("Validation task failed: {}", e)))?;

    let status = if report.valid {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };

    Ok((status, Json(report)).into_response())
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use bytes::Bytes;
use std::path::{Component, PathBuf};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;

/// Naive file upload: the whole body lands at `storage/<path>`.
pub async fn upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let relative = sanitize(&path)?;
    let dest = state.storage.join(relative);
    tokio::fs::write(&dest, &body).await?;
    debug!(path = %dest.display(), bytes = body.len(), "File stored");
    Ok(StatusCode::CREATED)
}

/// Keep uploads inside the storage root: only plain path components, no
/// `..`, no absolute paths.
fn sanitize(path: &str) -> Result<PathBuf, ApiError> {
    let mut clean = PathBuf::new();
    for component in std::path::Path::new(path).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(ApiError::Forbidden(format!("invalid upload path: {path}"))),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ApiError::Forbidden(format!("invalid upload path: {path}")));
    }
    Ok(clean)
}

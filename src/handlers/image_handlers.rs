//! Image download handler. Streams files to avoid buffering them in memory.

use crate::{errors::AppError, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
};
use std::io;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;

/// `GET /images/{filename}` — serve a stored image, or the default image when
/// the requested one does not exist.
pub async fn get_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let path = state
        .catalog
        .resolve_image(&state.request_token(), &filename, &state.default_image)
        .await?;

    let file = File::open(&path).await.map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::not_found(format!("image `{}` not found", filename))
        } else {
            tracing::error!("failed to open image {}: {}", path.display(), err);
            AppError::internal("internal storage error")
        }
    })?;
    let len = file.metadata().await.ok().map(|meta| meta.len());

    info!("returned image {}", path.display());

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    if let Some(len) = len {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    }
    Ok(response)
}

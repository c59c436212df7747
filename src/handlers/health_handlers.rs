//! Health & readiness handlers.
//!
//! - GET /         -> greeting
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the item store and image disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::{collections::HashMap, fmt, io, path::Path};
use tokio::fs;
use uuid::Uuid;

/// `GET /`
pub async fn hello() -> impl IntoResponse {
    Json(MessageResponse {
        message: "Hello, world!".into(),
    })
}

/// `GET /healthz`
///
/// Liveness: always 200, no I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// 200 when the item store reads cleanly and the image directory accepts a
/// write/read/remove round trip, 503 otherwise. A missing item store counts
/// as ready.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let items = CheckStatus::from_result(
        state
            .catalog
            .list_items(&state.request_token())
            .await
            .map(drop),
    );
    let disk = check_disk(&state.image_dir).await;

    let ready = items.ok && disk.ok;
    let body = ReadyResponse {
        status: if ready { "ok" } else { "error" }.into(),
        checks: HashMap::from([("items", items), ("disk", disk)]),
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Write, read back and remove a marker file inside `dir`.
async fn check_disk(dir: &Path) -> CheckStatus {
    let marker = dir.join(format!(".readyz-{}", Uuid::new_v4()));
    let result = disk_round_trip(&marker).await;
    if result.is_err() {
        // Best effort; the marker may never have been created.
        let _ = fs::remove_file(&marker).await;
    }
    CheckStatus::from_result(result)
}

async fn disk_round_trip(marker: &Path) -> io::Result<()> {
    fs::write(marker, MARKER).await?;
    if fs::read(marker).await? != MARKER {
        return Err(io::Error::other("marker content mismatch"));
    }
    fs::remove_file(marker).await
}

const MARKER: &[u8] = b"readyz";

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

impl CheckStatus {
    fn from_result<E: fmt::Display>(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self {
                ok: true,
                error: None,
            },
            Err(err) => Self {
                ok: false,
                error: Some(err.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn disk_check_passes_and_leaves_no_marker() {
        let dir = TempDir::new().unwrap();

        let status = check_disk(dir.path()).await;

        assert!(status.ok, "{:?}", status.error);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn disk_check_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();

        let status = check_disk(&dir.path().join("gone")).await;

        assert!(!status.ok);
        assert!(status.error.is_some());
    }
}

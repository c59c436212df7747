//! Shared state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        catalog_service::CatalogService, image_store::FsImageStore,
        item_repository::JsonFileItemRepository,
    },
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,

    /// Root of the image store, used by the readiness check.
    pub image_dir: PathBuf,

    /// Asset served in place of a missing image.
    pub default_image: PathBuf,

    /// Cancelled when the server begins shutting down. Each request works
    /// against a child of this token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the filesystem-backed stores described by `cfg`.
    pub fn from_config(cfg: &AppConfig, shutdown: CancellationToken) -> Self {
        let catalog = CatalogService::new(
            Arc::new(JsonFileItemRepository::new(&cfg.items_file)),
            Arc::new(FsImageStore::new(&cfg.image_dir)),
        );
        Self {
            catalog,
            image_dir: cfg.image_dir.clone(),
            default_image: cfg.default_image.clone(),
            shutdown,
        }
    }

    /// Token scoped to a single request.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

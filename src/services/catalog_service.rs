//! CatalogService — composes the image store and item repository.
//!
//! Every operation takes a cancellation token which is checked before work
//! starts and between sub-steps. A filesystem call that has already begun is
//! never interrupted.

use crate::{
    models::item::{Item, ItemCollection},
    services::{
        image_store::{ImageStore, ImageStoreError},
        item_repository::{ItemRepository, RepositoryError},
    },
};
use bytes::Bytes;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("item {0} not found")]
    ItemNotFound(i64),
    #[error("image `{0}` not found")]
    ImageNotFound(String),
    #[error("invalid image path `{name}`: {reason}")]
    InvalidImagePath { name: String, reason: &'static str },
    #[error("operation cancelled")]
    Cancelled,
    #[error("item store is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<ImageStoreError> for CatalogError {
    fn from(err: ImageStoreError) -> Self {
        match err {
            ImageStoreError::EmptyImage => CatalogError::Validation("image is empty".into()),
            ImageStoreError::InvalidPath { name, reason } => {
                CatalogError::InvalidImagePath { name, reason }
            }
            ImageStoreError::NotFound(name) => CatalogError::ImageNotFound(name),
            ImageStoreError::Io(err) => CatalogError::Io(err),
        }
    }
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { position, .. } => CatalogError::ItemNotFound(position),
            RepositoryError::Corrupt(err) => CatalogError::Corrupt(err),
            RepositoryError::Io(err) => CatalogError::Io(err),
        }
    }
}

fn ensure_active(cancel: &CancellationToken) -> CatalogResult<()> {
    if cancel.is_cancelled() {
        Err(CatalogError::Cancelled)
    } else {
        Ok(())
    }
}

/// Catalogue use cases over swappable storage backends.
#[derive(Clone)]
pub struct CatalogService {
    items: Arc<dyn ItemRepository>,
    images: Arc<dyn ImageStore>,
}

impl CatalogService {
    pub fn new(items: Arc<dyn ItemRepository>, images: Arc<dyn ImageStore>) -> Self {
        Self { items, images }
    }

    /// Validate, store the image (if any), then append the item record.
    ///
    /// A blob written before a failed insert is left in place; it is content
    /// addressed and will be reused by a later upload of the same bytes.
    #[instrument(skip(self, cancel, image))]
    pub async fn create_item(
        &self,
        cancel: &CancellationToken,
        name: &str,
        category: &str,
        image: Option<Bytes>,
    ) -> CatalogResult<Item> {
        ensure_active(cancel)?;
        Item::check_fields(name, category).map_err(CatalogError::Validation)?;

        let image_ref = match image {
            Some(bytes) => self.images.put(bytes).await?,
            None => String::new(),
        };

        ensure_active(cancel)?;
        let item = Item::new(name, category, image_ref);
        self.items.insert(item.clone()).await?;
        Ok(item)
    }

    #[instrument(skip(self, cancel))]
    pub async fn list_items(&self, cancel: &CancellationToken) -> CatalogResult<ItemCollection> {
        ensure_active(cancel)?;
        Ok(self.items.get_all().await?)
    }

    #[instrument(skip(self, cancel))]
    pub async fn get_item(&self, cancel: &CancellationToken, position: i64) -> CatalogResult<Item> {
        ensure_active(cancel)?;
        Ok(self.items.get(position).await?)
    }

    /// Resolve a requested image, falling back to `default_asset` when it is
    /// absent. Unsafe names are still rejected.
    #[instrument(skip(self, cancel))]
    pub async fn resolve_image(
        &self,
        cancel: &CancellationToken,
        requested: &str,
        default_asset: &Path,
    ) -> CatalogResult<PathBuf> {
        ensure_active(cancel)?;
        match self.images.resolve(requested).await {
            Ok(path) => Ok(path),
            Err(ImageStoreError::NotFound(_)) => {
                debug!("image not found, serving {}", default_asset.display());
                Ok(default_asset.to_path_buf())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{image_store::FsImageStore, item_repository::JsonFileItemRepository};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF fake";

    struct Fixture {
        _dir: TempDir,
        image_dir: PathBuf,
        items_file: PathBuf,
        service: CatalogService,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let image_dir = dir.path().join("images");
        let items_file = dir.path().join("items.json");
        std::fs::create_dir_all(&image_dir).unwrap();
        let service = CatalogService::new(
            Arc::new(JsonFileItemRepository::new(&items_file)),
            Arc::new(FsImageStore::new(&image_dir)),
        );
        Fixture {
            _dir: dir,
            image_dir,
            items_file,
            service,
        }
    }

    fn image_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    /// Repository whose writes always fail; reads see an empty store.
    struct ReadOnlyRepository;

    #[async_trait]
    impl ItemRepository for ReadOnlyRepository {
        async fn insert(&self, _item: Item) -> Result<(), RepositoryError> {
            Err(RepositoryError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        async fn get_all(&self) -> Result<ItemCollection, RepositoryError> {
            Ok(ItemCollection::default())
        }
    }

    #[tokio::test]
    async fn create_item_stores_image_and_record() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let item = fx
            .service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap();

        let expected_ref = crate::models::image::ImageBlob::new(Bytes::from_static(JPEG))
            .reference()
            .to_string();
        assert_eq!(item, Item::new("shoes", "fashion", expected_ref.clone()));

        let listed = fx.service.list_items(&cancel).await.unwrap();
        assert_eq!(listed.items, vec![item.clone()]);

        let default = fx.image_dir.join("default.jpg");
        let path = fx
            .service
            .resolve_image(&cancel, &item.image_ref, &default)
            .await
            .unwrap();
        assert_eq!(path, fx.image_dir.join(expected_ref));
    }

    #[tokio::test]
    async fn create_item_without_image_leaves_ref_empty() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let item = fx
            .service
            .create_item(&cancel, "book", "media", None)
            .await
            .unwrap();

        assert_eq!(item.image_ref, "");
        assert_eq!(image_count(&fx.image_dir), 0);
        assert_eq!(fx.service.get_item(&cancel, 0).await.unwrap(), item);
    }

    #[tokio::test]
    async fn create_item_rejects_blank_fields_without_side_effects() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        for (name, category) in [("", "fashion"), ("shoes", ""), ("  ", "fashion")] {
            let err = fx
                .service
                .create_item(&cancel, name, category, Some(Bytes::from_static(JPEG)))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "got {err:?}");
        }

        assert_eq!(image_count(&fx.image_dir), 0);
        assert!(!fx.items_file.exists());
    }

    #[tokio::test]
    async fn create_item_rejects_empty_image() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let err = fx
            .service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(!fx.items_file.exists());
    }

    #[tokio::test]
    async fn duplicate_uploads_share_one_blob() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let a = fx
            .service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap();
        let b = fx
            .service
            .create_item(&cancel, "boots", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap();

        assert_eq!(a.image_ref, b.image_ref);
        assert_eq!(image_count(&fx.image_dir), 1);
        assert_eq!(fx.service.list_items(&cancel).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_item_out_of_range_is_not_found() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let err = fx.service.get_item(&cancel, 3).await.unwrap_err();
        assert!(matches!(err, CatalogError::ItemNotFound(3)));

        let err = fx.service.get_item(&cancel, -1).await.unwrap_err();
        assert!(matches!(err, CatalogError::ItemNotFound(-1)));
    }

    #[tokio::test]
    async fn resolve_image_falls_back_to_default_when_missing() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        let default = fx.image_dir.join("default.jpg");

        let path = fx
            .service
            .resolve_image(&cancel, "missing.jpg", &default)
            .await
            .unwrap();

        assert_eq!(path, default);
    }

    #[tokio::test]
    async fn resolve_image_propagates_invalid_path() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        let default = fx.image_dir.join("default.jpg");

        let err = fx
            .service
            .resolve_image(&cancel, "../items.json", &default)
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::InvalidImagePath { .. }));
    }

    /// Image store that signals shutdown once its write has landed.
    struct CancellingImageStore {
        inner: FsImageStore,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl ImageStore for CancellingImageStore {
        async fn put(&self, bytes: Bytes) -> Result<String, ImageStoreError> {
            let reference = self.inner.put(bytes).await?;
            self.cancel.cancel();
            Ok(reference)
        }

        async fn resolve(&self, requested: &str) -> Result<PathBuf, ImageStoreError> {
            self.inner.resolve(requested).await
        }
    }

    #[tokio::test]
    async fn cancellation_between_put_and_insert_skips_the_record() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        let service = CatalogService::new(
            Arc::new(JsonFileItemRepository::new(&fx.items_file)),
            Arc::new(CancellingImageStore {
                inner: FsImageStore::new(&fx.image_dir),
                cancel: cancel.clone(),
            }),
        );

        let err = service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Cancelled), "got {err:?}");
        assert_eq!(image_count(&fx.image_dir), 1);
        assert!(!fx.items_file.exists());
    }

    #[tokio::test]
    async fn cancelled_token_prevents_any_write() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = fx
            .service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
        assert!(matches!(
            fx.service.list_items(&cancel).await.unwrap_err(),
            CatalogError::Cancelled
        ));

        assert_eq!(image_count(&fx.image_dir), 0);
        assert!(!fx.items_file.exists());
    }

    #[tokio::test]
    async fn failed_insert_keeps_stored_blob() {
        let dir = TempDir::new().unwrap();
        let images = FsImageStore::new(dir.path());
        let service = CatalogService::new(Arc::new(ReadOnlyRepository), Arc::new(images));
        let cancel = CancellationToken::new();

        let err = service
            .create_item(&cancel, "shoes", "fashion", Some(Bytes::from_static(JPEG)))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Io(_)));
        assert_eq!(image_count(dir.path()), 1);
    }
}

//! ItemRepository — ordered, append-only item records in one JSON file.
//!
//! Every insert reads the whole collection, appends in memory and rewrites
//! the file. Concurrent inserts are not serialized here: two racing writers
//! may lose one update (last writer wins on the whole file).

use crate::{
    models::item::{Item, ItemCollection},
    services::atomic_write::write_atomic,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("item {position} not found ({len} items stored)")]
    NotFound { position: i64, len: usize },
    #[error("item store is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence interface for catalogue items.
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Append `item` after every existing record.
    async fn insert(&self, item: Item) -> RepositoryResult<()>;

    /// Return every item in insertion order. A store that was never written
    /// yields an empty collection.
    async fn get_all(&self) -> RepositoryResult<ItemCollection>;

    /// Ordinal lookup by zero-based insertion position.
    ///
    /// Positions are not stable identities; they hold only because records
    /// are never removed.
    async fn get(&self, position: i64) -> RepositoryResult<Item> {
        let items = self.get_all().await?;
        items
            .get(position)
            .cloned()
            .ok_or(RepositoryError::NotFound {
                position,
                len: items.len(),
            })
    }
}

/// On-disk shapes accepted when reading the item file.
///
/// Writers always emit a bare array; older deployments stored the list
/// wrapped as `{"items": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredItems {
    List(Vec<Item>),
    Wrapped { items: Vec<Item> },
}

impl From<StoredItems> for ItemCollection {
    fn from(stored: StoredItems) -> Self {
        match stored {
            StoredItems::List(items) | StoredItems::Wrapped { items } => items.into(),
        }
    }
}

/// Item repository persisted as a JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileItemRepository {
    path: PathBuf,
}

impl JsonFileItemRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ItemRepository for JsonFileItemRepository {
    #[instrument(skip(self, item), fields(item_name = %item.name))]
    async fn insert(&self, item: Item) -> RepositoryResult<()> {
        let mut items = self.get_all().await?;
        items.items.push(item);

        let mut encoded = serde_json::to_vec(&items.items).map_err(io::Error::from)?;
        encoded.push(b'\n');
        write_atomic(self.path.clone(), encoded).await?;

        debug!("item store now holds {} items", items.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> RepositoryResult<ItemCollection> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("item store {} not created yet", self.path.display());
                return Ok(ItemCollection::default());
            }
            Err(err) => return Err(RepositoryError::Io(err)),
        };

        let stored: StoredItems = serde_json::from_slice(&raw).map_err(RepositoryError::Corrupt)?;
        Ok(stored.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, JsonFileItemRepository) {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileItemRepository::new(dir.path().join("items.json"));
        (dir, repo)
    }

    #[tokio::test]
    async fn get_all_on_missing_store_is_empty() {
        let (_dir, repo) = repo();

        let items = repo.get_all().await.unwrap();

        assert!(items.is_empty());
        assert!(!repo.path().exists());
    }

    #[tokio::test]
    async fn insert_appends_in_order() {
        let (_dir, repo) = repo();
        let first = Item::new("shoes", "fashion", "a.jpg");
        let second = Item::new("jacket", "fashion", "");

        repo.insert(first.clone()).await.unwrap();
        repo.insert(second.clone()).await.unwrap();

        let items = repo.get_all().await.unwrap();
        assert_eq!(items.items, vec![first.clone(), second.clone()]);
        assert_eq!(repo.get(0).await.unwrap(), first);
        assert_eq!(repo.get(items.len() as i64 - 1).await.unwrap(), second);
    }

    #[tokio::test]
    async fn get_out_of_range_is_not_found() {
        let (_dir, repo) = repo();
        repo.insert(Item::new("shoes", "fashion", "")).await.unwrap();

        for position in [1, 42, -1, i64::MIN] {
            let err = repo.get(position).await.unwrap_err();
            assert!(
                matches!(err, RepositoryError::NotFound { position: p, len: 1 } if p == position),
                "unexpected {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn get_on_missing_store_is_not_found() {
        let (_dir, repo) = repo();

        let err = repo.get(0).await.unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound { len: 0, .. }));
    }

    #[tokio::test]
    async fn persists_items_as_json_array() {
        let (_dir, repo) = repo();
        repo.insert(Item::new("shoes", "fashion", "abc.jpg"))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(repo.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(
            value,
            serde_json::json!([
                {"name": "shoes", "category": "fashion", "image_name": "abc.jpg"}
            ])
        );
    }

    #[tokio::test]
    async fn reads_wrapped_legacy_layout() {
        let (_dir, repo) = repo();
        std::fs::write(
            repo.path(),
            r#"{"items":[{"name":"jacket","category":"fashion","image_name":"x.jpg"}]}"#,
        )
        .unwrap();

        let items = repo.get_all().await.unwrap();
        assert_eq!(items.items, vec![Item::new("jacket", "fashion", "x.jpg")]);

        repo.insert(Item::new("hat", "fashion", "")).await.unwrap();
        let raw = std::fs::read_to_string(repo.path()).unwrap();
        assert!(raw.trim_start().starts_with('['));
        assert_eq!(repo.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_store_is_distinguished_from_missing() {
        let (_dir, repo) = repo();
        std::fs::write(repo.path(), b"{not json").unwrap();

        let err = repo.get_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));

        let err = repo
            .insert(Item::new("shoes", "fashion", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));
        assert_eq!(std::fs::read(repo.path()).unwrap(), b"{not json");
    }

    #[tokio::test]
    async fn stored_record_with_blank_fields_is_corrupt() {
        let (_dir, repo) = repo();
        std::fs::write(
            repo.path(),
            r#"[{"name":"shoes","category":"fashion"},{"name":"","category":""}]"#,
        )
        .unwrap();

        let err = repo.get_all().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)), "got {err:?}");

        let err = repo.get(0).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreadable_store_is_io_error() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the file cannot be read as bytes.
        let repo = JsonFileItemRepository::new(dir.path());

        let err = repo.get_all().await.unwrap_err();

        assert!(matches!(err, RepositoryError::Io(_)));
    }
}

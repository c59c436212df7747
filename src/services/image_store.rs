//! ImageStore — content-addressed image blobs in a single directory.
//!
//! Uploads are keyed by `sha256(bytes).jpg` and written at most once.
//! Client-supplied names are validated (traversal, extension) before the
//! filesystem is ever consulted, so "unsafe" and "absent" stay distinct.

use crate::{models::image::ImageBlob, services::atomic_write::write_atomic};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Component, Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument};

/// Extensions a requested image name may carry.
const ACCEPTED_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("image payload is empty")]
    EmptyImage,
    #[error("invalid image path `{name}`: {reason}")]
    InvalidPath { name: String, reason: &'static str },
    #[error("image `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ImageStoreResult<T> = Result<T, ImageStoreError>;

/// Storage backend for image payloads.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `bytes` and return their reference key. Idempotent per content.
    async fn put(&self, bytes: Bytes) -> ImageStoreResult<String>;

    /// Map a requested file name to a servable path inside the store.
    async fn resolve(&self, requested: &str) -> ImageStoreResult<PathBuf>;
}

/// Filesystem-backed image store rooted at one directory.
#[derive(Clone, Debug)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensure the resolved file does not escape the root through a symlink.
    async fn ensure_contained(&self, name: &str, path: &Path) -> ImageStoreResult<()> {
        let root = fs::canonicalize(&self.root).await?;
        let target = fs::canonicalize(path).await?;
        if target.starts_with(&root) {
            Ok(())
        } else {
            Err(ImageStoreError::InvalidPath {
                name: name.to_string(),
                reason: "resolves outside the image directory",
            })
        }
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, bytes: Bytes) -> ImageStoreResult<String> {
        if bytes.is_empty() {
            return Err(ImageStoreError::EmptyImage);
        }

        let blob = ImageBlob::new(bytes);
        let path = self.root.join(blob.reference());

        match fs::metadata(&path).await {
            Ok(_) => {
                debug!("image {} already stored", blob.reference());
                return Ok(blob.reference().to_string());
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(ImageStoreError::Io(err)),
        }

        write_atomic(path, blob.bytes().to_vec()).await?;
        debug!("stored image {}", blob.reference());
        Ok(blob.reference().to_string())
    }

    #[instrument(skip(self))]
    async fn resolve(&self, requested: &str) -> ImageStoreResult<PathBuf> {
        let relative = clean_image_name(requested)?;
        let path = self.root.join(&relative);

        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(ImageStoreError::NotFound(requested.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ImageStoreError::NotFound(requested.to_string()));
            }
            Err(err) => return Err(ImageStoreError::Io(err)),
        }

        self.ensure_contained(requested, &path).await?;
        Ok(path)
    }
}

/// Lexically clean a requested image name into a path relative to the root.
///
/// Rejects empty names, control characters and backslashes, absolute paths,
/// any `..` that climbs above the root, bare extensions such as `.jpg`, and
/// names whose cleaned form does not end in an accepted extension.
fn clean_image_name(requested: &str) -> ImageStoreResult<PathBuf> {
    let invalid = |reason| ImageStoreError::InvalidPath {
        name: requested.to_string(),
        reason,
    };

    if requested.is_empty() {
        return Err(invalid("file name is required"));
    }
    if requested
        .bytes()
        .any(|b| b.is_ascii_control() || b == b'\\')
    {
        return Err(invalid("file name contains forbidden characters"));
    }

    let mut cleaned = PathBuf::new();
    let mut depth = 0usize;
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(part) => {
                cleaned.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(invalid("resolves outside the image directory"));
                }
                cleaned.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("absolute paths are not allowed"));
            }
        }
    }

    if depth == 0 {
        return Err(invalid("file name is required"));
    }

    let file_name = cleaned
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if ACCEPTED_EXTENSIONS
        .iter()
        .any(|ext| file_name.strip_prefix('.') == Some(*ext))
    {
        return Err(invalid("file name has no stem"));
    }

    let extension_ok = cleaned
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext));
    if !extension_ok {
        return Err(invalid("image path does not end with .jpg or .jpeg"));
    }

    Ok(cleaned)
}

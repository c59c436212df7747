//! Content-addressed image payloads.

use bytes::Bytes;
use sha2::{Digest, Sha256};

/// Extension appended to every stored image reference.
pub const IMAGE_EXTENSION: &str = "jpg";

/// Raw image bytes together with their content-derived reference key.
///
/// The reference is the lowercase hex SHA-256 of the payload followed by
/// `.jpg`, so identical uploads always map to the same file name.
#[derive(Clone, Debug)]
pub struct ImageBlob {
    bytes: Bytes,
    reference: String,
}

impl ImageBlob {
    pub fn new(bytes: Bytes) -> Self {
        let reference = format!("{:x}.{}", Sha256::digest(&bytes), IMAGE_EXTENSION);
        Self { bytes, reference }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

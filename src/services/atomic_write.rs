//! Whole-file replacement that readers never observe half-written.
//!
//! Bytes go to a `.tmp-<uuid>` sibling, are fsynced, then renamed over the
//! target. The sequence runs on the blocking pool so a dropped request future
//! cannot abandon it between steps.

use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::debug;
use uuid::Uuid;

/// Write `bytes` to `target` atomically on tokio's blocking pool.
pub(crate) async fn write_atomic(target: PathBuf, bytes: Vec<u8>) -> io::Result<()> {
    tokio::task::spawn_blocking(move || write_atomic_blocking(&target, &bytes))
        .await
        .map_err(io::Error::other)?
}

fn write_atomic_blocking(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
    if let Err(err) = write_and_sync(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&tmp_path, target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    debug!("wrote {} bytes to {}", bytes.len(), target.display());
    Ok(())
}

fn write_and_sync(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.sync_all()
}

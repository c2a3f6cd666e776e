//! Postcard-encoded snapshots of the document store.
//!
//! The service itself is stateless between requests; snapshots only let a
//! single-process deployment survive restarts. A snapshot is written to a
//! temporary sibling file and renamed into place.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::store::{DocumentStore, Snapshot};

/// Errors that can occur while reading or writing a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Filesystem access failed.
    #[error("snapshot i/o on {path}: {source}")]
    Io {
        /// File that was being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot bytes could not be encoded or decoded.
    #[error("snapshot codec error: {0}")]
    Codec(#[from] postcard::Error),
}

/// Serializes a snapshot to bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::Codec`] if serialization fails.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>, SnapshotError> {
    Ok(postcard::to_allocvec(snapshot)?)
}

/// Deserializes a snapshot from bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::Codec`] if the bytes are not a valid snapshot.
pub fn decode(bytes: &[u8]) -> Result<Snapshot, SnapshotError> {
    Ok(postcard::from_bytes(bytes)?)
}

/// Reads a snapshot file. A missing file yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the file exists but cannot be read or decoded.
pub async fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => decode(&bytes).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes the current store contents to `path`.
///
/// # Errors
///
/// Returns [`SnapshotError`] if encoding or any filesystem step fails.
pub async fn save(store: &DocumentStore, path: &Path) -> Result<(), SnapshotError> {
    let snapshot = store.snapshot().await;
    let bytes = encode(&snapshot)?;

    let tmp = path.with_extension("tmp");
    let io_err = |source| SnapshotError::Io {
        path: tmp.clone(),
        source,
    };
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        path = %path.display(),
        conversations = snapshot.conversations.len(),
        messages = snapshot.messages.len(),
        bytes = bytes.len(),
        "snapshot written"
    );
    Ok(())
}

/// Spawns a task that saves the store every `interval`.
///
/// Failures are logged and the task keeps running.
pub fn spawn_periodic(
    store: Arc<DocumentStore>,
    path: PathBuf,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = save(&store, &path).await {
                tracing::warn!(path = %path.display(), error = %e, "periodic snapshot failed");
            }
        }
    })
}

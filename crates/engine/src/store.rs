//! Durable checkpoint persistence (PRD-5).
//!
//! One file, one writer. Saves are crash-safe: the checkpoint is written
//! to a temp file in the same directory and renamed over the real path,
//! so a reader observes the previous snapshot or the new one, never a
//! partial write.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use retake_core::checkpoint::{Checkpoint, MAX_CHECKPOINT_SIZE_BYTES};
use retake_core::error::CoreError;

/// Errors from checkpoint persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the checkpoint file failed.
    #[error("Checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file on disk is not a parseable checkpoint.
    #[error("Checkpoint file is corrupt: {0}")]
    Corrupt(String),

    /// The checkpoint violates its structural invariants.
    #[error("Checkpoint rejected: {0}")]
    Invalid(#[from] CoreError),
}

/// Checkpoint file handle bound to one path.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a checkpoint atomically, replacing any previous snapshot.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        checkpoint.validate()?;
        let json = serde_json::to_string_pretty(checkpoint)
            .expect("Checkpoint is always serialisable");

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            successful = checkpoint.successful_scenes,
            completed = checkpoint.current_scene_index,
            total = checkpoint.total_scenes,
            restart_pending = checkpoint.is_restart_pending(),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Load the checkpoint, if one exists.
    ///
    /// `Ok(None)` means a fresh start. Unreadable, oversized, corrupt, or
    /// invariant-violating content is an error: resuming from it would
    /// silently lose or repeat work.
    pub async fn load(&self) -> Result<Option<Checkpoint>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() as u64 > MAX_CHECKPOINT_SIZE_BYTES {
            return Err(StoreError::Corrupt(format!(
                "file is {} bytes, larger than the {} byte limit",
                bytes.len(),
                MAX_CHECKPOINT_SIZE_BYTES
            )));
        }

        let checkpoint: Checkpoint =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        checkpoint.validate()?;
        Ok(Some(checkpoint))
    }

    /// Delete the checkpoint. A missing file is not an error.
    pub async fn clear(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Checkpoint cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

//! Engine error type.

use retake_core::error::CoreError;
use retake_session::{PoolError, SessionError};

use crate::store::StoreError;

/// Errors that abort an orchestrated run.
///
/// Expected producer failures never surface here; the attempt loop folds
/// them into scene outcomes. This type covers the conditions that make
/// the environment itself unusable.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Domain validation failed (selection bounds, checkpoint shape).
    #[error("Validation error: {0}")]
    Core(#[from] CoreError),

    /// A session failed outside the expected-failure channel.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The session pool could not be brought up.
    #[error("Session pool error: {0}")]
    Pool(#[from] PoolError),

    /// Checkpoint persistence failed.
    #[error("Checkpoint store error: {0}")]
    Store(#[from] StoreError),

    /// The replacement process could not be spawned.
    #[error("Relaunch error: {0}")]
    Relaunch(#[from] std::io::Error),
}

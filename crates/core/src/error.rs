//! Error type for the pure domain layer.

/// Errors produced by domain validation and parsing.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed a domain validation rule.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A scene file or scene label could not be parsed.
    #[error("Scene data error: {0}")]
    SceneData(String),

    /// A checkpoint violated its structural invariants.
    #[error("Checkpoint invalid: {0}")]
    Checkpoint(String),
}

//! Orchestration engine for retake scene production.
//!
//! Drives an ordered range of scenes through the session pool:
//!
//! - [`AttemptController`] — bounded retry loop for one scene, with
//!   classification-driven failover and a per-attempt timeout.
//! - [`CheckpointStore`] — crash-safe progress persistence.
//! - [`RestartController`] — scheduled whole-process restarts after every
//!   N successes.
//! - [`Orchestrator`] — range iteration, checkpoint bookkeeping, pacing,
//!   and the final [`RunSummary`].
//!
//! The engine is producer-agnostic: it only sees the
//! [`GenerationSession`](retake_session::GenerationSession) contract.

pub mod attempt;
pub mod error;
pub mod orchestrator;
pub mod restart;
pub mod store;
pub mod summary;

pub use attempt::{AttemptController, SceneResult, SceneVerdict};
pub use error::EngineError;
pub use orchestrator::{EngineConfig, Orchestrator, RunOutcome};
pub use restart::{relaunch_after_cooldown, RestartController};
pub use store::{CheckpointStore, StoreError};
pub use summary::RunSummary;

//! Pure domain logic for the retake batch production engine.
//!
//! Everything in this crate is deterministic and I/O-free: failure
//! classification, retry and failover decisions, checkpoint and range
//! arithmetic, scene parsing, and filename conventions. The async crates
//! (`retake-session`, `retake-engine`) build on these primitives.

pub mod attempt;
pub mod checkpoint;
pub mod classifier;
pub mod error;
pub mod naming;
pub mod retry;
pub mod scene;
pub mod selection;
pub mod types;

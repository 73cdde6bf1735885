//! Generation session capability for the retake engine.
//!
//! This crate owns everything that talks to the external video producer:
//!
//! - [`StudioApi`] — thin REST wrapper over the producer's HTTP API.
//! - [`GenerationSession`] — the three-method contract the engine
//!   consumes (`open` / `submit` / `close`); [`StudioSession`] is the
//!   production implementation.
//! - [`SessionPool`] — the pre-authenticated handle set with O(1)
//!   failover between sessions.
//!
//! The engine never sees HTTP types; expected producer failures surface
//! as classified [`Outcome`](retake_core::attempt::Outcome) values.

pub mod api;
pub mod pool;
pub mod session;

pub use api::{StudioApi, StudioApiError};
pub use pool::{HandleState, PoolError, SessionPool};
pub use session::{GenerationSession, SessionError, StudioSession};

//! Session pool with O(1) failover (PRD-4).
//!
//! The pool owns every configured [`GenerationSession`] and tracks which
//! one is active. All handles open at startup, before the first scene is
//! attempted; a failed backup degrades the pool to single-session
//! operation instead of failing the run. Switching the active session is
//! an index move, never a re-authentication.

use crate::session::{GenerationSession, SessionError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle of one pooled session handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unopened,
    Ready,
    Closed,
}

/// Errors from pool lifecycle management.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool was built with no sessions at all.
    #[error("Session pool has no sessions configured")]
    Empty,

    /// The first (primary) session failed to open; the run cannot start.
    #[error("Failed to open primary session '{session_id}': {source}")]
    PrimaryOpenFailed {
        session_id: String,
        #[source]
        source: SessionError,
    },
}

struct Slot {
    session: Box<dyn GenerationSession>,
    state: HandleState,
}

/// Ordered set of session handles with one active at a time.
///
/// The first session is the primary; its open failure is fatal. Every
/// further session is a backup whose open failure only degrades failover.
pub struct SessionPool {
    slots: Vec<Slot>,
    active: usize,
    switches: u32,
}

// ---------------------------------------------------------------------------
// SessionPool
// ---------------------------------------------------------------------------

impl SessionPool {
    pub fn new(sessions: Vec<Box<dyn GenerationSession>>) -> Self {
        Self {
            slots: sessions
                .into_iter()
                .map(|session| Slot {
                    session,
                    state: HandleState::Unopened,
                })
                .collect(),
            active: 0,
            switches: 0,
        }
    }

    /// Open every session, primary first.
    ///
    /// Returns an error only when the primary fails; a backup that cannot
    /// open is logged and marked closed, leaving the run without failover.
    pub async fn open_all(&mut self) -> Result<(), PoolError> {
        if self.slots.is_empty() {
            return Err(PoolError::Empty);
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            match slot.session.open().await {
                Ok(()) => {
                    slot.state = HandleState::Ready;
                    tracing::info!(session = slot.session.id(), "Session ready");
                }
                Err(e) if index == 0 => {
                    return Err(PoolError::PrimaryOpenFailed {
                        session_id: slot.session.id().to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    slot.state = HandleState::Closed;
                    tracing::warn!(
                        session = slot.session.id(),
                        error = %e,
                        "Backup session failed to open; continuing without failover"
                    );
                }
            }
        }

        self.active = 0;
        Ok(())
    }

    /// Identifier of the active session.
    pub fn active_id(&self) -> &str {
        self.slots[self.active].session.id()
    }

    /// The active session, for submission.
    ///
    /// Only meaningful after [`SessionPool::open_all`] succeeded.
    pub fn active(&mut self) -> &mut dyn GenerationSession {
        self.slots[self.active].session.as_mut()
    }

    /// Make the next ready session active, cycling in declaration order.
    ///
    /// A no-op when no other session is ready; with two sessions this
    /// alternates between them. Returns the id of the now-active session.
    pub fn switch_active(&mut self) -> &str {
        let start = self.active;
        let mut next = (start + 1) % self.slots.len();
        while next != start && self.slots[next].state != HandleState::Ready {
            next = (next + 1) % self.slots.len();
        }

        if next == start {
            tracing::debug!(
                session = self.active_id(),
                "No alternate session ready; keeping current"
            );
        } else {
            self.active = next;
            self.switches += 1;
            tracing::info!(
                session = self.active_id(),
                switches = self.switches,
                "Switched active session"
            );
        }
        self.active_id()
    }

    /// Make the named session active, if it is ready.
    ///
    /// Used when a resumed checkpoint names the session that served the
    /// last completed scene. Not counted as a failover switch.
    pub fn activate(&mut self, id: &str) -> bool {
        let position = self
            .slots
            .iter()
            .position(|slot| slot.session.id() == id && slot.state == HandleState::Ready);
        match position {
            Some(index) => {
                self.active = index;
                true
            }
            None => {
                tracing::warn!(session = id, "Session not available to activate");
                false
            }
        }
    }

    /// Close every session that is not already closed. Idempotent.
    pub async fn close_all(&mut self) {
        for slot in &mut self.slots {
            if slot.state != HandleState::Closed {
                slot.session.close().await;
                slot.state = HandleState::Closed;
            }
        }
    }

    /// Number of sessions currently ready.
    pub fn ready_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.state == HandleState::Ready)
            .count()
    }

    /// Failover switches performed so far, for the run summary.
    pub fn switch_count(&self) -> u32 {
        self.switches
    }
}

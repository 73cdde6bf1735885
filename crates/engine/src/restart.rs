//! Scheduled self-restart (PRD-6).
//!
//! Long-lived producer sessions degrade, so the engine bounds their
//! lifetime: after every N successful scenes it persists a restart
//! checkpoint, tears the session pool down, and hands control back to the
//! binary, which relaunches the current executable after a cooldown. The
//! replacement process receives no arguments; the checkpoint alone
//! carries everything needed to resume.

use std::time::Duration;

use retake_core::checkpoint::Checkpoint;
use retake_session::SessionPool;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::store::CheckpointStore;

// ---------------------------------------------------------------------------
// RestartController
// ---------------------------------------------------------------------------

/// Decides when a scheduled restart is due and arms it.
pub struct RestartController {
    /// Successes between restarts. `0` disables scheduled restarts.
    restart_after: u32,
}

impl RestartController {
    pub fn new(restart_after: u32) -> Self {
        Self { restart_after }
    }

    /// True when a restart should happen now.
    ///
    /// Evaluated only after a scene succeeds; `successful` is the
    /// cumulative success count within the selected range and `remaining`
    /// the scenes left after the one that just completed. Completing the
    /// range always wins over restarting.
    pub fn due(&self, successful: u32, remaining: u32) -> bool {
        self.restart_after > 0
            && successful > 0
            && successful % self.restart_after == 0
            && remaining > 0
    }

    /// Arm the restart: persist the restart checkpoint, then close every
    /// session handle.
    ///
    /// `checkpoint` must already carry the restart block; after this
    /// returns the process holds no producer state and can exit.
    pub async fn arm(
        &self,
        store: &CheckpointStore,
        pool: &mut SessionPool,
        checkpoint: Checkpoint,
    ) -> Result<(), EngineError> {
        store.save(&checkpoint).await?;
        pool.close_all().await;
        tracing::info!(
            successful = checkpoint.successful_scenes,
            completed = checkpoint.current_scene_index,
            total = checkpoint.total_scenes,
            "Restart armed; sessions closed"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Relaunch
// ---------------------------------------------------------------------------

/// Sleep the cooldown, then spawn a replacement orchestrator process.
///
/// The child is the current executable with no arguments and is left
/// running when this process exits. Returns `false` when cancellation
/// tripped during the cooldown and no process was spawned.
pub async fn relaunch_after_cooldown(
    cooldown: Duration,
    cancel: &CancellationToken,
) -> Result<bool, EngineError> {
    tracing::info!(cooldown_secs = cooldown.as_secs(), "Cooling down before relaunch");
    tokio::select! {
        _ = cancel.cancelled() => {
            tracing::warn!("Relaunch cancelled during cooldown");
            return Ok(false);
        }
        _ = tokio::time::sleep(cooldown) => {}
    }

    let exe = std::env::current_exe()?;
    let child = tokio::process::Command::new(&exe).spawn()?;
    tracing::info!(
        pid = child.id().unwrap_or_default(),
        exe = %exe.display(),
        "Replacement process launched"
    );
    Ok(true)
}

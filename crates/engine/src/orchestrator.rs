//! Run orchestration (PRD-1).
//!
//! The orchestrator owns the scene list, the session pool, and the
//! checkpoint store for one process lifetime. `run` resolves the
//! operator's selection into a validated range, opens the pool, then
//! drives each position to a terminal state via the attempt controller,
//! persisting a checkpoint after every completed scene.
//!
//! The orchestrator is the only writer of the checkpoint store. One
//! abandoned scene never stops the run; only hard errors (unusable
//! environment) do.

use std::time::Duration;

use chrono::Utc;

use retake_core::checkpoint::Checkpoint;
use retake_core::retry::RetryPolicy;
use retake_core::scene::Scene;
use retake_core::selection::{resolve_selection, ResolvedRange, Selection};
use retake_core::types::{SceneNumber, Timestamp};
use retake_session::SessionPool;
use tokio_util::sync::CancellationToken;

use crate::attempt::AttemptController;
use crate::error::EngineError;
use crate::restart::RestartController;
use crate::store::CheckpointStore;
use crate::summary::RunSummary;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Engine tunables, bundled for construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    /// Successes between scheduled restarts; `0` disables them.
    pub restart_after: u32,
    /// Pause between a successful scene and the next submission.
    pub scene_wait: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            restart_after: 3,
            scene_wait: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every position in the range reached a terminal state; the
    /// checkpoint is cleared.
    Completed(RunSummary),
    /// A scheduled restart is armed: restart checkpoint written, sessions
    /// closed. The caller should relaunch after its cooldown and exit 0.
    RestartPending(RunSummary),
    /// Cancellation tripped. The last saved checkpoint stays valid for a
    /// later resume.
    Interrupted(RunSummary),
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one selected scene range to its end state.
pub struct Orchestrator {
    scenes: Vec<Scene>,
    pool: SessionPool,
    store: CheckpointStore,
    retry: RetryPolicy,
    restart: RestartController,
    scene_wait: Duration,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        scenes: Vec<Scene>,
        pool: SessionPool,
        store: CheckpointStore,
        config: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            scenes,
            pool,
            store,
            retry: config.retry,
            restart: RestartController::new(config.restart_after),
            scene_wait: config.scene_wait,
            cancel,
        }
    }

    /// Process the selection to one of the [`RunOutcome`] end states.
    ///
    /// Reads the checkpoint once, resolves and validates the range before
    /// any session is opened, and checkpoints after every terminal scene.
    pub async fn run(&mut self, selection: Selection) -> Result<RunOutcome, EngineError> {
        let checkpoint = self.store.load().await?;
        let range = resolve_selection(selection, self.scenes.len() as u32, checkpoint.as_ref())?;
        let started = Utc::now();

        if range.is_already_complete() {
            // Crash window between the final save and the clear; finish
            // the bookkeeping without opening any session.
            tracing::info!("Selected range is already complete; clearing checkpoint");
            self.store.clear().await?;
            let summary = RunSummary::new(
                &range,
                range.prior_successes,
                range.prior_completed,
                Vec::new(),
                0,
                started,
            );
            return Ok(RunOutcome::Completed(summary));
        }

        self.pool.open_all().await?;

        if matches!(selection, Selection::Resume) {
            if let Some(cp) = &checkpoint {
                if !cp.last_account.is_empty() && self.pool.activate(&cp.last_account) {
                    tracing::info!(session = %cp.last_account, "Resumed on the checkpointed session");
                }
            }
        }

        let total = range.total_in_range();
        let mut successful = range.prior_successes;
        let mut completed = range.prior_completed;
        let mut abandoned_scenes: Vec<SceneNumber> = Vec::new();

        tracing::info!(
            mode = range.mode.as_str(),
            start = range.original_start,
            end = range.original_end,
            next = range.next_position,
            remaining = range.remaining(),
            sessions = self.pool.ready_count(),
            "Starting production run"
        );

        for position in range.next_position..=range.original_end {
            let scene = &self.scenes[(position - 1) as usize];
            tracing::info!(
                scene = scene.number,
                label = %scene.label,
                position,
                total,
                "Processing scene"
            );

            let mut controller = AttemptController::new(&mut self.pool, &self.retry, &self.cancel);
            let result = match controller.run(scene).await? {
                Some(result) => result,
                None => {
                    tracing::warn!(scene = scene.number, "Run interrupted");
                    let summary = self.summarize(&range, successful, completed, abandoned_scenes, started);
                    return Ok(RunOutcome::Interrupted(summary));
                }
            };

            completed += 1;
            let succeeded = result.is_success();
            if succeeded {
                successful += 1;
            } else {
                abandoned_scenes.push(result.scene_number);
            }

            let remaining = range.original_end - position;
            let progress = Checkpoint::new(successful, completed, total, result.last_session);

            if succeeded && self.restart.due(successful, remaining) {
                let armed =
                    progress.with_restart(range.mode, range.original_start, range.original_end);
                self.restart.arm(&self.store, &mut self.pool, armed).await?;
                let summary = self.summarize(&range, successful, completed, abandoned_scenes, started);
                return Ok(RunOutcome::RestartPending(summary));
            }
            self.store.save(&progress).await?;

            if succeeded && remaining > 0 && !self.pause_between_scenes().await {
                let summary = self.summarize(&range, successful, completed, abandoned_scenes, started);
                return Ok(RunOutcome::Interrupted(summary));
            }
        }

        self.store.clear().await?;
        let summary = self.summarize(&range, successful, completed, abandoned_scenes, started);
        tracing::info!(
            successful = summary.successful,
            abandoned = summary.abandoned_count(),
            switches = summary.session_switches,
            elapsed_secs = summary.elapsed_secs,
            "Production run complete"
        );
        Ok(RunOutcome::Completed(summary))
    }

    /// Close every session handle. Safe after any outcome.
    pub async fn shutdown(&mut self) {
        tracing::info!("Closing sessions");
        self.pool.close_all().await;
    }

    // ---- private helpers ----

    /// Inter-scene pacing, applied only after successes.
    ///
    /// Returns `false` when cancellation tripped during the pause.
    async fn pause_between_scenes(&self) -> bool {
        tracing::debug!(wait_secs = self.scene_wait.as_secs(), "Pacing before next scene");
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(self.scene_wait) => true,
        }
    }

    fn summarize(
        &self,
        range: &ResolvedRange,
        successful: u32,
        completed: u32,
        abandoned_scenes: Vec<SceneNumber>,
        started: Timestamp,
    ) -> RunSummary {
        RunSummary::new(
            range,
            successful,
            completed,
            abandoned_scenes,
            self.pool.switch_count(),
            started,
        )
    }
}

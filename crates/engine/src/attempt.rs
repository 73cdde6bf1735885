//! Per-scene attempt loop (PRD-3).
//!
//! [`AttemptController`] drives one scene to a terminal state: submit,
//! classify the failure, then retry, fail over, or abandon per the retry
//! policy. Each attempt is bounded by the policy timeout; an elapsed
//! timeout is treated as a network-class failure, not a hard error.
//!
//! The controller never touches the checkpoint store. It reports the
//! terminal state and lets the orchestrator persist progress.

use retake_core::attempt::{
    evaluate_failure, AbandonReason, Attempt, AttemptPhase, Outcome, RetryDecision,
};
use retake_core::classifier::ErrorCategory;
use retake_core::retry::{jittered_wait, RetryPolicy};
use retake_core::scene::Scene;
use retake_core::types::SceneNumber;
use retake_session::SessionPool;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Terminal verdict of one scene's attempt loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneVerdict {
    /// The producer delivered; local path of the stored artifact.
    Succeeded { artifact: String },
    /// No further attempts will be made for this scene.
    Abandoned {
        reason: AbandonReason,
        category: ErrorCategory,
        detail: String,
    },
}

/// What the attempt loop produced for one scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneResult {
    pub scene_number: SceneNumber,
    pub verdict: SceneVerdict,
    /// Attempts consumed, including the terminal one.
    pub attempts: u32,
    /// Session that served the terminal attempt.
    pub last_session: String,
}

impl SceneResult {
    pub fn is_success(&self) -> bool {
        matches!(self.verdict, SceneVerdict::Succeeded { .. })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Bounded retry loop for one scene at a time.
///
/// Borrowed per scene by the orchestrator; holds the phase machine state
/// for the scene currently in flight.
pub struct AttemptController<'a> {
    pool: &'a mut SessionPool,
    policy: &'a RetryPolicy,
    cancel: &'a CancellationToken,
    phase: AttemptPhase,
}

impl<'a> AttemptController<'a> {
    pub fn new(
        pool: &'a mut SessionPool,
        policy: &'a RetryPolicy,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            pool,
            policy,
            cancel,
            phase: AttemptPhase::Ready,
        }
    }

    /// Drive `scene` to a terminal state.
    ///
    /// Returns `Ok(None)` when the cancellation token tripped first; the
    /// scene then counts as not completed. A hard session error aborts
    /// the whole run.
    pub async fn run(&mut self, scene: &Scene) -> Result<Option<SceneResult>, EngineError> {
        self.phase = AttemptPhase::Ready;
        let mut ordinal: u32 = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            let session_id = self.pool.active_id().to_string();
            tracing::info!(
                scene = scene.number,
                attempt = ordinal,
                budget = self.policy.max_retries_per_scene,
                session = %session_id,
                "Submitting scene"
            );

            self.advance(AttemptPhase::Submitting);
            let outcome = match self.submit_with_timeout(scene).await? {
                Some(outcome) => outcome,
                None => return Ok(None),
            };
            self.advance(AttemptPhase::Evaluating);

            let attempt = Attempt {
                scene_number: scene.number,
                ordinal,
                session_id,
                outcome,
            };

            match attempt.outcome {
                Outcome::Success { artifact } => {
                    self.advance(AttemptPhase::Succeeded);
                    tracing::info!(
                        scene = scene.number,
                        attempts = attempt.ordinal,
                        artifact = %artifact,
                        "Scene succeeded"
                    );
                    return Ok(Some(SceneResult {
                        scene_number: scene.number,
                        verdict: SceneVerdict::Succeeded { artifact },
                        attempts: attempt.ordinal,
                        last_session: attempt.session_id,
                    }));
                }
                Outcome::Failure { category, detail } => {
                    tracing::warn!(
                        scene = scene.number,
                        attempt = attempt.ordinal,
                        category = category.as_str(),
                        detail = %detail,
                        "Attempt failed"
                    );

                    match evaluate_failure(category, attempt.ordinal, self.policy) {
                        RetryDecision::Abandon(reason) => {
                            self.advance(AttemptPhase::Abandoned);
                            tracing::error!(
                                scene = scene.number,
                                attempts = attempt.ordinal,
                                reason = reason.as_str(),
                                category = category.as_str(),
                                "Scene abandoned"
                            );
                            return Ok(Some(SceneResult {
                                scene_number: scene.number,
                                verdict: SceneVerdict::Abandoned {
                                    reason,
                                    category,
                                    detail,
                                },
                                attempts: attempt.ordinal,
                                last_session: attempt.session_id,
                            }));
                        }
                        RetryDecision::Retry { switch_session } => {
                            self.advance(AttemptPhase::RetryPending);
                            if switch_session {
                                self.pool.switch_active();
                            }
                            if !self.pause_before_retry(scene.number, ordinal).await {
                                return Ok(None);
                            }
                            ordinal += 1;
                            self.advance(AttemptPhase::Ready);
                        }
                    }
                }
            }
        }
    }

    // ---- private helpers ----

    /// Submit on the active session, bounded by the attempt timeout.
    ///
    /// `Ok(None)` means cancelled mid-flight. An elapsed timeout becomes
    /// a network-class failure outcome so the normal retry path applies.
    async fn submit_with_timeout(
        &mut self,
        scene: &Scene,
    ) -> Result<Option<Outcome>, EngineError> {
        let attempt_timeout = self.policy.attempt_timeout;
        let submit = self.pool.active().submit(scene);

        tokio::select! {
            _ = self.cancel.cancelled() => Ok(None),
            result = tokio::time::timeout(attempt_timeout, submit) => match result {
                Ok(Ok(outcome)) => Ok(Some(outcome)),
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Ok(Some(Outcome::failure(format!(
                    "timeout waiting for generation outcome after {}s",
                    attempt_timeout.as_secs()
                )))),
            },
        }
    }

    /// Sleep the jittered retry wait, racing cancellation.
    ///
    /// Returns `false` when cancellation tripped during the wait.
    async fn pause_before_retry(&self, scene_number: SceneNumber, ordinal: u32) -> bool {
        let wait = jittered_wait(self.policy.base_wait);
        tracing::info!(
            scene = scene_number,
            next_attempt = ordinal + 1,
            wait_ms = wait.as_millis() as u64,
            "Waiting before retry"
        );
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => true,
        }
    }

    fn advance(&mut self, next: AttemptPhase) {
        debug_assert!(
            self.phase.can_transition(next),
            "invalid attempt phase transition {} -> {}",
            self.phase.as_str(),
            next.as_str()
        );
        self.phase = next;
    }
}

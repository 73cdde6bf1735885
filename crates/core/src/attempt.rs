//! Attempt data model and retry state machine (PRD-3).
//!
//! A scene is processed by a bounded loop of attempts. Each attempt moves
//! through the phases `Ready -> Submitting -> Evaluating` and lands in one
//! of `Succeeded`, `RetryPending`, or `Abandoned`. [`evaluate_failure`] is
//! the single decision point for what a failed attempt does next: retry,
//! retry on the other session, or abandon the scene.

use crate::classifier::{classify, ErrorCategory};
use crate::retry::RetryPolicy;
use crate::types::SceneNumber;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a single submission, produced exactly once per attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The producer delivered an artifact; the reference is a local path.
    Success { artifact: String },
    /// The producer failed; the category is always derived from the
    /// detail text via [`classify`].
    Failure {
        category: ErrorCategory,
        detail: String,
    },
}

impl Outcome {
    /// Successful outcome carrying an artifact reference.
    pub fn success(artifact: impl Into<String>) -> Self {
        Outcome::Success {
            artifact: artifact.into(),
        }
    }

    /// Failed outcome classified from the raw signal text.
    pub fn failure(signal: impl Into<String>) -> Self {
        let detail = signal.into();
        Outcome::Failure {
            category: classify(&detail),
            detail,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// Attempt record
// ---------------------------------------------------------------------------

/// One attempt at one scene, append-only within a scene's retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub scene_number: SceneNumber,
    /// 1-based ordinal scoped to the scene.
    pub ordinal: u32,
    /// Session that served this attempt.
    pub session_id: String,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Phase machine
// ---------------------------------------------------------------------------

/// Phases of a scene's attempt loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Ready,
    Submitting,
    Evaluating,
    Succeeded,
    RetryPending,
    Abandoned,
}

impl AttemptPhase {
    /// Stable identifier for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptPhase::Ready => "ready",
            AttemptPhase::Submitting => "submitting",
            AttemptPhase::Evaluating => "evaluating",
            AttemptPhase::Succeeded => "succeeded",
            AttemptPhase::RetryPending => "retry_pending",
            AttemptPhase::Abandoned => "abandoned",
        }
    }

    /// Phases reachable from this one.
    pub fn valid_transitions(self) -> &'static [AttemptPhase] {
        match self {
            AttemptPhase::Ready => &[AttemptPhase::Submitting],
            AttemptPhase::Submitting => &[AttemptPhase::Evaluating],
            AttemptPhase::Evaluating => &[
                AttemptPhase::Succeeded,
                AttemptPhase::RetryPending,
                AttemptPhase::Abandoned,
            ],
            AttemptPhase::RetryPending => &[AttemptPhase::Ready],
            AttemptPhase::Succeeded | AttemptPhase::Abandoned => &[],
        }
    }

    pub fn can_transition(self, next: AttemptPhase) -> bool {
        self.valid_transitions().contains(&next)
    }

    /// Terminal phases end the scene's loop.
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptPhase::Succeeded | AttemptPhase::Abandoned)
    }
}

// ---------------------------------------------------------------------------
// Retry decision
// ---------------------------------------------------------------------------

/// Why a scene was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// Fatal failure category; retrying cannot help.
    Fatal,
    /// The per-scene attempt budget ran out.
    BudgetExhausted,
}

impl AbandonReason {
    pub fn as_str(self) -> &'static str {
        match self {
            AbandonReason::Fatal => "fatal",
            AbandonReason::BudgetExhausted => "budget_exhausted",
        }
    }
}

/// What the attempt loop does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep the jittered wait and attempt again; `switch_session`
    /// requests the pool to activate the other handle first.
    Retry { switch_session: bool },
    /// Stop attempting this scene.
    Abandon(AbandonReason),
}

/// Decide the next step after attempt `ordinal` (1-based) failed with
/// `category`.
///
/// Fatal categories abandon immediately. A spent attempt budget abandons.
/// Otherwise the attempt is retried, failing over at every
/// `switch_after_retries`-th failure (ordinals S, 2S, 3S, ...); a value
/// of `0` never fails over.
pub fn evaluate_failure(
    category: ErrorCategory,
    ordinal: u32,
    policy: &RetryPolicy,
) -> RetryDecision {
    if category.is_fatal() {
        return RetryDecision::Abandon(AbandonReason::Fatal);
    }
    if ordinal >= policy.max_retries_per_scene {
        return RetryDecision::Abandon(AbandonReason::BudgetExhausted);
    }
    let switch_session =
        policy.switch_after_retries > 0 && ordinal % policy.switch_after_retries == 0;
    RetryDecision::Retry { switch_session }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy(max: u32, switch_after: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries_per_scene: max,
            switch_after_retries: switch_after,
            base_wait: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
        }
    }

    // -- Outcome --

    #[test]
    fn failure_outcome_is_classified_from_signal() {
        let o = Outcome::failure("quota exceeded");
        assert_eq!(
            o,
            Outcome::Failure {
                category: ErrorCategory::QuotaExceeded,
                detail: "quota exceeded".to_string(),
            }
        );
    }

    #[test]
    fn success_outcome_keeps_artifact_reference() {
        let o = Outcome::success("scene_3_video_170000.mp4");
        assert!(o.is_success());
    }

    // -- phase machine --

    #[test]
    fn happy_path_transitions_are_valid() {
        assert!(AttemptPhase::Ready.can_transition(AttemptPhase::Submitting));
        assert!(AttemptPhase::Submitting.can_transition(AttemptPhase::Evaluating));
        assert!(AttemptPhase::Evaluating.can_transition(AttemptPhase::Succeeded));
        assert!(AttemptPhase::Evaluating.can_transition(AttemptPhase::RetryPending));
        assert!(AttemptPhase::Evaluating.can_transition(AttemptPhase::Abandoned));
        assert!(AttemptPhase::RetryPending.can_transition(AttemptPhase::Ready));
    }

    #[test]
    fn terminal_phases_have_no_exits() {
        assert!(AttemptPhase::Succeeded.valid_transitions().is_empty());
        assert!(AttemptPhase::Abandoned.valid_transitions().is_empty());
        assert!(AttemptPhase::Succeeded.is_terminal());
        assert!(AttemptPhase::Abandoned.is_terminal());
        assert!(!AttemptPhase::Ready.is_terminal());
    }

    #[test]
    fn skipping_phases_is_invalid() {
        assert!(!AttemptPhase::Ready.can_transition(AttemptPhase::Evaluating));
        assert!(!AttemptPhase::Ready.can_transition(AttemptPhase::Succeeded));
        assert!(!AttemptPhase::Submitting.can_transition(AttemptPhase::Ready));
    }

    // -- evaluate_failure: fatality --

    #[test]
    fn fatal_category_abandons_on_first_attempt() {
        let d = evaluate_failure(ErrorCategory::PermissionDenied, 1, &policy(25, 1));
        assert_eq!(d, RetryDecision::Abandon(AbandonReason::Fatal));
    }

    #[test]
    fn fatal_category_abandons_even_with_budget_left() {
        let d = evaluate_failure(ErrorCategory::PermissionDenied, 3, &policy(25, 5));
        assert_eq!(d, RetryDecision::Abandon(AbandonReason::Fatal));
    }

    // -- evaluate_failure: budget --

    #[test]
    fn budget_exhaustion_abandons() {
        let p = policy(3, 0);
        assert!(matches!(
            evaluate_failure(ErrorCategory::NetworkError, 2, &p),
            RetryDecision::Retry { .. }
        ));
        assert_eq!(
            evaluate_failure(ErrorCategory::NetworkError, 3, &p),
            RetryDecision::Abandon(AbandonReason::BudgetExhausted)
        );
    }

    // -- evaluate_failure: failover cadence --

    #[test]
    fn switch_every_failure_when_threshold_is_one() {
        let p = policy(25, 1);
        for ordinal in 1..=5 {
            assert_eq!(
                evaluate_failure(ErrorCategory::QuotaExceeded, ordinal, &p),
                RetryDecision::Retry {
                    switch_session: true
                }
            );
        }
    }

    #[test]
    fn switch_at_multiples_of_threshold() {
        let p = policy(25, 3);
        let expect_switch = [false, false, true, false, false, true, false];
        for (i, expected) in expect_switch.iter().enumerate() {
            let ordinal = i as u32 + 1;
            assert_eq!(
                evaluate_failure(ErrorCategory::Unknown, ordinal, &p),
                RetryDecision::Retry {
                    switch_session: *expected
                },
                "ordinal {ordinal}"
            );
        }
    }

    #[test]
    fn zero_threshold_never_switches() {
        let p = policy(25, 0);
        for ordinal in 1..=6 {
            assert_eq!(
                evaluate_failure(ErrorCategory::TransientUi, ordinal, &p),
                RetryDecision::Retry {
                    switch_session: false
                }
            );
        }
    }
}

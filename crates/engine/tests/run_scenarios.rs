//! End-to-end orchestrated runs against scripted sessions: clean
//! completion, mid-range abandonment, scheduled restart plus resume,
//! failover, and interruption.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::{tempdir, TempDir};
use tokio_util::sync::CancellationToken;

use retake_core::checkpoint::Checkpoint;
use retake_core::selection::{Selection, SelectionMode};
use retake_engine::{CheckpointStore, EngineConfig, EngineError, Orchestrator, RunOutcome};
use retake_session::SessionPool;

use common::{fast_config, scenes, two_session_pool, ScriptHandle, ScriptedSession};

fn store_at(dir: &TempDir) -> CheckpointStore {
    CheckpointStore::new(dir.path().join("progress.json"))
}

fn orchestrator(
    h: &ScriptHandle,
    scene_count: u32,
    dir: &TempDir,
    config: EngineConfig,
    cancel: CancellationToken,
) -> Orchestrator {
    Orchestrator::new(
        scenes(scene_count),
        two_session_pool(h),
        store_at(dir),
        config,
        cancel,
    )
}

// -- clean completion --

#[tokio::test]
async fn full_range_completes_and_clears_the_checkpoint() {
    let h = ScriptHandle::new();
    for n in 1..=5 {
        h.push_ok(&format!("scene_{n}_video_100.mp4"));
    }
    let dir = tempdir().unwrap();

    let mut engine = orchestrator(&h, 5, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 5);
    assert_eq!(summary.completed, 5);
    assert!(summary.abandoned_scenes.is_empty());
    assert_eq!(summary.session_switches, 0);

    // Ascending order, one attempt each, all on the primary.
    assert_eq!(h.scenes_submitted(), vec![1, 2, 3, 4, 5]);
    assert!(h.sessions_used().iter().all(|s| s == "primary"));

    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

// -- abandonment mid-range --

#[tokio::test]
async fn fatal_scene_is_abandoned_and_the_range_continues() {
    let h = ScriptHandle::new();
    h.push_ok("scene_1_video_100.mp4");
    h.push_fail("prompt rejected by content policy");
    h.push_ok("scene_3_video_100.mp4");
    let dir = tempdir().unwrap();

    let mut engine = orchestrator(&h, 3, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.abandoned_scenes, vec![2]);

    // Scene 2 got exactly one attempt; scene 3 still ran.
    assert_eq!(h.scenes_submitted(), vec![1, 2, 3]);
    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

#[tokio::test]
async fn mixed_retries_and_abandonments_reconcile() {
    let h = ScriptHandle::new();
    h.push_ok("scene_1_video_100.mp4");
    h.push_fail("network unreachable");
    h.push_fail("connection reset by peer");
    h.push_ok("scene_2_video_100.mp4");
    h.push_fail("prompt rejected by content policy");
    let dir = tempdir().unwrap();

    let mut engine = orchestrator(&h, 3, &dir, fast_config(3, 0, 0), CancellationToken::new());
    let outcome = engine.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 2);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.abandoned_scenes, vec![3]);
    assert_eq!(h.scenes_submitted(), vec![1, 2, 2, 2, 3]);
}

// -- scheduled restart --

#[tokio::test]
async fn scheduled_restart_arms_and_a_resume_finishes_the_range() {
    let h = ScriptHandle::new();
    for n in 1..=3 {
        h.push_ok(&format!("scene_{n}_video_100.mp4"));
    }
    let dir = tempdir().unwrap();

    let mut first = orchestrator(&h, 5, &dir, fast_config(25, 1, 3), CancellationToken::new());
    let outcome = first.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::RestartPending(s) => s);
    assert_eq!(summary.successful, 3);
    assert_eq!(summary.completed, 3);

    // Arming closed both sessions.
    assert_eq!(h.closed().len(), 2);

    // The restart checkpoint records progress plus the original selection.
    let cp = store_at(&dir).load().await.unwrap().unwrap();
    assert!(cp.is_restart_pending());
    assert_eq!(cp.successful_scenes, 3);
    assert_eq!(cp.current_scene_index, 3);
    assert_eq!(cp.total_scenes, 5);
    let restart = cp.restart.clone().unwrap();
    assert_eq!(restart.original_selection_type, SelectionMode::All);
    assert_eq!(restart.original_start_scene, 1);
    assert_eq!(restart.original_end_scene, 5);

    // A fresh process resumes at scene 4 and never re-attempts 1-3.
    h.push_ok("scene_4_video_100.mp4");
    h.push_ok("scene_5_video_100.mp4");
    let before = h.submissions().len();

    let mut second = orchestrator(&h, 5, &dir, fast_config(25, 1, 3), CancellationToken::new());
    let outcome = second.run(Selection::Resume).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 5);
    assert_eq!(summary.completed, 5);

    let resumed: Vec<u32> = h.submissions()[before..].iter().map(|s| s.scene).collect();
    assert_eq!(resumed, vec![4, 5]);
    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

#[tokio::test]
async fn restart_does_not_trigger_on_the_last_scene() {
    let h = ScriptHandle::new();
    for n in 1..=3 {
        h.push_ok(&format!("scene_{n}_video_100.mp4"));
    }
    let dir = tempdir().unwrap();

    // Interval 3 with a 3-scene range: completion wins over restarting.
    let mut engine = orchestrator(&h, 3, &dir, fast_config(25, 1, 3), CancellationToken::new());
    let outcome = engine.run(Selection::All).await.unwrap();

    assert_matches!(outcome, RunOutcome::Completed(_));
    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

// -- failover --

#[tokio::test]
async fn failed_attempt_switches_to_the_backup_session() {
    let h = ScriptHandle::new();
    h.push_fail("network unreachable");
    h.push_ok("scene_1_video_100.mp4");
    let dir = tempdir().unwrap();

    let mut engine = orchestrator(&h, 1, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::Single { scene: 1 }).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 1);
    assert_eq!(summary.session_switches, 1);
    assert_eq!(h.sessions_used(), vec!["primary", "backup"]);
}

// -- resume --

#[tokio::test]
async fn plain_checkpoint_resumes_at_the_next_position() {
    let dir = tempdir().unwrap();
    store_at(&dir)
        .save(&Checkpoint::new(2, 2, 5, "primary"))
        .await
        .unwrap();

    let h = ScriptHandle::new();
    for n in 3..=5 {
        h.push_ok(&format!("scene_{n}_video_100.mp4"));
    }

    let mut engine = orchestrator(&h, 5, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::Resume).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.successful, 5);
    assert_eq!(summary.completed, 5);
    assert_eq!(h.scenes_submitted(), vec![3, 4, 5]);
}

#[tokio::test]
async fn resume_reactivates_the_checkpointed_session() {
    let dir = tempdir().unwrap();
    let cp = Checkpoint::new(1, 1, 3, "backup").with_restart(SelectionMode::All, 1, 3);
    store_at(&dir).save(&cp).await.unwrap();

    let h = ScriptHandle::new();
    h.push_ok("scene_2_video_100.mp4");
    h.push_ok("scene_3_video_100.mp4");

    let mut engine = orchestrator(&h, 3, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::Resume).await.unwrap();

    assert_matches!(outcome, RunOutcome::Completed(_));
    assert_eq!(h.sessions_used(), vec!["backup", "backup"]);
}

#[tokio::test]
async fn resume_of_a_finished_range_completes_without_opening_sessions() {
    let dir = tempdir().unwrap();
    store_at(&dir)
        .save(&Checkpoint::new(4, 5, 5, "primary"))
        .await
        .unwrap();

    let h = ScriptHandle::new();
    let mut engine = orchestrator(&h, 5, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let outcome = engine.run(Selection::Resume).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Completed(s) => s);
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.successful, 4);
    assert!(h.opened().is_empty());
    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

// -- validation and startup failures --

#[tokio::test]
async fn out_of_range_selection_is_rejected_before_sessions_open() {
    let h = ScriptHandle::new();
    let dir = tempdir().unwrap();

    let mut engine = orchestrator(&h, 5, &dir, fast_config(25, 1, 0), CancellationToken::new());
    let err = engine
        .run(Selection::Range { start: 2, end: 9 })
        .await
        .unwrap_err();

    assert_matches!(err, EngineError::Core(_));
    assert!(h.opened().is_empty());
}

#[tokio::test]
async fn failed_primary_session_aborts_the_run() {
    let h = ScriptHandle::new();
    let dir = tempdir().unwrap();
    let pool = SessionPool::new(vec![
        ScriptedSession::failing_open("primary", &h),
        ScriptedSession::boxed("backup", &h),
    ]);

    let mut engine = Orchestrator::new(
        scenes(2),
        pool,
        store_at(&dir),
        fast_config(25, 1, 0),
        CancellationToken::new(),
    );
    let err = engine.run(Selection::All).await.unwrap_err();

    assert_matches!(err, EngineError::Pool(_));
    assert!(h.submissions().is_empty());
}

// -- interruption --

#[tokio::test]
async fn pre_tripped_cancellation_interrupts_before_any_submission() {
    let h = ScriptHandle::new();
    let dir = tempdir().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut engine = orchestrator(&h, 3, &dir, fast_config(25, 1, 0), cancel);
    let outcome = engine.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Interrupted(s) => s);
    assert_eq!(summary.completed, 0);
    assert!(h.submissions().is_empty());
    assert_eq!(store_at(&dir).load().await.unwrap(), None);
}

#[tokio::test]
async fn cancellation_during_pacing_preserves_progress() {
    let h = ScriptHandle::new();
    h.push_ok("scene_1_video_100.mp4");
    let dir = tempdir().unwrap();
    let cancel = CancellationToken::new();

    // Trip the token once the first checkpoint lands; the run is then
    // inside (or about to enter) the inter-scene pause.
    let watcher_store = store_at(&dir);
    let watcher_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            if let Ok(Some(_)) = watcher_store.load().await {
                watcher_cancel.cancel();
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    });

    let mut config = fast_config(25, 1, 0);
    config.scene_wait = Duration::from_secs(30);
    let mut engine = orchestrator(&h, 3, &dir, config, cancel);
    let outcome = engine.run(Selection::All).await.unwrap();

    let summary = assert_matches!(outcome, RunOutcome::Interrupted(s) => s);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.successful, 1);

    // The saved checkpoint stays valid for a later resume.
    let cp = store_at(&dir).load().await.unwrap().unwrap();
    assert_eq!(cp.current_scene_index, 1);
    assert_eq!(cp.successful_scenes, 1);
    assert!(!cp.is_restart_pending());
}

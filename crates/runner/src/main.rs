//! `retake-runner` -- interactive scene production runner.
//!
//! Loads configuration and the scene prompt file, asks the operator what
//! to process (or auto-resumes after a scheduled restart), then drives
//! the engine until the selected range is done.
//!
//! Exit codes: `0` on completion, operator exit, or interrupt teardown;
//! `1` on configuration failures, an unreadable scene file or checkpoint,
//! or a hard environment error mid-run.

use retake_core::scene::parse_scene_map;
use retake_core::selection::Selection;
use retake_engine::{
    relaunch_after_cooldown, CheckpointStore, EngineConfig, Orchestrator, RunOutcome,
};
use retake_session::{GenerationSession, SessionPool, StudioApi, StudioSession};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retake_runner::config::RunnerConfig;
use retake_runner::menu;
use retake_runner::notify::{Notifier, NotifierConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "retake_runner=info,retake_engine=info,retake_session=info,retake_core=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration is unusable");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration is unusable");
        std::process::exit(1);
    }

    let notifier = match NotifierConfig::from_env() {
        Ok(smtp) => smtp.map(Notifier::new),
        Err(e) => {
            tracing::error!(error = %e, "SMTP notification is misconfigured");
            std::process::exit(1);
        }
    };

    // --- Scene list ---
    let raw = match tokio::fs::read_to_string(&config.scene_file).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(
                error = %e,
                file = %config.scene_file.display(),
                "Could not read the scene file"
            );
            std::process::exit(1);
        }
    };
    let scenes = match parse_scene_map(&raw) {
        Ok(scenes) => scenes,
        Err(e) => {
            tracing::error!(
                error = %e,
                file = %config.scene_file.display(),
                "Scene file is invalid"
            );
            std::process::exit(1);
        }
    };
    tracing::info!(
        scenes = scenes.len(),
        file = %config.scene_file.display(),
        email = notifier.is_some(),
        "Loaded scene prompts"
    );

    // --- Artifact directory ---
    if let Err(e) = tokio::fs::create_dir_all(&config.artifact_dir).await {
        tracing::error!(
            error = %e,
            dir = %config.artifact_dir.display(),
            "Could not create the artifact directory"
        );
        std::process::exit(1);
    }

    // --- Checkpoint peek ---
    let store = CheckpointStore::new(config.checkpoint_file.clone());
    let checkpoint = match store.load().await {
        Ok(checkpoint) => checkpoint,
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %config.checkpoint_file.display(),
                "Checkpoint is unreadable; fix or delete it"
            );
            std::process::exit(1);
        }
    };

    // --- Selection ---
    // A restart-pending checkpoint means this process was relaunched by
    // the restart controller: skip the menu and continue the range.
    let selection = match &checkpoint {
        Some(cp) if cp.is_restart_pending() => {
            tracing::info!(
                completed = cp.current_scene_index,
                total = cp.total_scenes,
                "Restart-pending checkpoint found; resuming automatically"
            );
            Selection::Resume
        }
        _ => match menu::prompt_selection(scenes.len() as u32, checkpoint.is_some()) {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                tracing::info!("Exiting at operator request");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not read menu input");
                std::process::exit(1);
            }
        },
    };

    // --- Shutdown watcher ---
    // Installed only once a run is chosen; at the menu, Ctrl-C simply
    // kills the process.
    let cancel = CancellationToken::new();
    tokio::spawn(watch_for_shutdown(cancel.clone()));

    // --- Sessions ---
    let mut sessions: Vec<Box<dyn GenerationSession>> = vec![Box::new(StudioSession::new(
        "primary",
        StudioApi::new(&config.api_url, &config.api_key),
        &config.artifact_dir,
    ))];
    if let Some(backup_key) = &config.backup_api_key {
        sessions.push(Box::new(StudioSession::new(
            "backup",
            StudioApi::new(&config.api_url, backup_key),
            &config.artifact_dir,
        )));
    }
    let pool = SessionPool::new(sessions);

    // --- Engine ---
    let engine_config = EngineConfig {
        retry: config.retry_policy(),
        restart_after: config.restart_after_videos,
        scene_wait: config.scene_wait,
    };
    let mut orchestrator = Orchestrator::new(scenes, pool, store, engine_config, cancel.clone());

    let outcome = match orchestrator.run(selection).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            orchestrator.shutdown().await;
            std::process::exit(1);
        }
    };

    match outcome {
        RunOutcome::Completed(summary) => {
            menu::print_summary(&summary);
            orchestrator.shutdown().await;
            if let Some(notifier) = &notifier {
                if let Err(e) = notifier.send_run_summary(&summary).await {
                    tracing::warn!(error = %e, "Completion email failed");
                }
            }
        }
        RunOutcome::RestartPending(summary) => {
            tracing::info!(
                successful = summary.successful,
                cooldown_secs = config.restart_pause.as_secs(),
                "Scheduled restart pending; relaunching after cooldown"
            );
            match relaunch_after_cooldown(config.restart_pause, &cancel).await {
                Ok(true) => tracing::info!("Relaunch spawned; this process now exits"),
                Ok(false) => tracing::warn!(
                    "Cancelled during restart cooldown; resume manually from the saved checkpoint"
                ),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        "Relaunch failed; resume manually from the saved checkpoint"
                    );
                    std::process::exit(1);
                }
            }
        }
        RunOutcome::Interrupted(summary) => {
            tracing::info!(
                completed = summary.completed,
                successful = summary.successful,
                "Run interrupted; progress is checkpointed for resume"
            );
            orchestrator.shutdown().await;
        }
    }
}

/// Trip the cancellation token on SIGINT (Ctrl-C) or SIGTERM.
///
/// The engine finishes the in-flight attempt's bookkeeping and returns
/// `Interrupted`, so a signal never loses checkpointed progress.
async fn watch_for_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), finishing the current scene");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, finishing the current scene");
        }
    }
    cancel.cancel();
}

//! Generation session contract and its production implementation (PRD-4).
//!
//! A [`GenerationSession`] is one authenticated account at the producer:
//! it opens once, serves any number of scene submissions, and closes once.
//! The contract deliberately folds every *expected* producer failure into
//! [`Outcome::Failure`]; an `Err` from `submit` means the environment
//! itself is unusable and the run should stop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use retake_core::attempt::Outcome;
use retake_core::naming::artifact_filename;
use retake_core::scene::Scene;
use retake_core::types::epoch_secs;

use crate::api::{OperationState, StudioApi, StudioApiError};

/// Delay between polls of a queued generation.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Hard session errors; retrying the scene cannot help.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The producer rejected the session's credential.
    #[error("Authentication failed for session '{session_id}': {detail}")]
    Auth { session_id: String, detail: String },

    /// The REST layer failed outside a scene submission.
    #[error("Session API error: {0}")]
    Api(#[from] StudioApiError),

    /// Local filesystem failure while storing an artifact.
    #[error("Artifact I/O error: {0}")]
    ArtifactIo(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// One authenticated producer account, as consumed by the engine.
///
/// Implementations must keep `open` idempotent and `close` safe to call
/// repeatedly; the pool drives both during startup and teardown.
#[async_trait]
pub trait GenerationSession: Send {
    /// Stable identifier used in logs and checkpoints, e.g. `"primary"`.
    fn id(&self) -> &str;

    /// Authenticate and make the session ready for submissions.
    async fn open(&mut self) -> Result<(), SessionError>;

    /// Submit one scene and wait for the producer's verdict.
    ///
    /// Expected failures (quota, content policy, network, producer-side
    /// errors) come back as [`Outcome::Failure`] so the attempt loop can
    /// classify and retry them. The caller bounds this call with its
    /// per-attempt timeout.
    async fn submit(&mut self, scene: &Scene) -> Result<Outcome, SessionError>;

    /// Release the session. Safe to call more than once.
    async fn close(&mut self);
}

// ---------------------------------------------------------------------------
// Production implementation
// ---------------------------------------------------------------------------

/// [`GenerationSession`] backed by the studio REST API.
///
/// `submit` drives the full request lifecycle: stage reference images,
/// submit the generation, poll the operation to a terminal state, download
/// the artifact, and store it under the artifact directory.
pub struct StudioSession {
    id: String,
    api: StudioApi,
    artifact_dir: PathBuf,
    poll_interval: Duration,
    /// Credential verified; cleared again by `close`.
    ready: bool,
}

impl StudioSession {
    pub fn new(id: impl Into<String>, api: StudioApi, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            api,
            artifact_dir: artifact_dir.into(),
            poll_interval: POLL_INTERVAL,
            ready: false,
        }
    }

    // ---- private helpers ----

    /// Read the scene's reference images into memory.
    ///
    /// An unreadable image is reported as an upload failure for this
    /// attempt rather than a hard error, matching how the producer's own
    /// upload rejections surface.
    async fn stage_reference_images(
        &self,
        scene: &Scene,
    ) -> Result<Vec<(String, Vec<u8>)>, Outcome> {
        let mut images = Vec::with_capacity(scene.prompt.reference_images.len());
        for path in &scene.prompt.reference_images {
            match tokio::fs::read(path).await {
                Ok(bytes) => images.push((image_part_name(path), bytes)),
                Err(e) => {
                    return Err(Outcome::failure(format!(
                        "reference image upload failed for '{path}': {e}"
                    )));
                }
            }
        }
        Ok(images)
    }

    /// Poll the operation until the producer reports a terminal state.
    async fn wait_for_terminal(
        &self,
        operation_id: &str,
    ) -> Result<crate::api::OperationStatus, StudioApiError> {
        loop {
            let status = self.api.operation_status(operation_id).await?;
            if status.state.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Download the finished artifact and store it on disk.
    async fn store_artifact(&self, scene: &Scene, url: &str) -> Result<Outcome, SessionError> {
        let bytes = match self.api.download_artifact(url).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(Outcome::failure(e.to_string())),
        };

        let filename = artifact_filename(scene.number, epoch_secs());
        let path = self.artifact_dir.join(&filename);
        tokio::fs::write(&path, &bytes).await?;

        tracing::info!(
            session = %self.id,
            scene = scene.number,
            artifact = %path.display(),
            bytes = bytes.len(),
            "Artifact stored"
        );
        Ok(Outcome::success(path.to_string_lossy()))
    }
}

#[async_trait]
impl GenerationSession for StudioSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn open(&mut self) -> Result<(), SessionError> {
        if self.ready {
            return Ok(());
        }
        match self.api.verify_access().await {
            Ok(()) => {
                self.ready = true;
                tracing::info!(session = %self.id, "Session opened");
                Ok(())
            }
            Err(StudioApiError::Api { status, body }) if status == 401 || status == 403 => {
                Err(SessionError::Auth {
                    session_id: self.id.clone(),
                    detail: format!("({status}) {body}"),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn submit(&mut self, scene: &Scene) -> Result<Outcome, SessionError> {
        let images = match self.stage_reference_images(scene).await {
            Ok(images) => images,
            Err(outcome) => return Ok(outcome),
        };

        let client_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            session = %self.id,
            scene = scene.number,
            client_id = %client_id,
            images = images.len(),
            "Submitting generation request"
        );

        let accepted = match self
            .api
            .submit_generation(&scene.prompt.prompt, &client_id, images)
            .await
        {
            Ok(accepted) => accepted,
            Err(e) => return Ok(Outcome::failure(e.to_string())),
        };

        let status = match self.wait_for_terminal(&accepted.operation_id).await {
            Ok(status) => status,
            Err(e) => return Ok(Outcome::failure(e.to_string())),
        };

        match status.state {
            OperationState::Succeeded => match status.video_url {
                Some(url) => self.store_artifact(scene, &url).await,
                None => Ok(Outcome::failure(
                    "producer reported success without a video url",
                )),
            },
            _ => {
                let detail = status
                    .error
                    .unwrap_or_else(|| "producer reported failure without detail".to_string());
                Ok(Outcome::failure(detail))
            }
        }
    }

    async fn close(&mut self) {
        if self.ready {
            self.ready = false;
            tracing::info!(session = %self.id, "Session closed");
        }
    }
}

/// Multipart part filename for a reference image path.
fn image_part_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retake_core::classifier::ErrorCategory;
    use retake_core::scene::ScenePrompt;

    fn scene_with_images(images: Vec<String>) -> Scene {
        Scene {
            number: 3,
            label: "Scene3".to_string(),
            prompt: ScenePrompt {
                prompt: "a harbor at dawn".to_string(),
                reference_images: images,
            },
        }
    }

    fn session() -> StudioSession {
        StudioSession::new(
            "primary",
            StudioApi::new("https://studio.example.com", "key"),
            "artifacts",
        )
    }

    // -- reference image staging --

    #[tokio::test]
    async fn missing_reference_image_is_a_retryable_upload_failure() {
        let scene = scene_with_images(vec!["does/not/exist.png".to_string()]);
        let outcome = session().stage_reference_images(&scene).await.unwrap_err();
        match outcome {
            Outcome::Failure { category, detail } => {
                assert_eq!(category, ErrorCategory::TransientUi);
                assert!(detail.contains("does/not/exist.png"));
            }
            other => panic!("expected a failure outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_reference_images_stage_empty() {
        let scene = scene_with_images(Vec::new());
        let images = session().stage_reference_images(&scene).await.unwrap();
        assert!(images.is_empty());
    }

    // -- signal mapping --

    #[test]
    fn quota_status_body_classifies_as_quota() {
        let err = StudioApiError::Api {
            status: 429,
            body: "generation quota exceeded for this account".to_string(),
        };
        let outcome = Outcome::failure(err.to_string());
        assert_eq!(
            outcome,
            Outcome::Failure {
                category: ErrorCategory::QuotaExceeded,
                detail: "studio API error (429): generation quota exceeded for this account"
                    .to_string(),
            }
        );
    }

    #[test]
    fn image_part_name_strips_directories() {
        assert_eq!(image_part_name("ref/images/pier.png"), "pier.png");
        assert_eq!(image_part_name("pier.png"), "pier.png");
    }
}

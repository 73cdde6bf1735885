//! Checkpoint data model and invariants (PRD-5).
//!
//! A checkpoint is the durable progress snapshot of one selected scene
//! range. It is rewritten after every scene reaches a terminal state and
//! deleted only when the whole range completes. A restart-pending
//! checkpoint additionally carries the original selection, so a relaunched
//! process can rebuild the exact range without process arguments.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::selection::SelectionMode;
use crate::types::epoch_now;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default checkpoint filename, relative to the working directory.
pub const DEFAULT_CHECKPOINT_FILE: &str = "video_progress_checkpoint.json";

/// Upper bound on a checkpoint file read; anything larger is corrupt.
pub const MAX_CHECKPOINT_SIZE_BYTES: u64 = 64 * 1024;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// Durable progress snapshot, serialized as a flat JSON object.
///
/// `current_scene_index` is the 1-based count of scenes in the selected
/// range that have reached a terminal state (0 = none yet);
/// `total_scenes` is the size of the selected range, not of the whole
/// scene list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Cumulative successful scenes within the selected range.
    pub successful_scenes: u32,
    /// Scenes completed (success or abandonment) within the range.
    pub current_scene_index: u32,
    /// Size of the selected range.
    pub total_scenes: u32,
    /// Capture time, fractional epoch seconds.
    pub timestamp: f64,
    /// Session id that served the last completed scene.
    pub last_account: String,
    /// Present only on restart-pending checkpoints; its fields serialize
    /// inline with the rest of the object.
    #[serde(flatten)]
    pub restart: Option<RestartState>,
}

/// Restart block: the original selection, for exact reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartState {
    /// Always `true` when the block is present.
    pub restart_mode: bool,
    pub original_selection_type: SelectionMode,
    /// 1-based first position of the original range.
    pub original_start_scene: u32,
    /// 1-based last position of the original range.
    pub original_end_scene: u32,
}

impl Checkpoint {
    /// Plain progress checkpoint, stamped with the current time.
    pub fn new(
        successful_scenes: u32,
        current_scene_index: u32,
        total_scenes: u32,
        last_account: impl Into<String>,
    ) -> Self {
        Self {
            successful_scenes,
            current_scene_index,
            total_scenes,
            timestamp: epoch_now(),
            last_account: last_account.into(),
            restart: None,
        }
    }

    /// Attach a restart block capturing the original selection.
    pub fn with_restart(mut self, mode: SelectionMode, start: u32, end: u32) -> Self {
        self.restart = Some(RestartState {
            restart_mode: true,
            original_selection_type: mode,
            original_start_scene: start,
            original_end_scene: end,
        });
        self
    }

    /// True when this checkpoint was written by the restart controller.
    pub fn is_restart_pending(&self) -> bool {
        self.restart.as_ref().is_some_and(|r| r.restart_mode)
    }

    /// Check the structural invariants.
    ///
    /// Progress may never exceed the range, successes may never exceed
    /// completions, and a restart block must describe bounds consistent
    /// with `total_scenes`.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.total_scenes == 0 {
            return Err(CoreError::Checkpoint(
                "total_scenes must be at least 1".to_string(),
            ));
        }
        if self.current_scene_index > self.total_scenes {
            return Err(CoreError::Checkpoint(format!(
                "current_scene_index {} exceeds total_scenes {}",
                self.current_scene_index, self.total_scenes
            )));
        }
        if self.successful_scenes > self.current_scene_index {
            return Err(CoreError::Checkpoint(format!(
                "successful_scenes {} exceeds current_scene_index {}",
                self.successful_scenes, self.current_scene_index
            )));
        }
        if let Some(restart) = &self.restart {
            if restart.original_start_scene == 0
                || restart.original_start_scene > restart.original_end_scene
            {
                return Err(CoreError::Checkpoint(format!(
                    "restart bounds {}..{} are not a valid range",
                    restart.original_start_scene, restart.original_end_scene
                )));
            }
            let span = restart.original_end_scene - restart.original_start_scene + 1;
            if span != self.total_scenes {
                return Err(CoreError::Checkpoint(format!(
                    "restart bounds {}..{} span {} scenes but total_scenes is {}",
                    restart.original_start_scene,
                    restart.original_end_scene,
                    span,
                    self.total_scenes
                )));
            }
        }
        Ok(())
    }
}

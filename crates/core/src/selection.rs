//! Scene range selection and resume arithmetic (PRD-5).
//!
//! The operator picks what to process: everything, an explicit range, a
//! single scene, or resume from a checkpoint. [`resolve_selection`] turns
//! that choice into a validated [`ResolvedRange`] of 1-based positions
//! into the ordered scene list, before any session is opened.

use serde::{Deserialize, Serialize};

use crate::checkpoint::Checkpoint;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Selection types
// ---------------------------------------------------------------------------

/// Shape of the original selection, persisted in restart checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    All,
    Range,
    Single,
}

impl SelectionMode {
    /// Stable identifier used in checkpoints, logs, and previews.
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMode::All => "all",
            SelectionMode::Range => "range",
            SelectionMode::Single => "single",
        }
    }
}

/// Operator's choice at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Range { start: u32, end: u32 },
    Single { scene: u32 },
    Resume,
}

/// A validated range of 1-based positions, with any progress carried over
/// from a resumed checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    /// Original selection shape (recorded in restart checkpoints).
    pub mode: SelectionMode,
    /// First position of the original selection.
    pub original_start: u32,
    /// Last position of the original selection.
    pub original_end: u32,
    /// First position this run will actually process.
    pub next_position: u32,
    /// Scenes already completed within the range (from a checkpoint).
    pub prior_completed: u32,
    /// Successes already recorded within the range (from a checkpoint).
    pub prior_successes: u32,
}

impl ResolvedRange {
    /// Size of the original selection.
    pub fn total_in_range(&self) -> u32 {
        self.original_end - self.original_start + 1
    }

    /// True when every position in the range is already completed.
    pub fn is_already_complete(&self) -> bool {
        self.next_position > self.original_end
    }

    /// Positions left to process in this run.
    pub fn remaining(&self) -> u32 {
        if self.is_already_complete() {
            0
        } else {
            self.original_end - self.next_position + 1
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a selection against a scene list of `total_scenes` entries.
///
/// Bounds are validated here (`1 <= start <= end <= total_scenes`); a
/// rejected selection is a configuration error and must abort before any
/// session opens. `Resume` requires a checkpoint: one with a restart
/// block rebuilds the original bounds exactly, one without is treated as
/// a start-at-1 selection whose end is the stored range size.
pub fn resolve_selection(
    selection: Selection,
    total_scenes: u32,
    checkpoint: Option<&Checkpoint>,
) -> Result<ResolvedRange, CoreError> {
    if total_scenes == 0 {
        return Err(CoreError::Validation(
            "scene list is empty; nothing to process".to_string(),
        ));
    }

    match selection {
        Selection::All => Ok(ResolvedRange {
            mode: SelectionMode::All,
            original_start: 1,
            original_end: total_scenes,
            next_position: 1,
            prior_completed: 0,
            prior_successes: 0,
        }),
        Selection::Range { start, end } => {
            validate_bounds(start, end, total_scenes)?;
            Ok(ResolvedRange {
                mode: SelectionMode::Range,
                original_start: start,
                original_end: end,
                next_position: start,
                prior_completed: 0,
                prior_successes: 0,
            })
        }
        Selection::Single { scene } => {
            validate_bounds(scene, scene, total_scenes)?;
            Ok(ResolvedRange {
                mode: SelectionMode::Single,
                original_start: scene,
                original_end: scene,
                next_position: scene,
                prior_completed: 0,
                prior_successes: 0,
            })
        }
        Selection::Resume => {
            let cp = checkpoint.ok_or_else(|| {
                CoreError::Validation("no checkpoint found to resume from".to_string())
            })?;
            cp.validate()?;

            let (mode, start, end) = match &cp.restart {
                Some(restart) => (
                    restart.original_selection_type,
                    restart.original_start_scene,
                    restart.original_end_scene,
                ),
                // Plain checkpoints carry no bounds; they are only ever
                // written for selections starting at position 1.
                None => (SelectionMode::All, 1, cp.total_scenes),
            };
            validate_bounds(start, end, total_scenes)?;

            Ok(ResolvedRange {
                mode,
                original_start: start,
                original_end: end,
                next_position: start + cp.current_scene_index,
                prior_completed: cp.current_scene_index,
                prior_successes: cp.successful_scenes,
            })
        }
    }
}

fn validate_bounds(start: u32, end: u32, total_scenes: u32) -> Result<(), CoreError> {
    if start == 0 {
        return Err(CoreError::Validation(
            "scene positions are 1-based; start must be at least 1".to_string(),
        ));
    }
    if start > end {
        return Err(CoreError::Validation(format!(
            "start position {start} is after end position {end}"
        )));
    }
    if end > total_scenes {
        return Err(CoreError::Validation(format!(
            "end position {end} exceeds the {total_scenes} loaded scenes"
        )));
    }
    Ok(())
}

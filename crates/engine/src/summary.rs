//! End-of-run reporting.
//!
//! The orchestrator tallies progress into a [`RunSummary`]; the runner
//! logs its fields and mails the rendered block when notifications are
//! configured.

use chrono::Utc;

use retake_core::selection::{ResolvedRange, SelectionMode};
use retake_core::types::{SceneNumber, Timestamp};

/// Final tallies for one orchestrated run.
///
/// Counts are cumulative for the selected range, so a resumed run reports
/// the range's full history; `abandoned_scenes` lists only the scenes
/// this process abandoned.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub mode: SelectionMode,
    /// 1-based first position of the selection.
    pub first_position: u32,
    /// 1-based last position of the selection.
    pub last_position: u32,
    /// Scenes that reached a terminal state.
    pub completed: u32,
    /// Scenes that succeeded.
    pub successful: u32,
    /// Scene numbers abandoned during this process's lifetime.
    pub abandoned_scenes: Vec<SceneNumber>,
    /// Failovers performed during this process's lifetime.
    pub session_switches: u32,
    /// Wall-clock seconds this process spent processing.
    pub elapsed_secs: i64,
}

impl RunSummary {
    pub fn new(
        range: &ResolvedRange,
        successful: u32,
        completed: u32,
        abandoned_scenes: Vec<SceneNumber>,
        session_switches: u32,
        started_at: Timestamp,
    ) -> Self {
        Self {
            mode: range.mode,
            first_position: range.original_start,
            last_position: range.original_end,
            completed,
            successful,
            abandoned_scenes,
            session_switches,
            elapsed_secs: (Utc::now() - started_at).num_seconds(),
        }
    }

    /// Size of the selected range.
    pub fn total_in_range(&self) -> u32 {
        self.last_position - self.first_position + 1
    }

    /// Scenes that terminated without an artifact.
    pub fn abandoned_count(&self) -> u32 {
        self.completed - self.successful
    }

    /// Elapsed time in minutes, for operator-facing output.
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_secs as f64 / 60.0
    }

    /// Plain-text block used for the final log line and the notification
    /// email body.
    pub fn render(&self) -> String {
        let abandoned = if self.abandoned_scenes.is_empty() {
            "none".to_string()
        } else {
            self.abandoned_scenes
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Production run summary\n\
             Selection: {} (positions {}-{})\n\
             Completed: {}/{}\n\
             Succeeded: {}\n\
             Abandoned: {} (scenes: {})\n\
             Session switches: {}\n\
             Elapsed: {:.1} minutes",
            self.mode.as_str(),
            self.first_position,
            self.last_position,
            self.completed,
            self.total_in_range(),
            self.successful,
            self.abandoned_count(),
            abandoned,
            self.session_switches,
            self.elapsed_minutes(),
        )
    }
}

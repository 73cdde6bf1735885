//! Artifact filename convention.
//!
//! Downloaded scene videos are named deterministically so that reruns of
//! the same scene never clobber an earlier take.

use crate::types::SceneNumber;

/// Generate the artifact filename for a scene video.
///
/// Convention: `scene_{number}_video_{epoch}.mp4`
///
/// # Examples
///
/// ```
/// use retake_core::naming::artifact_filename;
///
/// assert_eq!(artifact_filename(3, 1723459200), "scene_3_video_1723459200.mp4");
/// assert_eq!(artifact_filename(12, 1723459321), "scene_12_video_1723459321.mp4");
/// ```
pub fn artifact_filename(scene_number: SceneNumber, epoch_secs: i64) -> String {
    format!("scene_{scene_number}_video_{epoch_secs}.mp4")
}

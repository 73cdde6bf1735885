//! Shared type aliases and time helpers.

/// Scene number parsed from a scene label (`"Scene12"` -> `12`).
pub type SceneNumber = u32;

/// UTC timestamp type used across crates.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current wall-clock time as fractional epoch seconds.
///
/// Checkpoint files store the capture time as a plain JSON number, so
/// files written by earlier revisions of the tool stay readable.
pub fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Current wall-clock time as whole epoch seconds (artifact filenames).
pub fn epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

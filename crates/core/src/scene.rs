//! Scene list loading and validation (PRD-2).
//!
//! The job input file is a JSON object mapping scene labels to prompt
//! payloads:
//!
//! ```json
//! {
//!   "Scene1": "A harbor at dawn, wide establishing shot",
//!   "Scene2": { "prompt": "...", "reference_images": ["ref/pier.png"] }
//! }
//! ```
//!
//! Each label must embed the scene number (`"Scene3"` -> `3`). The parsed
//! list is sorted ascending by number and is immutable for the rest of
//! the run.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::CoreError;
use crate::types::SceneNumber;

/// Regex extracting the first digit run from a scene label.
static SCENE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Prompt payload handed to a generation session unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePrompt {
    pub prompt: String,
    /// Local paths of reference images to attach, possibly empty.
    pub reference_images: Vec<String>,
}

/// One unit of work, producing one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// Number embedded in the label; used for ordering, filenames, logs.
    pub number: SceneNumber,
    /// Label as it appeared in the input file, e.g. `"Scene3"`.
    pub label: String,
    pub prompt: ScenePrompt,
}

/// Accepts both payload shapes: a bare prompt string or the full object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrompt {
    Text(String),
    Detailed {
        prompt: String,
        #[serde(default)]
        reference_images: Vec<String>,
    },
}

impl From<RawPrompt> for ScenePrompt {
    fn from(raw: RawPrompt) -> Self {
        match raw {
            RawPrompt::Text(prompt) => ScenePrompt {
                prompt,
                reference_images: Vec::new(),
            },
            RawPrompt::Detailed {
                prompt,
                reference_images,
            } => ScenePrompt {
                prompt,
                reference_images,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Extract the scene number from a label like `"Scene12"`.
///
/// The first digit run in the label is the number; it must be positive.
pub fn scene_number_from_label(label: &str) -> Result<SceneNumber, CoreError> {
    let digits = SCENE_NUMBER_RE
        .find(label)
        .ok_or_else(|| CoreError::SceneData(format!("label '{label}' contains no scene number")))?;
    let number: SceneNumber = digits.as_str().parse().map_err(|_| {
        CoreError::SceneData(format!("label '{label}' has an unparseable scene number"))
    })?;
    if number == 0 {
        return Err(CoreError::SceneData(format!(
            "label '{label}' has scene number 0; numbers start at 1"
        )));
    }
    Ok(number)
}

/// Parse the scene map JSON into an ascending, duplicate-free scene list.
pub fn parse_scene_map(json: &str) -> Result<Vec<Scene>, CoreError> {
    let raw: BTreeMap<String, RawPrompt> = serde_json::from_str(json)
        .map_err(|e| CoreError::SceneData(format!("scene file is not a valid scene map: {e}")))?;

    if raw.is_empty() {
        return Err(CoreError::SceneData(
            "scene file contains no scenes".to_string(),
        ));
    }

    let mut scenes = Vec::with_capacity(raw.len());
    for (label, prompt) in raw {
        let number = scene_number_from_label(&label)?;
        scenes.push(Scene {
            number,
            label,
            prompt: prompt.into(),
        });
    }

    scenes.sort_by_key(|s| s.number);
    for pair in scenes.windows(2) {
        if pair[0].number == pair[1].number {
            return Err(CoreError::SceneData(format!(
                "labels '{}' and '{}' both map to scene number {}",
                pair[0].label, pair[1].label, pair[0].number
            )));
        }
    }

    Ok(scenes)
}

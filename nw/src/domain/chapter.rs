//! Scene plans, chapter artifacts and continuity

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MAX_SCENE_CONTRASTS, MAX_SCENE_MUST_INCLUDE, lenient};

/// A chapter broken into scene cards
///
/// Transient: drives drafting, then only the model's original object is kept,
/// as a debug artifact and inside the chapter artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenePlan {
    #[serde(deserialize_with = "lenient::number")]
    pub chapter: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::sections")]
    pub scenes: Vec<SceneCard>,
}

impl ScenePlan {
    /// Enforce the per-card limits and fill in missing scene indices
    pub fn normalize(mut self) -> Self {
        for (pos, scene) in self.scenes.iter_mut().enumerate() {
            if scene.idx == 0 {
                scene.idx = pos as u32 + 1;
            }
            scene.contrast_ids.truncate(MAX_SCENE_CONTRASTS);
            scene.must_include.truncate(MAX_SCENE_MUST_INCLUDE);
        }
        self
    }
}

/// A short brief for one beat of the chapter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneCard {
    #[serde(deserialize_with = "lenient::number")]
    pub idx: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub scene_title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub setting: String,
    #[serde(deserialize_with = "lenient::text")]
    pub pov: String,
    #[serde(deserialize_with = "lenient::text")]
    pub goal: String,
    #[serde(deserialize_with = "lenient::text")]
    pub conflict: String,
    #[serde(deserialize_with = "lenient::text")]
    pub turn: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub contrast_ids: Vec<String>,
    #[serde(deserialize_with = "lenient::texts")]
    pub must_include: Vec<String>,
}

/// The structured summary requested after drafting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub chapter_summary: String,
    pub continuity_notes: Vec<String>,
    pub next_chapter_hook: String,
}

impl ChapterSummary {
    /// The terminal default used when every summarization attempt failed
    pub fn degraded() -> Self {
        Self::default()
    }

    /// Build a summary from any JSON object without rejecting odd shapes
    ///
    /// Non-string summary or hook values become empty strings; non-string
    /// notes are rendered as JSON text; a missing or non-list notes field is
    /// an empty list.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };

        let continuity_notes = match obj.get("continuity_notes") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            chapter_summary: text("chapter_summary"),
            continuity_notes,
            next_chapter_hook: text("next_chapter_hook"),
        }
    }
}

/// A drafted chapter, as persisted per (project, chapter)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterArtifact {
    pub chapter: u32,
    pub title: String,
    /// The scene plan object exactly as the model returned it
    pub scene_plan: Value,
    pub chapter_text: String,
    pub chapter_summary: String,
    pub continuity_notes: Vec<String>,
    pub next_chapter_hook: String,
}

/// What a chapter inherits from its predecessor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinuityContext {
    pub prev_summary: String,
    pub prev_last_paragraph: String,
}

impl ContinuityContext {
    /// No predecessor: both fields empty
    pub fn empty() -> Self {
        Self::default()
    }
}

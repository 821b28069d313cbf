//! Project plan types

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{CHAPTER_COUNT, lenient};

const OVERVIEW_LOCATIONS: usize = 8;
const OVERVIEW_CHARACTERS: usize = 10;
const OVERVIEW_CONTRASTS: usize = 8;

/// The full project plan produced once per project
///
/// Immutable after generation; a re-run replaces it wholesale. Fields the
/// model adds beyond the known schema are kept in `extra` so the stored plan
/// round-trips unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectPlan {
    #[serde(deserialize_with = "lenient::section")]
    pub topic: Topic,
    pub style_guide: Value,
    #[serde(alias = "vibe_coding_context", deserialize_with = "lenient::section")]
    pub world_context: WorldContext,
    #[serde(deserialize_with = "lenient::sections")]
    pub contrast_catalog: Vec<ContrastEntry>,
    #[serde(deserialize_with = "lenient::section")]
    pub story_bible: StoryBible,
    #[serde(deserialize_with = "lenient::sections")]
    pub characters: Vec<Character>,
    #[serde(deserialize_with = "lenient::section")]
    pub relations: Relations,
    #[serde(deserialize_with = "lenient::sections")]
    pub outline: Vec<ChapterMeta>,
    #[serde(deserialize_with = "lenient::texts")]
    pub continuity_rules: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectPlan {
    /// Look up an outline entry by chapter number
    pub fn chapter(&self, chapter: u32) -> Option<&ChapterMeta> {
        self.outline.iter().find(|c| c.chapter == chapter)
    }

    /// Check the outline invariant: exactly 8 entries numbered 1..=8, no repeats
    pub fn validate_outline(&self) -> Result<(), String> {
        if self.outline.len() != CHAPTER_COUNT {
            return Err(format!(
                "outline must contain exactly {} chapters, found {}",
                CHAPTER_COUNT,
                self.outline.len()
            ));
        }

        let numbers: BTreeSet<u32> = self.outline.iter().map(|c| c.chapter).collect();
        let expected: BTreeSet<u32> = (1..=CHAPTER_COUNT as u32).collect();
        if numbers != expected {
            let found: Vec<u32> = self.outline.iter().map(|c| c.chapter).collect();
            return Err(format!(
                "outline chapter numbers must be unique and cover 1..={}, found {:?}",
                CHAPTER_COUNT, found
            ));
        }

        Ok(())
    }

    /// Readable tab-separated overview: topic, premise, world, cast, outline
    /// and the first contrasts
    pub fn overview(&self, project_id: &str) -> String {
        let world = |key: &str| match self.story_bible.world.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        let mut lines = vec![
            format!("project_id\t{}", project_id),
            format!("title\t{}", self.topic.title),
            format!("genre\t{}", self.topic.genre),
            format!("tone\t{}", self.topic.tone),
            String::new(),
            "core_premise".to_string(),
            self.story_bible.core_premise.trim().to_string(),
            String::new(),
            "world".to_string(),
            format!("era\t{}", world("era")),
        ];
        let locations = self.story_bible.world.get("locations").and_then(Value::as_array);
        if let Some(locations) = locations.filter(|l| !l.is_empty()) {
            let names: Vec<String> = locations
                .iter()
                .take(OVERVIEW_LOCATIONS)
                .map(|l| l.as_str().map(str::to_string).unwrap_or_else(|| l.to_string()))
                .collect();
            lines.push(format!("locations\t{}", names.join(" | ")));
        }
        lines.extend([
            format!("tech_or_magic\t{}", world("tech_or_magic")),
            String::new(),
            "main_conflict".to_string(),
            self.story_bible.main_conflict.trim().to_string(),
            String::new(),
            "characters".to_string(),
        ]);
        lines.extend(
            self.characters
                .iter()
                .take(OVERVIEW_CHARACTERS)
                .map(|c| format!("- {} / {} / {}", c.name, c.role, c.private_drive)),
        );
        lines.extend([String::new(), "outline".to_string()]);
        lines.extend(
            self.outline
                .iter()
                .map(|ch| format!("- ch{}: {} :: {}", ch.chapter, ch.title, ch.logline)),
        );
        lines.extend([String::new(), format!("contrast_catalog (top {})", OVERVIEW_CONTRASTS)]);
        lines.extend(
            self.contrast_catalog
                .iter()
                .take(OVERVIEW_CONTRASTS)
                .map(|c| format!("- {}: {}  <->  {}  | payoff: {}", c.id, c.modern, c.period, c.scene_payoff)),
        );

        lines.join("\n") + "\n"
    }

    /// Book intro for the index page: core premise, else the topic blurb
    pub fn intro(&self) -> &str {
        [self.story_bible.core_premise.as_str(), self.topic.blurb.as_str()]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .unwrap_or("")
    }
}

/// What the story is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub blurb: String,
    #[serde(deserialize_with = "lenient::text")]
    pub genre: String,
    #[serde(deserialize_with = "lenient::text")]
    pub tone: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub themes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Background the writer models lean on for every scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldContext {
    #[serde(deserialize_with = "lenient::text")]
    pub definition: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub workflow: Vec<String>,
    #[serde(alias = "why_it_feels_like_magic_in_2015", deserialize_with = "lenient::texts")]
    pub why_it_feels_like_magic: Vec<String>,
    #[serde(deserialize_with = "lenient::texts")]
    pub hidden_costs: Vec<String>,
    #[serde(alias = "security_and_accountability_risks", deserialize_with = "lenient::texts")]
    pub risks: Vec<String>,
    #[serde(deserialize_with = "lenient::texts")]
    pub chapter_usage_guidance: Vec<String>,
}

/// One then-versus-now contrast that scenes can cite by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastEntry {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub modern: String,
    #[serde(alias = "year2015", deserialize_with = "lenient::text")]
    pub period: String,
    #[serde(deserialize_with = "lenient::text")]
    pub scene_payoff: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryBible {
    #[serde(deserialize_with = "lenient::text")]
    pub core_premise: String,
    pub world: Value,
    #[serde(deserialize_with = "lenient::text")]
    pub main_conflict: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub mysteries: Vec<String>,
    #[serde(deserialize_with = "lenient::texts")]
    pub key_objects: Vec<String>,
    #[serde(deserialize_with = "lenient::texts")]
    pub timeline: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    #[serde(deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub role: String,
    #[serde(deserialize_with = "lenient::text")]
    pub public_face: String,
    #[serde(deserialize_with = "lenient::text")]
    pub private_drive: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub weakness: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub secrets: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub voice: String,
    #[serde(deserialize_with = "lenient::text")]
    pub arc: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Relations {
    #[serde(deserialize_with = "lenient::sections")]
    pub edges: Vec<RelationEdge>,
    #[serde(deserialize_with = "lenient::text")]
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationEdge {
    #[serde(deserialize_with = "lenient::text")]
    pub a: String,
    #[serde(deserialize_with = "lenient::text")]
    pub b: String,
    #[serde(rename = "type", deserialize_with = "lenient::text")]
    pub kind: String,
    #[serde(deserialize_with = "lenient::text")]
    pub tension: String,
    #[serde(deserialize_with = "lenient::text")]
    pub history: String,
    #[serde(deserialize_with = "lenient::text")]
    pub future_pressure: String,
}

/// One outline entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterMeta {
    #[serde(deserialize_with = "lenient::number")]
    pub chapter: u32,
    #[serde(deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(deserialize_with = "lenient::text")]
    pub logline: String,
    #[serde(alias = "chapter_goal", deserialize_with = "lenient::text")]
    pub goal: String,
    #[serde(deserialize_with = "lenient::text")]
    pub reversal: String,
    #[serde(deserialize_with = "lenient::text")]
    pub cliffhanger: String,
    #[serde(deserialize_with = "lenient::texts")]
    pub must_reveal: Vec<String>,
}

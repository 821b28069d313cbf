//! Domain types for novel projects
//!
//! - [`ProjectPlan`] - world bible, cast and the fixed 8-chapter outline
//! - [`ScenePlan`] / [`SceneCard`] - per-chapter scene breakdown
//! - [`ChapterArtifact`] - the drafted chapter with its summary
//! - [`ContinuityContext`] - what the next chapter needs from the previous one

mod chapter;
mod lenient;
mod plan;

pub use chapter::{ChapterArtifact, ChapterSummary, ContinuityContext, SceneCard, ScenePlan};
pub use plan::{
    ChapterMeta, Character, ContrastEntry, ProjectPlan, RelationEdge, Relations, StoryBible, Topic, WorldContext,
};

/// Chapters in every project outline
pub const CHAPTER_COUNT: usize = 8;

/// Scenes in every chapter's scene plan
pub const SCENES_PER_CHAPTER: usize = 12;

/// Maximum contrast references per scene card
pub const MAX_SCENE_CONTRASTS: usize = 2;

/// Maximum must-include items per scene card
pub const MAX_SCENE_MUST_INCLUDE: usize = 2;
